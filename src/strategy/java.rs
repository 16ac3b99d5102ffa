//! Resolution of the Java executable on the node that runs the scanner.

use crate::environment::EnvironmentSnapshot;
use crate::os::OsFamily;
use log::{debug, info, log_enabled, warn, Level};
use std::path::Path;
use std::process::Command;

/// Environment override naming the exact Java executable to use.
pub const DETECT_JAVA_PATH: &str = "DETECT_JAVA_PATH";

/// Conventional JDK home variable; `bin/java` is appended to it.
pub const JAVA_HOME: &str = "JAVA_HOME";

/// Resolves which Java executable will launch the scanner jar.
///
/// Precedence: configured node JDK home, then `DETECT_JAVA_PATH`, then
/// `JAVA_HOME`, then the bare executable name resolved via the node's PATH.
pub struct JavaResolver<'a> {
    remote_jdk_home: Option<&'a str>,
    env: &'a EnvironmentSnapshot,
    os_family: OsFamily,
}

impl<'a> JavaResolver<'a> {
    pub fn new(
        remote_jdk_home: Option<&'a str>,
        env: &'a EnvironmentSnapshot,
        os_family: OsFamily,
    ) -> Self {
        Self {
            remote_jdk_home,
            env,
            os_family,
        }
    }

    /// Returns the path to invoke, logging which source decided it.
    pub fn java_executable_path(&self) -> String {
        let (path, source) = self.resolve();

        info!("Running with JAVA: {path}");
        info!("Java path set based on: {source}");
        debug!("PATH: {}", self.env.get("PATH").unwrap_or_default());

        path
    }

    fn resolve(&self) -> (String, &'static str) {
        if let Some(home) = self.remote_jdk_home {
            return match self.executable_under(home) {
                Some(path) => (path, "node configuration"),
                None => (self.bare_executable(), "PATH"),
            };
        }

        if let Some(path) = self.env.get(DETECT_JAVA_PATH) {
            return (path.to_string(), "DETECT_JAVA_PATH environment variable");
        }

        if let Some(home) = self.env.get(JAVA_HOME) {
            return match self.executable_under(home) {
                Some(path) => (path, "JAVA_HOME environment variable"),
                None => (self.bare_executable(), "PATH"),
            };
        }

        (self.bare_executable(), "PATH")
    }

    fn bare_executable(&self) -> String {
        self.os_family.java_executable().to_string()
    }

    /// `<home>/bin/java[.exe]`, canonicalized when the path exists on this
    /// machine. A structurally invalid home is logged and rejected rather
    /// than propagated.
    fn executable_under(&self, home: &str) -> Option<String> {
        if home.contains('\0') {
            warn!("Could not set path to Java executable, falling back to PATH.");
            return None;
        }

        let joined = Path::new(home)
            .join("bin")
            .join(self.os_family.java_executable());
        let resolved = joined.canonicalize().unwrap_or(joined);
        Some(resolved.to_string_lossy().into_owned())
    }

    /// Diagnostic-only probe of the resolved executable. Runs only at debug
    /// verbosity; a launch failure is logged, never propagated.
    pub fn log_java_version(java_executable: &str) {
        if !log_enabled!(Level::Debug) {
            return;
        }

        match Command::new(java_executable).arg("-version").output() {
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stdout = String::from_utf8_lossy(&output.stdout);
                debug!("Java version: \n{}{}", stderr, stdout);
            }
            Err(e) => {
                debug!("Error starting process to get the Java version: {e}");
            }
        }
    }
}
