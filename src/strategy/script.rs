//! Bootstrap-script constants and invocation shape per OS family.

use crate::os::OsFamily;

pub const SHELL_SCRIPT_URL: &str = "https://detect.synopsys.com/detect.sh";
pub const POWERSHELL_SCRIPT_URL: &str = "https://detect.synopsys.com/detect.ps1";

/// Subdirectory of the workspace tools root the script is cached under.
pub const INSTALL_SUBDIRECTORY: &str = "Detect_Installation";

/// URL of the bootstrap script for the given family.
pub fn script_url(os_family: OsFamily) -> &'static str {
    match os_family {
        OsFamily::Posix => SHELL_SCRIPT_URL,
        OsFamily::Windows => POWERSHELL_SCRIPT_URL,
    }
}

/// Interpreter-plus-target tokens that precede user arguments.
///
/// PowerShell gets one composite, pre-quoted token: the module is imported
/// and its `detect` function invoked in a single command string.
pub fn invocation_prefix(os_family: OsFamily, script_path: &str) -> Vec<String> {
    match os_family {
        OsFamily::Posix => vec!["bash".to_string(), script_path.to_string()],
        OsFamily::Windows => vec![
            "powershell".to_string(),
            format!("\"Import-Module '{script_path}'; detect\""),
        ],
    }
}
