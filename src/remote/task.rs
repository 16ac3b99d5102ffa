//! The setup computation shipped to the target node.
//!
//! A `SetupTask` is a small, serializable value object describing the one
//! operation a strategy needs on the node: resolve Java and point at a jar,
//! or fetch the bootstrap script. Executing it yields the invocation prefix
//! for the scanner command line. Beyond logging and that single
//! filesystem/network operation, a task is side-effect free.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cancel::CancellationToken;
use crate::config::ProxyDescriptor;
use crate::download::ScriptFetcher;
use crate::environment::EnvironmentSnapshot;
use crate::error::{Error, Result};
use crate::os::OsFamily;
use crate::strategy::airgap;
use crate::strategy::java::JavaResolver;
use crate::strategy::script;
use log::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SetupTask {
    Jar {
        jar_path: String,
        remote_jdk_home: Option<String>,
        env: EnvironmentSnapshot,
    },
    AirGapJar {
        base_dir: String,
        remote_jdk_home: Option<String>,
        env: EnvironmentSnapshot,
    },
    Script {
        url: String,
        install_root: String,
        proxy: Option<ProxyDescriptor>,
        os_family: OsFamily,
    },
}

impl SetupTask {
    /// Executes the computation on the current machine and returns the
    /// invocation prefix, or a typed failure. There is no partial state.
    pub fn call(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        cancel.check("scanner setup")?;

        match self {
            SetupTask::Jar {
                jar_path,
                remote_jdk_home,
                env,
            } => {
                let java = resolve_java(remote_jdk_home.as_deref(), env);
                info!("Detect jar configured: {jar_path}");
                Ok(vec![java, "-jar".to_string(), jar_path.clone()])
            }
            SetupTask::AirGapJar {
                base_dir,
                remote_jdk_home,
                env,
            } => {
                let jar = airgap::locate_jar(Path::new(base_dir))?;
                let java = resolve_java(remote_jdk_home.as_deref(), env);
                info!("Detect AirGap jar configured: {}", jar.display());
                Ok(vec![
                    java,
                    "-jar".to_string(),
                    jar.to_string_lossy().into_owned(),
                ])
            }
            SetupTask::Script {
                url,
                install_root,
                proxy,
                os_family,
            } => {
                let fetcher = ScriptFetcher::new(install_root.into(), proxy.clone());
                let script_path = fetcher.ensure_script(url, cancel)?;
                let script_path = script_path.to_string_lossy().into_owned();
                if script_path.trim().is_empty() {
                    return Err(Error::Configuration(
                        "The scanner script was not downloaded successfully.".to_string(),
                    ));
                }
                Ok(script::invocation_prefix(*os_family, &script_path))
            }
        }
    }
}

fn resolve_java(remote_jdk_home: Option<&str>, env: &EnvironmentSnapshot) -> String {
    let resolver = JavaResolver::new(remote_jdk_home, env, OsFamily::current());
    let java = resolver.java_executable_path();
    JavaResolver::log_java_version(&java);
    java
}
