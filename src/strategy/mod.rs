//! Execution-strategy selection for a scanner run.
//!
//! A `DownloadStrategy` is what the user or configuration asked for; an
//! `ExecutionStrategy` is the concrete, runtime-resolved plan for invoking
//! the scanner. The three variants are a closed union sharing two
//! capabilities: producing an argument escaper and producing the setup
//! computation that runs on the target node.

pub mod airgap;
pub mod java;
pub mod script;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ConfigProvider, ProxyDescriptor};
use crate::environment::EnvironmentSnapshot;
use crate::error::{Error, Result};
use crate::escape::Escaper;
use crate::os::OsFamily;
use crate::remote::task::SetupTask;
use log::{info, warn};

/// How the scanner should be obtained, as chosen by the user or stored in
/// configuration. `Inherit` must be resolved to a concrete choice before a
/// strategy is built; it never reaches execution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DownloadStrategy {
    Inherit,
    AirGap {
        #[serde(default)]
        installation: Option<String>,
    },
    #[default]
    ScriptOrJar,
}

impl fmt::Display for DownloadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStrategy::Inherit => write!(f, "Inherit from system configuration"),
            DownloadStrategy::AirGap { .. } => write!(f, "Air Gap"),
            DownloadStrategy::ScriptOrJar => write!(f, "Script or Jar"),
        }
    }
}

/// Runtime-resolved invocation plan. Immutable once constructed; built once
/// per run and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStrategy {
    /// User supplied an explicit jar path through the environment.
    Jar {
        jar_path: String,
        remote_jdk_home: Option<String>,
        env: EnvironmentSnapshot,
    },
    /// Jar located inside a pre-provisioned air-gap installation.
    AirGapJar {
        base_dir: String,
        remote_jdk_home: Option<String>,
        env: EnvironmentSnapshot,
    },
    /// Bootstrap script fetched from its well-known URL.
    Script {
        os_family: OsFamily,
        install_root: String,
        proxy: Option<ProxyDescriptor>,
    },
}

impl ExecutionStrategy {
    /// Escaper applied to each user-supplied token. Jar invocations pass
    /// discrete argv entries, so nothing is escaped for them.
    pub fn escaper(&self) -> Escaper {
        match self {
            ExecutionStrategy::Jar { .. } | ExecutionStrategy::AirGapJar { .. } => {
                Escaper::Identity
            }
            ExecutionStrategy::Script { os_family, .. } => Escaper::for_shell(*os_family),
        }
    }

    /// The serializable computation executed on the target node. Yields the
    /// invocation prefix or a typed failure; there is no partial state.
    pub fn setup_task(&self) -> SetupTask {
        match self {
            ExecutionStrategy::Jar {
                jar_path,
                remote_jdk_home,
                env,
            } => SetupTask::Jar {
                jar_path: jar_path.clone(),
                remote_jdk_home: remote_jdk_home.clone(),
                env: env.clone(),
            },
            ExecutionStrategy::AirGapJar {
                base_dir,
                remote_jdk_home,
                env,
            } => SetupTask::AirGapJar {
                base_dir: base_dir.clone(),
                remote_jdk_home: remote_jdk_home.clone(),
                env: env.clone(),
            },
            ExecutionStrategy::Script {
                os_family,
                install_root,
                proxy,
            } => SetupTask::Script {
                url: script::script_url(*os_family).to_string(),
                install_root: install_root.clone(),
                proxy: proxy.clone(),
                os_family: *os_family,
            },
        }
    }
}

/// Chooses the execution strategy for a run.
///
/// An absent or `Inherit` override defers to global configuration: the
/// stored strategy when present, otherwise the configured default (noted in
/// the log). Unreachable configuration is a configuration error.
pub fn resolve_strategy(
    explicit_override: Option<DownloadStrategy>,
    provider: &dyn ConfigProvider,
    env: &EnvironmentSnapshot,
    os_family: OsFamily,
    remote_jdk_home: Option<&str>,
    workspace_root: &str,
) -> Result<ExecutionStrategy> {
    let (download_strategy, logging_message) = match explicit_override {
        Some(strategy) if strategy != DownloadStrategy::Inherit => {
            (strategy, "Running the scanner using configured strategy: ")
        }
        _ => {
            let global = provider.global()?;
            match global.download_strategy {
                Some(stored) if stored != DownloadStrategy::Inherit => {
                    (stored, "Running the scanner using configured system strategy: ")
                }
                _ => (
                    global.default_download_strategy,
                    "System configured strategy not found, running the scanner using default \
                     configured system strategy: ",
                ),
            }
        }
    };

    info!("{logging_message}{download_strategy}");

    match download_strategy {
        DownloadStrategy::AirGap { installation } => {
            let name = installation.ok_or_else(|| {
                Error::Configuration(
                    "Air gap strategy selected but no installation name was configured. \
                     Check the tool configuration."
                        .to_string(),
                )
            })?;
            let base_dir = provider.airgap_home(&name)?.ok_or_else(|| {
                Error::Configuration(format!(
                    "Problem encountered getting the air gap tool with the name {name} \
                     from configuration. Check the tool configuration."
                ))
            })?;
            Ok(ExecutionStrategy::AirGapJar {
                base_dir,
                remote_jdk_home: remote_jdk_home.map(str::to_string),
                env: env.clone(),
            })
        }
        _ => {
            if let Some(jar_path) = env.jar_override() {
                Ok(ExecutionStrategy::Jar {
                    jar_path: jar_path.to_string(),
                    remote_jdk_home: remote_jdk_home.map(str::to_string),
                    env: env.clone(),
                })
            } else {
                let url = script::script_url(os_family);
                let proxy = match provider.global() {
                    Ok(global) => global.proxy_for(url),
                    Err(e) => {
                        warn!("Could not determine proxy settings for {url}: {e}");
                        None
                    }
                };
                Ok(ExecutionStrategy::Script {
                    os_family,
                    install_root: workspace_root.to_string(),
                    proxy,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobalConfig;
    use crate::environment::DETECT_JAR;

    struct StubProvider {
        global: Option<GlobalConfig>,
    }

    impl StubProvider {
        fn unreachable() -> Self {
            Self { global: None }
        }

        fn with(global: GlobalConfig) -> Self {
            Self {
                global: Some(global),
            }
        }
    }

    impl ConfigProvider for StubProvider {
        fn global(&self) -> Result<GlobalConfig> {
            self.global
                .clone()
                .ok_or_else(|| Error::Configuration("no configuration".to_string()))
        }
    }

    fn resolve(
        explicit: Option<DownloadStrategy>,
        provider: &StubProvider,
        env: &EnvironmentSnapshot,
    ) -> Result<ExecutionStrategy> {
        resolve_strategy(explicit, provider, env, OsFamily::Posix, None, "/workspace")
    }

    #[test]
    fn test_explicit_script_or_jar_selects_script() {
        let provider = StubProvider::unreachable();
        let env = EnvironmentSnapshot::new();

        let strategy = resolve(Some(DownloadStrategy::ScriptOrJar), &provider, &env).unwrap();
        assert!(matches!(strategy, ExecutionStrategy::Script { .. }));
        assert_eq!(strategy.escaper(), Escaper::PosixShell);
    }

    #[test]
    fn test_jar_override_selects_jar() {
        let provider = StubProvider::unreachable();
        let mut env = EnvironmentSnapshot::new();
        env.set(DETECT_JAR, "/tmp/detect.jar");

        let strategy = resolve(Some(DownloadStrategy::ScriptOrJar), &provider, &env).unwrap();
        match &strategy {
            ExecutionStrategy::Jar { jar_path, .. } => assert_eq!(jar_path, "/tmp/detect.jar"),
            other => panic!("expected jar strategy, got {other:?}"),
        }
        assert_eq!(strategy.escaper(), Escaper::Identity);
    }

    #[test]
    fn test_blank_jar_override_ignored() {
        let provider = StubProvider::unreachable();
        let mut env = EnvironmentSnapshot::new();
        env.set(DETECT_JAR, "  ");

        let strategy = resolve(Some(DownloadStrategy::ScriptOrJar), &provider, &env).unwrap();
        assert!(matches!(strategy, ExecutionStrategy::Script { .. }));
    }

    #[test]
    fn test_inherit_requires_reachable_configuration() {
        let provider = StubProvider::unreachable();
        let env = EnvironmentSnapshot::new();

        let err = resolve(Some(DownloadStrategy::Inherit), &provider, &env).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = resolve(None, &provider, &env).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_inherit_uses_stored_strategy() {
        let mut global = GlobalConfig::default();
        global.download_strategy = Some(DownloadStrategy::AirGap {
            installation: Some("offline".to_string()),
        });
        global
            .airgap_installations
            .insert("offline".to_string(), "/opt/airgap".to_string());
        let provider = StubProvider::with(global);
        let env = EnvironmentSnapshot::new();

        let strategy = resolve(None, &provider, &env).unwrap();
        match strategy {
            ExecutionStrategy::AirGapJar { base_dir, .. } => assert_eq!(base_dir, "/opt/airgap"),
            other => panic!("expected air gap strategy, got {other:?}"),
        }
    }

    #[test]
    fn test_inherit_falls_back_to_default_strategy() {
        let provider = StubProvider::with(GlobalConfig::default());
        let env = EnvironmentSnapshot::new();

        let strategy = resolve(Some(DownloadStrategy::Inherit), &provider, &env).unwrap();
        assert!(matches!(strategy, ExecutionStrategy::Script { .. }));
    }

    #[test]
    fn test_airgap_unknown_installation_fails_fast() {
        let provider = StubProvider::with(GlobalConfig::default());
        let env = EnvironmentSnapshot::new();

        let err = resolve(
            Some(DownloadStrategy::AirGap {
                installation: Some("missing".to_string()),
            }),
            &provider,
            &env,
        )
        .unwrap_err();

        assert!(err.to_string().contains("missing"), "got: {err}");
    }

    #[test]
    fn test_airgap_without_installation_name_fails() {
        let provider = StubProvider::with(GlobalConfig::default());
        let env = EnvironmentSnapshot::new();

        let err = resolve(
            Some(DownloadStrategy::AirGap { installation: None }),
            &provider,
            &env,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_airgap_beats_jar_override() {
        let mut global = GlobalConfig::default();
        global
            .airgap_installations
            .insert("offline".to_string(), "/opt/airgap".to_string());
        let provider = StubProvider::with(global);
        let mut env = EnvironmentSnapshot::new();
        env.set(DETECT_JAR, "/tmp/detect.jar");

        let strategy = resolve(
            Some(DownloadStrategy::AirGap {
                installation: Some("offline".to_string()),
            }),
            &provider,
            &env,
        )
        .unwrap();
        assert!(matches!(strategy, ExecutionStrategy::AirGapJar { .. }));
    }

    #[test]
    fn test_windows_script_escaper() {
        let provider = StubProvider::unreachable();
        let env = EnvironmentSnapshot::new();

        let strategy = resolve_strategy(
            Some(DownloadStrategy::ScriptOrJar),
            &provider,
            &env,
            OsFamily::Windows,
            None,
            "/workspace",
        )
        .unwrap();
        assert_eq!(strategy.escaper(), Escaper::WindowsShell);
    }
}
