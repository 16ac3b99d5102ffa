//! Configuration for scanlaunch.
//!
//! This module handles loading and saving the launcher's global
//! configuration: the stored download strategy, air-gap tool installations,
//! SSH remotes, proxy settings, and the environment handed to the scanner.
//!
//! # Configuration File Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/scanlaunch/config.yml`
//! - macOS: `~/Library/Application Support/scanlaunch/config.yml`
//! - Windows: `C:\Users\<User>\AppData\Roaming\scanlaunch\config.yml`
//!
//! # Example Configuration
//!
//! ```yaml
//! download_strategy:
//!   kind: air-gap
//!   installation: offline-scanner
//! airgap_installations:
//!   offline-scanner: /opt/scanner/airgap
//! remotes:
//!   build-agent:
//!     host: "agent.example.com"
//!     user: "ci"
//!     port: 22
//!     scanlaunch_path: "/usr/local/bin/scanlaunch"
//!     ssh_key: "~/.ssh/id_rsa"
//! proxy:
//!   host: proxy.example.com
//!   port: 3128
//! environment:
//!   DETECT_TIMEOUT: "120"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::os::OsFamily;
use crate::strategy::DownloadStrategy;

/// Default SSH port
const DEFAULT_SSH_PORT: u16 = 22;

/// Default path to the scanlaunch binary on a remote node
const DEFAULT_SCANLAUNCH_PATH: &str = "scanlaunch";

/// Default SSH connection timeout in seconds
const DEFAULT_TIMEOUT: u64 = 60;

/// Main configuration structure for scanlaunch.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlobalConfig {
    /// Stored download strategy, used when a run inherits from configuration
    #[serde(default)]
    pub download_strategy: Option<DownloadStrategy>,

    /// Strategy applied when no stored strategy exists
    #[serde(default = "default_download_strategy")]
    pub default_download_strategy: DownloadStrategy,

    /// Named air-gap installations (tool name -> installation directory)
    #[serde(default)]
    pub airgap_installations: BTreeMap<String, String>,

    /// Remote node configurations
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteConfig>,

    /// Proxy used for script downloads
    #[serde(default)]
    pub proxy: Option<ProxySettings>,

    /// Variables seeded into every run's environment snapshot
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

fn default_download_strategy() -> DownloadStrategy {
    DownloadStrategy::ScriptOrJar
}

/// Configuration for a remote node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Hostname or IP address of the node
    pub host: String,

    /// SSH username for authentication
    pub user: String,

    /// SSH port (default: 22)
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Path to the scanlaunch binary on the node
    #[serde(default = "default_scanlaunch_path")]
    pub scanlaunch_path: String,

    /// Path to SSH private key file (optional, agent auth is the fallback)
    pub ssh_key: Option<String>,

    /// Operating-system family of the node
    #[serde(default)]
    pub os_family: OsFamily,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_scanlaunch_path() -> String {
    DEFAULT_SCANLAUNCH_PATH.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

/// Outbound proxy configuration for script downloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Host suffixes the proxy is bypassed for
    #[serde(default)]
    pub ignored_hosts: Vec<String>,
}

/// Resolved proxy for a single target URL. Consumed only by the script
/// fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    /// Resolves the proxy to use for `url`, honoring the ignore list.
    pub fn proxy_for(&self, url: &str) -> Option<ProxyDescriptor> {
        let target_host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))?;

        let ignored = self
            .ignored_hosts
            .iter()
            .any(|pattern| target_host == *pattern || target_host.ends_with(&format!(".{pattern}")));
        if ignored {
            return None;
        }

        Some(ProxyDescriptor {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

impl GlobalConfig {
    /// Returns the default configuration file path for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scanlaunch").join("config.yml"))
    }

    /// Loads configuration from the default location, returning defaults if
    /// no file exists. Used by the `config` subcommand for editing.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(GlobalConfig::default()),
        }
    }

    /// Loads configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to read config file {}: {}\n\n\
                 Suggestions:\n\
                 • Check file permissions: ls -la {}\n\
                 • Recreate it with: scanlaunch config init",
                path.display(),
                e,
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!(
                "Failed to parse config file {}: {}\n\n\
                 Suggestions:\n\
                 • Check YAML syntax in the config file\n\
                 • Verify indentation uses spaces, not tabs\n\
                 • Backup and recreate: mv {} {}.bak && scanlaunch config init",
                path.display(),
                e,
                path.display(),
                path.display()
            ))
        })
    }

    /// Saves configuration to the default location.
    pub fn save(&self) -> Result<()> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Err(Error::Configuration(
                "Could not determine config directory. Check that HOME is set.".to_string(),
            )),
        }
    }

    /// Saves configuration to a specific file path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_yaml::to_string(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {e}")))?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Gets a remote configuration by name.
    pub fn get_remote(&self, name: &str) -> Option<&RemoteConfig> {
        self.remotes.get(name)
    }

    /// Resolves the proxy for a URL, if a proxy is configured and the URL's
    /// host is not on the ignore list.
    pub fn proxy_for(&self, url: &str) -> Option<ProxyDescriptor> {
        self.proxy.as_ref().and_then(|p| p.proxy_for(url))
    }
}

impl RemoteConfig {
    /// Creates a new remote configuration with required fields.
    pub fn new(host: String, user: String) -> Self {
        Self {
            host,
            user,
            port: DEFAULT_SSH_PORT,
            scanlaunch_path: DEFAULT_SCANLAUNCH_PATH.to_string(),
            ssh_key: None,
            os_family: OsFamily::Posix,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Returns the SSH connection string (user@host:port).
    pub fn connection_string(&self) -> String {
        if self.port == DEFAULT_SSH_PORT {
            format!("{}@{}", self.user, self.host)
        } else {
            format!("{}@{}:{}", self.user, self.host, self.port)
        }
    }

    /// Expands the SSH key path, replacing ~ with the home directory.
    pub fn expanded_ssh_key(&self) -> Option<PathBuf> {
        self.ssh_key.as_ref().map(|key| {
            if let Some(stripped) = key.strip_prefix("~/") {
                if let Some(home) = dirs::home_dir() {
                    return home.join(stripped);
                }
            }
            PathBuf::from(key)
        })
    }
}

/// Source of global configuration for a run. Injected into the runner so
/// strategy resolution is deterministic under test.
pub trait ConfigProvider {
    /// The global configuration. Unreachable configuration (missing or
    /// unparsable file) is a configuration error, not a default.
    fn global(&self) -> Result<GlobalConfig>;

    /// Home directory of a named air-gap installation, if registered.
    fn airgap_home(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .global()?
            .airgap_installations
            .get(name)
            .cloned())
    }
}

/// Production provider reading the YAML configuration file.
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Provider for the platform default config path.
    pub fn default_location() -> Result<Self> {
        GlobalConfig::default_path()
            .map(Self::new)
            .ok_or_else(|| {
                Error::Configuration(
                    "Could not determine config directory. Check that HOME is set.".to_string(),
                )
            })
    }
}

impl ConfigProvider for FileConfigProvider {
    fn global(&self) -> Result<GlobalConfig> {
        if !self.path.exists() {
            return Err(Error::Configuration(format!(
                "Could not find scanlaunch configuration at {}. \
                 Run `scanlaunch config init` to create it.",
                self.path.display()
            )));
        }
        GlobalConfig::load_from(&self.path)
    }
}
