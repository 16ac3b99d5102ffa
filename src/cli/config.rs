//! CLI command for managing scanlaunch configuration.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand, ValueEnum};

use crate::config::{GlobalConfig, ProxySettings, RemoteConfig};
use crate::os::OsFamily;
use crate::strategy::DownloadStrategy;

#[derive(Args)]
#[command(about = "Manage scanlaunch configuration")]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Create a default configuration file
    Init,

    /// List all configured remotes
    ListRemotes,

    /// Add a new remote node
    AddRemote {
        /// Name for the remote (e.g., "build-agent")
        name: String,

        /// Hostname or IP address
        #[arg(long)]
        host: String,

        /// SSH username
        #[arg(long)]
        user: String,

        /// SSH port
        #[arg(long, default_value = "22")]
        port: u16,

        /// Path to the scanlaunch binary on the node
        #[arg(long, default_value = "scanlaunch")]
        scanlaunch_path: String,

        /// Path to SSH private key
        #[arg(long)]
        ssh_key: Option<String>,

        /// Operating-system family of the node
        #[arg(long, value_enum, default_value = "posix")]
        os_family: OsChoice,

        /// Connection timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,
    },

    /// Store the system download strategy
    SetStrategy {
        #[arg(value_enum)]
        strategy: StrategyName,

        /// Air-gap installation name, for the air-gap strategy
        #[arg(long)]
        airgap_installation: Option<String>,
    },

    /// Register an air-gap installation directory
    AddAirgap {
        /// Installation name
        name: String,

        /// Directory holding the scanner jar
        #[arg(long)]
        directory: String,
    },

    /// Configure the download proxy
    SetProxy {
        #[arg(long)]
        host: String,

        #[arg(long)]
        port: u16,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OsChoice {
    Posix,
    Windows,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StrategyName {
    AirGap,
    ScriptOrJar,
}

impl ConfigCommand {
    pub fn execute(&self) -> Result<()> {
        match &self.action {
            ConfigAction::Show => {
                let config = GlobalConfig::load_or_default()?;
                println!("{}", serde_yaml::to_string(&config)?);
            }
            ConfigAction::Path => match GlobalConfig::default_path() {
                Some(path) => println!("{}", path.display()),
                None => return Err(anyhow!("Could not determine config directory")),
            },
            ConfigAction::Init => {
                let config = GlobalConfig::load_or_default()?;
                config.save()?;
                if let Some(path) = GlobalConfig::default_path() {
                    println!("Configuration written to {}", path.display());
                }
            }
            ConfigAction::ListRemotes => {
                let config = GlobalConfig::load_or_default()?;
                if config.remotes.is_empty() {
                    println!("No remotes configured.");
                }
                for (name, remote) in &config.remotes {
                    println!("{}: {} ({})", name, remote.connection_string(), remote.os_family);
                }
            }
            ConfigAction::AddRemote {
                name,
                host,
                user,
                port,
                scanlaunch_path,
                ssh_key,
                os_family,
                timeout,
            } => {
                let mut config = GlobalConfig::load_or_default()?;
                let remote = RemoteConfig {
                    host: host.clone(),
                    user: user.clone(),
                    port: *port,
                    scanlaunch_path: scanlaunch_path.clone(),
                    ssh_key: ssh_key.clone(),
                    os_family: match os_family {
                        OsChoice::Posix => OsFamily::Posix,
                        OsChoice::Windows => OsFamily::Windows,
                    },
                    timeout: *timeout,
                };
                config.remotes.insert(name.clone(), remote);
                config.save()?;
                println!("Remote '{name}' added.");
            }
            ConfigAction::SetStrategy {
                strategy,
                airgap_installation,
            } => {
                let mut config = GlobalConfig::load_or_default()?;
                config.download_strategy = Some(match strategy {
                    StrategyName::AirGap => DownloadStrategy::AirGap {
                        installation: airgap_installation.clone(),
                    },
                    StrategyName::ScriptOrJar => DownloadStrategy::ScriptOrJar,
                });
                config.save()?;
                println!("Download strategy stored.");
            }
            ConfigAction::AddAirgap { name, directory } => {
                let mut config = GlobalConfig::load_or_default()?;
                config
                    .airgap_installations
                    .insert(name.clone(), directory.clone());
                config.save()?;
                println!("Air-gap installation '{name}' registered.");
            }
            ConfigAction::SetProxy {
                host,
                port,
                username,
                password,
            } => {
                let mut config = GlobalConfig::load_or_default()?;
                config.proxy = Some(ProxySettings {
                    host: host.clone(),
                    port: *port,
                    username: username.clone(),
                    password: password.clone(),
                    ignored_hosts: config.proxy.map(|p| p.ignored_hosts).unwrap_or_default(),
                });
                config.save()?;
                println!("Proxy configured.");
            }
        }
        Ok(())
    }
}
