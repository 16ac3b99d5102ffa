//! CLI command that runs the scanner.

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};

use crate::cancel::CancellationToken;
use crate::config::{ConfigProvider, FileConfigProvider};
use crate::environment::EnvironmentSnapshot;
use crate::remote::{LocalExecutor, SshExecutor};
use crate::runner::{RunOptions, Runner};
use crate::strategy::DownloadStrategy;

#[derive(Args)]
#[command(about = "Run the scanner locally or on a configured remote node")]
pub struct RunCommand {
    /// Scanner options, passed through after tokenization and escaping
    #[arg(default_value = "")]
    pub arguments: String,

    /// Name of a configured remote node; omit to run on this machine
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Download strategy override; defaults to inheriting the configuration
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyChoice>,

    /// Air-gap installation name, required with `--strategy air-gap`
    #[arg(long)]
    pub airgap_installation: Option<String>,

    /// JDK home on the node, overriding environment-based resolution
    #[arg(long)]
    pub jdk_home: Option<String>,

    /// Environment variable for the scanner process (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Workspace tools root the bootstrap script is cached under
    #[arg(long, default_value = ".")]
    pub workspace: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StrategyChoice {
    Inherit,
    AirGap,
    ScriptOrJar,
}

impl RunCommand {
    /// Runs the scanner and returns its exit code.
    pub fn execute(&self) -> Result<i32> {
        let provider = FileConfigProvider::default_location()?;

        let options = RunOptions {
            arguments: self.arguments.clone(),
            remote_jdk_home: self.jdk_home.clone(),
            download_strategy: self.download_strategy(),
            workspace: self.workspace.clone(),
            environment: self.build_environment(&provider)?,
        };

        let cancel = CancellationToken::new();
        match &self.remote {
            Some(name) => {
                let global = provider
                    .global()
                    .context("Remote execution requires a readable configuration")?;
                let remote = global.get_remote(name).ok_or_else(|| {
                    anyhow!(
                        "Remote '{}' not configured.\n\n\
                         Add it with:\n\
                         \n  scanlaunch config add-remote {} --host <hostname> --user <username>\n\n\
                         Or list existing remotes with:\n\
                         \n  scanlaunch config list-remotes\n",
                        name,
                        name
                    )
                })?;
                let executor = SshExecutor::new(remote.clone(), cancel);
                Ok(Runner::new(&provider, &executor).run(&options)?)
            }
            None => {
                let executor = LocalExecutor::new(cancel);
                Ok(Runner::new(&provider, &executor).run(&options)?)
            }
        }
    }

    fn download_strategy(&self) -> Option<DownloadStrategy> {
        self.strategy.map(|choice| match choice {
            StrategyChoice::Inherit => DownloadStrategy::Inherit,
            StrategyChoice::AirGap => DownloadStrategy::AirGap {
                installation: self.airgap_installation.clone(),
            },
            StrategyChoice::ScriptOrJar => DownloadStrategy::ScriptOrJar,
        })
    }

    /// The snapshot starts from configured variables and applies `--env`
    /// flags on top. The controller's own environment is never copied in.
    fn build_environment(&self, provider: &dyn ConfigProvider) -> Result<EnvironmentSnapshot> {
        let mut env = EnvironmentSnapshot::new();

        if let Ok(global) = provider.global() {
            for (name, value) in &global.environment {
                env.set(name.clone(), value.clone());
            }
        }

        for pair in &self.env {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid --env value '{pair}', expected KEY=VALUE"))?;
            env.set(name, value);
        }

        Ok(env)
    }
}
