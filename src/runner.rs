//! Orchestration of a single scanner run.
//!
//! Resolves the execution strategy, runs its setup computation on the
//! target node, assembles the final command line from the invocation prefix
//! plus escaped user tokens plus launcher-injected flags, and dispatches it.
//! The scanner's exit code is returned untouched; classifying it is the
//! caller's business.

use crate::args;
use crate::config::ConfigProvider;
use crate::environment::EnvironmentSnapshot;
use crate::error::{Error, Result};
use crate::remote::RemoteExecutor;
use crate::strategy::{resolve_strategy, DownloadStrategy};
use log::{debug, info};

/// Per-run inputs. Built once by the caller and consumed by [`Runner::run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Raw user-supplied option string, whitespace-tokenized with quote
    /// grouping.
    pub arguments: String,
    /// Explicitly configured JDK home on the node, if any.
    pub remote_jdk_home: Option<String>,
    /// Explicit strategy override; absent or `Inherit` defers to global
    /// configuration.
    pub download_strategy: Option<DownloadStrategy>,
    /// Workspace tools root on the node; bootstrap scripts are cached
    /// beneath it.
    pub workspace: String,
    /// Environment the scanner process will see. Never inherits the
    /// controller's environment.
    pub environment: EnvironmentSnapshot,
}

pub struct Runner<'a> {
    provider: &'a dyn ConfigProvider,
    executor: &'a dyn RemoteExecutor,
}

impl<'a> Runner<'a> {
    pub fn new(provider: &'a dyn ConfigProvider, executor: &'a dyn RemoteExecutor) -> Self {
        Self { provider, executor }
    }

    /// Runs the scanner once, returning its exit code.
    pub fn run(&self, options: &RunOptions) -> Result<i32> {
        let os_family = self.executor.os_family();
        let strategy = resolve_strategy(
            options.download_strategy.clone(),
            self.provider,
            &options.environment,
            os_family,
            options.remote_jdk_home.as_deref(),
            &options.workspace,
        )?;

        let escaper = strategy.escaper();
        let task = strategy.setup_task();

        let mut argv = self.executor.setup(&task)?;
        if argv.is_empty() {
            return Err(Error::Remote(
                "Setup returned an empty invocation prefix".to_string(),
            ));
        }
        debug!("Invocation prefix: {argv:?}");

        argv.extend(args::parse_argument_string(
            &options.arguments,
            &options.environment,
            escaper,
        )?);
        argv.extend(args::injected_flags());

        info!("Scanner command line: {}", argv.join(" "));
        self.executor.launch(&argv, &options.environment)
    }
}
