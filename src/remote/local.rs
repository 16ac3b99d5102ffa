//! Same-node execution of setup and launch.

use crate::cancel::CancellationToken;
use crate::environment::EnvironmentSnapshot;
use crate::error::{Error, Result};
use crate::os::OsFamily;
use crate::remote::{RemoteExecutor, SetupTask};
use log::{debug, info};
use std::process::Command;

/// Executor for runs where the controller and the node are the same
/// machine. The setup task is called in-process and the scanner is spawned
/// directly, with the snapshot as its entire environment.
pub struct LocalExecutor {
    cancel: CancellationToken,
}

impl LocalExecutor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl RemoteExecutor for LocalExecutor {
    fn os_family(&self) -> OsFamily {
        OsFamily::current()
    }

    fn setup(&self, task: &SetupTask) -> Result<Vec<String>> {
        self.cancel.check("scanner setup")?;
        task.call(&self.cancel)
    }

    fn launch(&self, argv: &[String], env: &EnvironmentSnapshot) -> Result<i32> {
        let (program, arguments) = argv.split_first().ok_or_else(|| {
            Error::Remote("cannot launch an empty command line".to_string())
        })?;

        self.cancel.check("scanner launch")?;
        info!("Launching scanner: {}", argv.join(" "));

        let status = Command::new(program)
            .args(arguments)
            .env_clear()
            .envs(env.iter())
            .status()
            .map_err(|e| self.cancel.classify_io("scanner launch", e))?;

        match status.code() {
            Some(code) => {
                debug!("Scanner exit code: {code}");
                Ok(code)
            }
            None => Err(Error::Interrupted(
                "scanner process was terminated by a signal".to_string(),
            )),
        }
    }
}
