//! Remote execution of the scanner setup and launch.
//!
//! The controller decides the strategy; the node executes it. This module
//! defines the boundary: a `SetupTask` travels to the node and comes back as
//! an invocation prefix, then the assembled command line is launched there.
//! `SshExecutor` crosses a real machine boundary; `LocalExecutor` serves
//! same-node runs and tests.

pub mod local;
pub mod retry;
pub mod ssh;
pub mod task;

pub use local::LocalExecutor;
pub use retry::{diagnose_ssh_error, retry_with_backoff, RetryConfig};
pub use ssh::SshExecutor;
pub use task::SetupTask;

use crate::environment::EnvironmentSnapshot;
use crate::error::Result;
use crate::os::OsFamily;

/// Facility that runs the setup computation and launches a process on the
/// target node. A launch blocks the caller until the node-side process
/// exits; its exit code is returned as-is.
pub trait RemoteExecutor {
    /// OS family of the target node.
    fn os_family(&self) -> OsFamily;

    /// Executes the setup computation on the node, returning the invocation
    /// prefix it produced.
    fn setup(&self, task: &SetupTask) -> Result<Vec<String>>;

    /// Launches the assembled command line on the node with exactly the
    /// given environment, returning the process exit code.
    fn launch(&self, argv: &[String], env: &EnvironmentSnapshot) -> Result<i32>;
}
