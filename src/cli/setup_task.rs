//! Node-side agent command.
//!
//! The SSH executor pipes a JSON-encoded setup task into this command on
//! the target node. All logging goes to stderr; stdout carries only the
//! JSON token list the controller decodes.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Read;

use crate::cancel::CancellationToken;
use crate::remote::SetupTask;

#[derive(Args)]
#[command(about = "Execute a serialized setup task (used internally over SSH)")]
pub struct SetupTaskCommand {}

impl SetupTaskCommand {
    pub fn execute(&self) -> Result<()> {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("Failed to read setup task from stdin")?;

        let task: SetupTask =
            serde_json::from_str(&payload).context("Failed to decode setup task")?;

        let tokens = task.call(&CancellationToken::new())?;
        println!("{}", serde_json::to_string(&tokens)?);
        Ok(())
    }
}
