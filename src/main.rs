use anyhow::Result;
use clap::{Parser, Subcommand};

use scanlaunch::cli::config::ConfigCommand;
use scanlaunch::cli::run::RunCommand;
use scanlaunch::cli::setup_task::SetupTaskCommand;

#[derive(Parser)]
#[command(name = "scanlaunch")]
#[command(about = "Prepare and launch the Detect scanner on local or remote build agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run(RunCommand),
    #[command(hide = true)]
    SetupTask(SetupTaskCommand),
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // Initialize logging with INFO level by default; logs go to stderr so
    // the setup-task stdout protocol stays clean.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(cmd) => {
            let exit_code = cmd.execute()?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
        Commands::SetupTask(cmd) => cmd.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}
