//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::commands;

/// spack-stack - Create Spack environments and container recipes
#[derive(Parser, Debug)]
#[command(name = "spack-stack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// spack-stack checkout (defaults to the one containing the current directory)
    #[arg(long, global = true, value_name = "PATH", env = "SPACK_STACK_DIR")]
    stack_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an environment or a container recipe
    Create(commands::create::CreateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Initialize `env_logger`; `RUST_LOG` takes precedence over `--log-level`
    pub fn init_logging(&self) {
        env_logger::Builder::from_env(Env::default().default_filter_or(&self.log_level))
            .format_timestamp(None)
            .format_target(false)
            .init();
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Create(args) => commands::create::execute(args, self.stack_dir),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
