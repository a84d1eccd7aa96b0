//! # Completions Command Implementation
//!
//! Generates shell completion scripts for `spack-stack` with `clap_complete`.
//!
//! ```bash
//! spack-stack completions bash > ~/.local/share/bash-completion/completions/spack-stack
//! spack-stack completions zsh --output ~/.zfunc/_spack-stack
//! ```

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

fn render(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "spack-stack", out);
}

/// Execute the `completions` command.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            render(args.shell, &mut file);
        }
        None => render(args.shell, &mut io::stdout()),
    }
    Ok(())
}
