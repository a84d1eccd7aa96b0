//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `spack-stack` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and calls into the
//!   `spack_stack` library.

pub mod completions;
pub mod create;
