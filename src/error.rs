//! # Error Handling
//!
//! This module defines the centralized error type for the `spack-stack`
//! library. It uses `thiserror` to describe every fatal failure mode of the
//! environment composition with enough context to act on it.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant corresponds to one class of
//!   fatal failure: a missing template, a pre-existing environment, a site
//!   that was never designated, a malformed site `modules.yaml`, and so on.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Conditions that do not abort composition (suspicious upstream paths,
//! missing overlay packages, unavailable revision hashes) are not errors.
//! They are reported through `log::warn!` at the point where they occur.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for spack-stack operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested manifest template is neither an absolute path nor the
    /// name of a directory under `configs/templates`.
    #[error("Template: \"{template}\" does not exist")]
    TemplateNotFound { template: String },

    /// The target environment directory is already present on disk.
    #[error("Environment '{}' already exists.", path.display())]
    EnvironmentExists { path: PathBuf },

    /// A site is required but none was given.
    #[error("Site is not set{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    SiteNotSet {
        /// Optional hint for how to resolve the issue
        hint: Option<String>,
    },

    /// The site `modules.yaml` does not enable exactly one module system.
    #[error("Invalid module configuration in {}: {message}", path.display())]
    InvalidModuleConfig { path: PathBuf, message: String },

    /// The requested container template could not be located.
    #[error("Invalid container {container}")]
    ContainerNotFound { container: String },

    /// The requested container spec list could not be located.
    #[error("Invalid specs list {specs}")]
    SpecsNotFound { specs: String },

    /// No spack-stack checkout could be found.
    #[error("Not a spack-stack directory: {} (no .spackstack marker found)", path.display())]
    StackRoot { path: PathBuf },

    /// A colon-separated config path could not be parsed.
    #[error("Invalid config path '{path}': {message}")]
    ConfigPath { path: String, message: String },

    /// An error occurred while merging configuration trees.
    #[error("Merge operation error: {operation} - {message}")]
    Merge { operation: String, message: String },

    /// The manifest does not follow the expected `spack:` schema.
    #[error("Manifest error: {message}")]
    Manifest { message: String },

    /// An error occurred while executing a Git command.
    #[error("Git command failed in {}: {command} - {stderr}", path.display())]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    /// The environment transaction lock is held by someone else.
    #[error("Environment lock error at {}: {message}", path.display())]
    Lock { path: PathBuf, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A directory traversal error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
