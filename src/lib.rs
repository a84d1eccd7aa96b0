//! # spack-stack Library
//!
//! This library composes Spack environments for a spack-stack checkout. It is
//! used by the `spack-stack` command-line tool, but the composition can be
//! driven directly from other programs.
//!
//! ## Quick Example
//!
//! ```
//! use spack_stack::manifest::Manifest;
//!
//! let mut manifest = Manifest::empty();
//! manifest.set_includes(&["site".to_string(), "common".to_string()]);
//! manifest.add("packages:all::compiler:[gcc@12.2.0]").unwrap();
//!
//! let text = manifest.to_yaml_string(Some("spack-stack hash: abc1234")).unwrap();
//! assert!(text.starts_with("# spack-stack hash: abc1234\n# This is a Spack Environment file."));
//! assert!(text.contains("all::"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Layout (`paths`)**: Locates the spack-stack checkout and its
//!   `configs/` tree (common configuration, sites, templates, containers).
//! - **Manifest (`manifest`, `merge`)**: The `spack.yaml` document, edited
//!   with colon-separated config paths and merged with Spack's precedence
//!   rules, including `key::` override keys.
//! - **Staging (`filesystem`, `modules`, `repo`)**: Copies configuration
//!   directories into the new environment, selects the module system and
//!   builds the optional package-recipe overlay.
//! - **Composition (`stack_env`, `container`)**: Runs the full pipeline for a
//!   regular environment or a container recipe.
//!
//! ## Execution Flow
//!
//! [`stack_env::StackEnv::write`] stages the site and common configuration,
//! registers them as includes, applies compiler, MPI, prefix, upstream and
//! overlay settings, then merges the template's own sections back on top so
//! they keep the highest precedence. The result is written with a header
//! recording the spack-stack and Spack revisions.

pub mod container;
pub mod environment;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod manifest;
pub mod merge;
pub mod modules;
pub mod paths;
pub mod repo;
pub mod stack_env;
pub mod umask;
pub mod upstream;

#[cfg(test)]
mod upstream_proptest;

#[cfg(test)]
mod manifest_proptest;
