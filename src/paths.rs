//! Locations inside a spack-stack checkout.
//!
//! A spack-stack checkout is recognized by the hidden marker file
//! `.spackstack` at its top level. Spack itself is expected as a submodule in
//! `<root>/spack`, and the configuration bundles live under `<root>/configs`:
//!
//! ```text
//! <root>/
//!   .spackstack
//!   spack/
//!   configs/
//!     common/        shared config, staged into every environment
//!     sites/<site>/  per-site config (compilers, module system, ...)
//!     templates/<t>/ spack.yaml templates
//!     containers/    container templates, plus specs/ lists
//!   envs/            default location for new environments
//! ```

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the marker file at the top of a spack-stack checkout
pub const CHECK_FILE: &str = ".spackstack";

/// Resolved locations of a spack-stack checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPaths {
    /// Top-level spack-stack directory
    pub root: PathBuf,
    /// Spack installation used by this checkout
    pub spack_root: PathBuf,
}

impl StackPaths {
    /// Use `root` as the checkout, with Spack in `<root>/spack`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let spack_root = root.join("spack");
        Self { root, spack_root }
    }

    /// Use a Spack installation outside of the checkout
    pub fn with_spack_root(mut self, spack_root: impl Into<PathBuf>) -> Self {
        self.spack_root = spack_root.into();
        self
    }

    /// Walk up from `start` to the first directory containing `.spackstack`
    pub fn discover(start: &Path) -> Result<Self> {
        start
            .ancestors()
            .find(|dir| dir.join(CHECK_FILE).is_file())
            .map(Self::new)
            .ok_or_else(|| Error::StackRoot {
                path: start.to_path_buf(),
            })
    }

    /// `configs/common`
    pub fn common(&self) -> PathBuf {
        self.root.join("configs").join("common")
    }

    /// `configs/sites`
    pub fn sites(&self) -> PathBuf {
        self.root.join("configs").join("sites")
    }

    /// Configuration directory of one site
    pub fn site_dir(&self, site: &str) -> PathBuf {
        self.sites().join(site)
    }

    /// `configs/templates`
    pub fn templates(&self) -> PathBuf {
        self.root.join("configs").join("templates")
    }

    /// `configs/containers`
    pub fn containers(&self) -> PathBuf {
        self.root.join("configs").join("containers")
    }

    /// `configs/containers/specs`
    pub fn container_specs(&self) -> PathBuf {
        self.containers().join("specs")
    }

    /// Default parent directory for new environments
    pub fn envs(&self) -> PathBuf {
        self.root.join("envs")
    }
}
