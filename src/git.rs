//! Source revision lookup for provenance headers
//!
//! Every generated `spack.yaml` records the revisions of the spack-stack
//! checkout and of the Spack installation it was created from. Revisions are
//! read with the system `git` command through the [`RevisionSource`] trait so
//! tests can substitute fixed values.

use std::path::Path;
use std::process::Command;

use log::warn;

use crate::error::{Error, Result};

/// Placeholder recorded when a revision cannot be determined
pub const UNKNOWN_REVISION: &str = "unknown";

/// Trait for revision lookups - allows mocking in tests
pub trait RevisionSource {
    /// Short revision hash of the checkout containing `path`
    fn short_revision(&self, path: &Path) -> Result<String>;
}

/// The default implementation of `RevisionSource`, which runs
/// `git rev-parse --short HEAD`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitRevisions;

impl RevisionSource for GitRevisions {
    fn short_revision(&self, path: &Path) -> Result<String> {
        rev_parse_short(path)
    }
}

/// Run `git rev-parse --short HEAD` in `path`
pub fn rev_parse_short(path: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(path)
        .output()
        .map_err(|e| Error::GitCommand {
            command: "rev-parse --short HEAD".to_string(),
            path: path.to_path_buf(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GitCommand {
            command: "rev-parse --short HEAD".to_string(),
            path: path.to_path_buf(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn revision_or_unknown(source: &dyn RevisionSource, path: &Path) -> String {
    match source.short_revision(path) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Could not determine revision of {}: {}", path.display(), e);
            UNKNOWN_REVISION.to_string()
        }
    }
}

/// Build the two-line provenance header for a generated manifest
pub fn provenance_header(source: &dyn RevisionSource, stack_root: &Path, spack_root: &Path) -> String {
    format!(
        "spack-stack hash: {}\nspack hash: {}",
        revision_or_unknown(source, stack_root),
        revision_or_unknown(source, spack_root)
    )
}
