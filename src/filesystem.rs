//! Directory staging helpers
//!
//! Configuration bundles are copied verbatim into a new environment. The only
//! transformation is skipping entries whose file name matches an ignore
//! pattern, e.g. the per-tool `modules_*.yaml` variants or `__pycache__`
//! directories.

use std::fs;
use std::path::Path;

use glob::Pattern;
use log::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Copy the directory tree at `src` to `dst`
///
/// `dst` must not exist yet; it is created along with any missing parents.
/// Entries whose file name matches one of the `ignore` glob patterns are
/// skipped, and an ignored directory is not descended into. Symbolic links are
/// followed. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, ignore: &[&str]) -> Result<usize> {
    if dst.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("Destination '{}' already exists", dst.display()),
        )));
    }

    let patterns = ignore
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let walker = WalkDir::new(src)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !patterns
                    .iter()
                    .any(|p| p.matches(&entry.file_name().to_string_lossy()))
        });

    let mut copied = 0;
    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    debug!(
        "Copied {} files from {} to {}",
        copied,
        src.display(),
        dst.display()
    );
    Ok(copied)
}

/// Copy `src` to `target`, replacing whatever file is there
pub fn replace_file(src: &Path, target: &Path) -> Result<()> {
    if !src.is_file() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("'{}' is not a file", src.display()),
        )));
    }
    fs::copy(src, target)?;
    Ok(())
}
