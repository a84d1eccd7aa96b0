//! Upstream install trees
//!
//! An environment can reuse packages already installed by another Spack
//! instance by listing its install tree under `upstreams:`. Each upstream
//! needs a name. For installs made by spack-stack itself the name is derived
//! from the release and environment in the path:
//!
//! ```text
//! /work/spack-stack/spack-stack-1.5.0/envs/unified-env/install
//!   -> spack-stack-1.5.0-unified-env
//! ```
//!
//! Any other path is named after its final segment, or `upstream` if it has
//! none.

use std::path::{Component, Path, PathBuf};

use log::warn;
use regex::Regex;

use crate::error::Result;
use crate::merge::quote_component;

/// Pattern recognizing spack-stack install trees
pub const SPACK_STACK_UPSTREAM_PATTERN: &str =
    r"^.+/(?P<spack_stack_ver>spack-stack-[^/]+)/envs/(?P<env_name>[^/]+)";

/// Name used for a path without any normal segment, such as `/`
pub const FALLBACK_UPSTREAM_NAME: &str = "upstream";

/// An upstream install tree and the name it is registered under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub name: String,
    pub install_tree: PathBuf,
}

impl Upstream {
    /// Build an upstream from a user-supplied path
    ///
    /// A leading `~` is expanded. Suspicious paths (not named `install`, or
    /// not present on disk) are reported as warnings but still accepted.
    pub fn from_path(raw: &str) -> Result<Self> {
        let install_tree = expand_home(raw);
        check_upstream_path(&install_tree);
        let name = infer_upstream_name(&install_tree.to_string_lossy())?;
        Ok(Self { name, install_tree })
    }

    /// The config path that registers this upstream
    pub fn config_path(&self) -> String {
        format!(
            "upstreams:{}:install_tree:{}",
            quote_component(&self.name),
            quote_component(&self.install_tree.to_string_lossy())
        )
    }
}

/// Infer the upstream name for an install tree path
///
/// ```
/// use spack_stack::upstream::infer_upstream_name;
///
/// let name = infer_upstream_name("/opt/spack-stack-1.5.0/envs/unified-env/install").unwrap();
/// assert_eq!(name, "spack-stack-1.5.0-unified-env");
/// assert_eq!(infer_upstream_name("/opt/shared/install").unwrap(), "install");
/// ```
pub fn infer_upstream_name(path: &str) -> Result<String> {
    let pattern = Regex::new(SPACK_STACK_UPSTREAM_PATTERN)?;
    if let Some(captures) = pattern.captures(path) {
        return Ok(format!(
            "{}-{}",
            &captures["spack_stack_ver"], &captures["env_name"]
        ));
    }
    let name = final_segment(Path::new(path));
    if name.is_empty() {
        return Ok(FALLBACK_UPSTREAM_NAME.to_string());
    }
    Ok(name)
}

fn final_segment(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .last()
        .unwrap_or_default()
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Warn about upstream paths that are probably mistakes
///
/// Returns `true` if the path looked fine.
pub fn check_upstream_path(path: &Path) -> bool {
    let mut ok = true;
    if final_segment(path) != "install" {
        warn!(
            "Upstream path '{}' is not an 'install' directory!",
            path.display()
        );
        ok = false;
    }
    if !path.is_dir() {
        warn!(
            "Upstream path '{}' does not appear to exist!",
            path.display()
        );
        ok = false;
    }
    ok
}
