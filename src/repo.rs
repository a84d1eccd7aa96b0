//! Custom package-recipe overlay (`envrepo`)
//!
//! Packages named with `--modify-pkg` are copied out of the Spack recipe
//! repositories into a repository that lives inside the environment, so they
//! can be edited without touching the Spack checkout. The overlay is then
//! registered ahead of every other repository.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_yaml::Value as YamlValue;

use crate::error::Result;
use crate::filesystem::copy_tree;
use crate::manifest::load_config;
use crate::merge::yaml::get_key;

/// Namespace and directory name of the overlay repository
pub const OVERLAY_NAMESPACE: &str = "envrepo";

/// Config path that registers the overlay in an environment
pub const OVERLAY_REPOS_CONFIG: &str = "repos:[$env/envrepo]";

/// Spack's own repository list files, highest precedence first
const REPOS_CONFIG_FILES: &[&str] = &["etc/spack/repos.yaml", "etc/spack/defaults/repos.yaml"];

/// The repository Spack ships with
const BUILTIN_REPO: &str = "var/spack/repos/builtin";

fn read_repos_file(path: &Path, spack_root: &Path) -> Result<Vec<PathBuf>> {
    let document = load_config(&fs::read_to_string(path)?)?;
    let entries = document
        .as_mapping()
        .and_then(|root| get_key(root, "repos"))
        .and_then(YamlValue::as_sequence)
        .map(|seq| seq.iter().filter_map(YamlValue::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    let prefix = format!("{}/", spack_root.display());
    Ok(entries
        .into_iter()
        .map(|entry| PathBuf::from(entry.replace("$spack/", &prefix)))
        .collect())
}

/// Recipe repositories of the Spack installation at `spack_root`
///
/// Entries from the site `repos.yaml` come before the defaults, and
/// duplicates are dropped. `$spack/` expands to `spack_root`. If neither file
/// lists anything the builtin repository is used.
pub fn repo_search_paths(spack_root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for file in REPOS_CONFIG_FILES {
        let path = spack_root.join(file);
        if !path.is_file() {
            continue;
        }
        for repo in read_repos_file(&path, spack_root)? {
            if !paths.contains(&repo) {
                paths.push(repo);
            }
        }
    }
    if paths.is_empty() {
        paths.push(spack_root.join(BUILTIN_REPO));
    }
    debug!("Recipe repositories: {:?}", paths);
    Ok(paths)
}

/// Create `<env_dir>/envrepo` and copy the requested packages into it
///
/// Each package is taken from the first repository in `search_paths` that
/// has it. Packages that cannot be found are logged and skipped. Returns the
/// names of the packages copied.
pub fn build_overlay_repo(
    env_dir: &Path,
    packages: &[String],
    search_paths: &[PathBuf],
) -> Result<Vec<String>> {
    info!("Creating custom repo with packages {}", packages.join(", "));
    let repo_dir = env_dir.join(OVERLAY_NAMESPACE);
    let packages_dir = repo_dir.join("packages");
    if repo_dir.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("'{}' already exists", repo_dir.display()),
        )
        .into());
    }
    fs::create_dir_all(&packages_dir)?;
    fs::write(
        repo_dir.join("repo.yaml"),
        format!("repo:\n  namespace: {}", OVERLAY_NAMESPACE),
    )?;

    let mut copied = Vec::new();
    for package in packages {
        let source = search_paths
            .iter()
            .map(|repo| repo.join("packages").join(package))
            .find(|candidate| candidate.exists());
        match source {
            Some(source) => {
                copy_tree(&source, &packages_dir.join(package), &["__pycache__"])?;
                copied.push(package.clone());
            }
            None => warn!("Package '{}' could not be found", package),
        }
    }
    Ok(copied)
}
