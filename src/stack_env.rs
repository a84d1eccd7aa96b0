//! Composition of a spack-stack environment.
//!
//! ## Overview
//!
//! [`StackEnv::write`] turns a [`StackEnvConfig`] into an environment
//! directory containing a `spack.yaml` and the configuration it includes:
//!
//! 1. Load the base manifest (named template, absolute path, or the empty
//!    default)
//! 2. Stage the site configuration as `site/` (unless the site is `none`)
//! 3. Stage the common configuration as `common/`, with the module-system
//!    specific `modules_<tool>.yaml` installed as `modules.yaml`
//! 4. Replace `common/packages.yaml` with the user's base packages, if given
//! 5. Set `include` to `[site, common]`
//! 6. Snapshot the configuration sections of the base manifest
//! 7. Apply compiler, MPI, install prefix, upstream and overlay-repo settings
//! 8. Merge the snapshot back so the base manifest keeps top precedence
//! 9. Write `spack.yaml` with a provenance header
//!
//! Precedence, highest first: the base manifest, the programmatic settings of
//! step 7, then the included site and common directories.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentContext;
use crate::error::{Error, Result};
use crate::filesystem::{copy_tree, replace_file};
use crate::git::{provenance_header, RevisionSource};
use crate::manifest::{Manifest, ManifestSource};
use crate::merge::quote_component;
use crate::modules::{override_site_module_system, read_site_module_system, ModuleSystem, MODULES_YAML};
use crate::paths::StackPaths;
use crate::repo::{build_overlay_repo, repo_search_paths, OVERLAY_REPOS_CONFIG};
use crate::upstream::Upstream;

/// Site value meaning "no site configuration"
pub const NO_SITE: &str = "none";

/// Include name of the staged site configuration
pub const SITE_INCLUDE: &str = "site";

/// Include name of the staged common configuration
pub const COMMON_INCLUDE: &str = "common";

/// Name of the package preferences file in a config directory
pub const PACKAGES_YAML: &str = "packages.yaml";

/// Settings for a new environment
///
/// Every field is optional. The same structure is filled from command-line
/// arguments or deserialized from a YAML input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackEnvConfig {
    /// Environment name. Defaults to `<template>.<site>`.
    #[serde(default)]
    pub name: Option<String>,

    /// Parent directory of the environment. Defaults to `<stack root>/envs`.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Template name under `configs/templates`, or an absolute path to a
    /// `spack.yaml`. Defaults to the empty manifest.
    #[serde(default)]
    pub template: Option<String>,

    /// Site name under `configs/sites`. `none` or unset skips site staging.
    #[serde(default)]
    pub site: Option<String>,

    /// Compiler spec preferred for all packages, e.g. `gcc@11.2.0`
    #[serde(default)]
    pub compiler: Option<String>,

    /// MPI provider spec, e.g. `openmpi@4.1.5`
    #[serde(default)]
    pub mpi: Option<String>,

    /// A `packages.yaml` replacing the common one
    #[serde(default)]
    pub base_packages: Option<PathBuf>,

    /// Install tree root; module files go to `<prefix>/modulefiles`
    #[serde(default)]
    pub install_prefix: Option<String>,

    /// Install trees of upstream environments
    #[serde(default)]
    pub upstreams: Vec<String>,

    /// Module system. Defaults to the one the site enables.
    #[serde(default)]
    pub modulesys: Option<ModuleSystem>,

    /// Packages to copy into the environment's overlay repository
    #[serde(default)]
    pub modifypkg: Vec<String>,
}

impl StackEnvConfig {
    /// Load settings from a YAML input file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Fill every unset field from `defaults`
    pub fn or(self, defaults: StackEnvConfig) -> Self {
        fn non_empty(v: Vec<String>, d: Vec<String>) -> Vec<String> {
            if v.is_empty() {
                d
            } else {
                v
            }
        }
        Self {
            name: self.name.or(defaults.name),
            dir: self.dir.or(defaults.dir),
            template: self.template.or(defaults.template),
            site: self.site.or(defaults.site),
            compiler: self.compiler.or(defaults.compiler),
            mpi: self.mpi.or(defaults.mpi),
            base_packages: self.base_packages.or(defaults.base_packages),
            install_prefix: self.install_prefix.or(defaults.install_prefix),
            upstreams: non_empty(self.upstreams, defaults.upstreams),
            modulesys: self.modulesys.or(defaults.modulesys),
            modifypkg: non_empty(self.modifypkg, defaults.modifypkg),
        }
    }
}

/// An environment ready to be written
#[derive(Debug, Clone)]
pub struct StackEnv {
    config: StackEnvConfig,
    paths: StackPaths,
    name: String,
    dir: PathBuf,
    site: Option<String>,
    manifest: Manifest,
}

impl StackEnv {
    /// Resolve the template, name and target directory of an environment
    pub fn new(config: StackEnvConfig, paths: StackPaths) -> Result<Self> {
        let source = ManifestSource::resolve(config.template.as_deref(), &paths.templates())?;
        let manifest = source.load()?;

        let site = config
            .site
            .clone()
            .filter(|site| !site.is_empty() && site != NO_SITE);
        let name = match &config.name {
            Some(name) => name.clone(),
            None => default_name(&source, site.as_deref()),
        };
        let dir = config.dir.clone().unwrap_or_else(|| paths.envs());

        Ok(Self {
            config,
            paths,
            name,
            dir,
            site,
            manifest,
        })
    }

    /// The environment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<dir>/<name>`
    pub fn env_dir(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// The base manifest, before composition
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Module system used for the common configuration
    fn module_system(&self) -> Result<ModuleSystem> {
        if let Some(requested) = self.config.modulesys {
            return Ok(requested);
        }
        match &self.site {
            Some(site) => read_site_module_system(&self.paths.site_dir(site)),
            None => Err(Error::SiteNotSet {
                hint: Some(
                    "Pass '--site <SITE>' or choose a module system with '--modulesys {tcl,lmod}'"
                        .to_string(),
                ),
            }),
        }
    }

    /// Write the environment to [`StackEnv::env_dir`]
    ///
    /// Fails with [`Error::EnvironmentExists`] before anything is created
    /// if the directory is already present. Returns the path of the written
    /// `spack.yaml`.
    pub fn write(&self, revisions: &dyn RevisionSource) -> Result<PathBuf> {
        let env_dir = self.env_dir();
        if env_dir.exists() {
            return Err(Error::EnvironmentExists { path: env_dir });
        }

        let module_system = self.module_system()?;
        let upstreams = self
            .config
            .upstreams
            .iter()
            .map(|path| Upstream::from_path(path))
            .collect::<Result<Vec<_>>>()?;

        fs::create_dir_all(&env_dir)?;
        let context = EnvironmentContext::acquire(&env_dir)?;

        let mut includes = Vec::new();
        if let Some(site) = &self.site {
            self.stage_site(site, &env_dir)?;
            includes.push(SITE_INCLUDE.to_string());
        }
        self.stage_common(&env_dir, module_system)?;
        includes.push(COMMON_INCLUDE.to_string());
        if let Some(base_packages) = &self.config.base_packages {
            replace_file(
                base_packages,
                &env_dir.join(COMMON_INCLUDE).join(PACKAGES_YAML),
            )?;
        }

        let mut manifest = self.manifest.clone();
        manifest.set_includes(&includes);

        let original = manifest.snapshot_sections();
        self.apply_settings(&mut manifest, &env_dir, &upstreams)?;
        manifest.restore_sections(&original);

        let header = provenance_header(revisions, &self.paths.root, &self.paths.spack_root);
        context.write_manifest(&manifest, Some(&header))?;

        let manifest_path = context.manifest_path();
        info!(
            "Successfully wrote environment at {}",
            manifest_path.display()
        );
        Ok(manifest_path)
    }

    fn stage_site(&self, site: &str, env_dir: &Path) -> Result<()> {
        let staged = env_dir.join(SITE_INCLUDE);
        copy_tree(&self.paths.site_dir(site), &staged, &[])?;
        if let Some(requested) = self.config.modulesys {
            override_site_module_system(&staged.join(MODULES_YAML), requested)?;
        }
        Ok(())
    }

    fn stage_common(&self, env_dir: &Path, module_system: ModuleSystem) -> Result<()> {
        let common = self.paths.common();
        let staged = env_dir.join(COMMON_INCLUDE);
        copy_tree(&common, &staged, &["modules_*.yaml"])?;
        fs::copy(
            common.join(module_system.common_file_name()),
            staged.join(MODULES_YAML),
        )?;
        debug!("Staged common configuration for {} modules", module_system);
        Ok(())
    }

    fn apply_settings(
        &self,
        manifest: &mut Manifest,
        env_dir: &Path,
        upstreams: &[Upstream],
    ) -> Result<()> {
        if let Some(compiler) = &self.config.compiler {
            manifest.add(&format!("packages:all::compiler:[{}]", compiler))?;
        }
        if let Some(mpi) = &self.config.mpi {
            manifest.add(&format!("packages:all::providers:mpi:[{}]", mpi))?;
        }
        if let Some(prefix) = &self.config.install_prefix {
            manifest.add(&format!(
                "config:install_tree:root:{}",
                quote_component(prefix)
            ))?;
            let module_root = Path::new(prefix).join("modulefiles");
            for system in [ModuleSystem::Lmod, ModuleSystem::Tcl] {
                manifest.add(&format!(
                    "modules:default:roots:{}:{}",
                    system,
                    quote_component(&module_root.to_string_lossy())
                ))?;
            }
        }
        for upstream in upstreams {
            info!(
                "Adding upstream path '{}'",
                upstream.install_tree.display()
            );
            manifest.add(&upstream.config_path())?;
        }
        if !self.config.modifypkg.is_empty() {
            let search_paths = repo_search_paths(&self.paths.spack_root)?;
            build_overlay_repo(env_dir, &self.config.modifypkg, &search_paths)?;
            info!("Adding custom repo 'envrepo' to env config");
            manifest.add(OVERLAY_REPOS_CONFIG)?;
        }
        Ok(())
    }
}

/// `<template>.<site>`, with `empty` and `none` standing in for unset values
fn default_name(source: &ManifestSource, site: Option<&str>) -> String {
    let template = match source {
        ManifestSource::Empty => "empty".to_string(),
        ManifestSource::Named { name, .. } => name.clone(),
        ManifestSource::Path(path) => template_label(path),
    };
    format!("{}.{}", template, site.unwrap_or(NO_SITE))
}

/// Label for a template given by path: its directory for `spack.yaml`,
/// otherwise the file stem
fn template_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem == "spack" {
        if let Some(parent) = path.parent().and_then(Path::file_name) {
            return parent.to_string_lossy().into_owned();
        }
    }
    stem
}
