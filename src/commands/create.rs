//! Create command implementation
//!
//! `create env` composes a Spack environment from a template, a site and the
//! common configuration. `create ctr` writes a container recipe.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use log::info;

use spack_stack::container::StackContainer;
use spack_stack::git::GitRevisions;
use spack_stack::modules::ModuleSystem;
use spack_stack::paths::StackPaths;
use spack_stack::stack_env::{StackEnv, StackEnvConfig};

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(subcommand)]
    pub target: CreateTarget,
}

#[derive(Subcommand, Debug)]
pub enum CreateTarget {
    /// Create a Spack environment
    Env(EnvArgs),

    /// Create a container recipe
    Ctr(CtrArgs),
}

/// Arguments for `create env`
#[derive(Args, Debug, Default)]
pub struct EnvArgs {
    /// Environment name (defaults to <template>.<site>)
    #[arg(long)]
    pub name: Option<String>,

    /// Parent directory of the environment (defaults to <stack-dir>/envs)
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Template name in configs/templates, or absolute path to a spack.yaml
    #[arg(long)]
    pub template: Option<String>,

    /// Site name in configs/sites, or 'none'
    #[arg(long)]
    pub site: Option<String>,

    /// Compiler preferred for all packages
    #[arg(long)]
    pub compiler: Option<String>,

    /// MPI provider
    #[arg(long)]
    pub mpi: Option<String>,

    /// packages.yaml replacing the common one
    #[arg(long, value_name = "FILE")]
    pub packages: Option<PathBuf>,

    /// Install prefix for packages and module files
    #[arg(long, value_name = "PATH")]
    pub prefix: Option<String>,

    /// Install tree of an upstream environment (repeatable)
    #[arg(long, value_name = "PATH")]
    pub upstream: Vec<String>,

    /// Module system, overriding the site's setting
    #[arg(long, value_enum)]
    pub modulesys: Option<ModuleSystem>,

    /// Package to copy into the environment's own recipe repository (repeatable)
    #[arg(long = "modify-pkg", value_name = "PACKAGE")]
    pub modify_pkg: Vec<String>,

    /// YAML file providing defaults for any of these options
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Remove an existing environment of the same name first
    #[arg(long)]
    pub overwrite: bool,
}

impl EnvArgs {
    /// Settings given on the command line, completed from `--config`
    pub fn to_config(&self) -> Result<StackEnvConfig> {
        let explicit = StackEnvConfig {
            name: self.name.clone(),
            dir: self.dir.clone(),
            template: self.template.clone(),
            site: self.site.clone(),
            compiler: self.compiler.clone(),
            mpi: self.mpi.clone(),
            base_packages: self.packages.clone(),
            install_prefix: self.prefix.clone(),
            upstreams: self.upstream.clone(),
            modulesys: self.modulesys,
            modifypkg: self.modify_pkg.clone(),
        };
        match &self.config {
            Some(path) => {
                let defaults = StackEnvConfig::from_file(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(explicit.or(defaults))
            }
            None => Ok(explicit),
        }
    }
}

/// Arguments for `create ctr`
#[derive(Args, Debug)]
pub struct CtrArgs {
    /// Container template in configs/containers (without .yaml), or absolute path
    pub container: String,

    /// Spec list in configs/containers/specs (without .yaml), or absolute path
    #[arg(long)]
    pub specs: String,

    /// Output directory (defaults to <stack-dir>/envs)
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Remove an existing recipe directory first
    #[arg(long)]
    pub overwrite: bool,
}

fn stack_paths(stack_dir: Option<PathBuf>) -> Result<StackPaths> {
    match stack_dir {
        Some(dir) => Ok(StackPaths::new(dir)),
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            Ok(StackPaths::discover(&cwd)?)
        }
    }
}

fn remove_existing(dir: &Path) -> Result<()> {
    if dir.exists() {
        info!("Removing existing {}", dir.display());
        fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
    }
    Ok(())
}

/// Execute the create command
pub fn execute(args: CreateArgs, stack_dir: Option<PathBuf>) -> Result<()> {
    let paths = stack_paths(stack_dir)?;
    match args.target {
        CreateTarget::Env(args) => create_env(&args, paths),
        CreateTarget::Ctr(args) => create_ctr(&args, paths),
    }
}

fn create_env(args: &EnvArgs, paths: StackPaths) -> Result<()> {
    let env = StackEnv::new(args.to_config()?, paths)?;
    if args.overwrite {
        remove_existing(&env.env_dir())?;
    }
    env.write(&GitRevisions)?;
    #[cfg(unix)]
    spack_stack::umask::check_umask();
    Ok(())
}

fn create_ctr(args: &CtrArgs, paths: StackPaths) -> Result<()> {
    let dir = args.dir.clone().unwrap_or_else(|| paths.envs());
    let container = StackContainer::new(&args.container, &dir, &args.specs, &paths)?;
    if args.overwrite {
        remove_existing(&container.env_dir())?;
    }
    container.write()?;
    Ok(())
}
