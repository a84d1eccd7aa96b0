//! Shared test utilities for integration and E2E tests.
//!
//! [`StackFixture`] lays out a miniature spack-stack checkout in a temporary
//! directory: the `.spackstack` marker, common and site configuration,
//! templates, container inputs and a builtin recipe repository.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = StackFixture::new().with_site("hera", configs::SITE_MODULES_LMOD);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

use spack_stack::paths::StackPaths;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::FixedRevisions;
    pub use super::StackFixture;
}

/// Configuration file contents used by the fixture.
#[allow(dead_code)]
pub mod configs {
    /// Common `packages.yaml`
    pub const COMMON_PACKAGES: &str = r#"packages:
  all::
    compiler: [gcc, intel]
    providers:
      mpi: [openmpi]
  zlib:
    version: ['1.2.13']
"#;

    /// Common `modules_lmod.yaml`
    pub const COMMON_MODULES_LMOD: &str = r#"modules:
  default:
    enable::
    - lmod
    lmod:
      hierarchy: [mpi]
"#;

    /// Common `modules_tcl.yaml`
    pub const COMMON_MODULES_TCL: &str = r#"modules:
  default:
    enable::
    - tcl
    tcl:
      naming_scheme: '{name}/{version}'
"#;

    /// Common `config.yaml`
    pub const COMMON_CONFIG: &str = r#"config:
  build_jobs: 4
"#;

    /// Site `modules.yaml` enabling Lmod
    pub const SITE_MODULES_LMOD: &str = r#"modules:
  default:
    enable::
    - lmod
    lmod:
      core_compilers:
      - gcc@11.2.0
"#;

    /// Site `modules.yaml` enabling Tcl
    pub const SITE_MODULES_TCL: &str = r#"modules:
  default:
    enable::
    - tcl
    tcl:
      hash_length: 0
"#;

    /// Site `modules.yaml` enabling both systems
    pub const SITE_MODULES_BOTH: &str = r#"modules:
  default:
    enable::
    - tcl
    - lmod
"#;

    /// Site `compilers.yaml`
    pub const SITE_COMPILERS: &str = r#"compilers:
- compiler:
    spec: gcc@11.2.0
    paths:
      cc: /usr/bin/gcc
"#;

    /// A template that pins its own compiler and concretizer settings
    pub const TEMPLATE_UNIFIED: &str = r#"spack:
  concretizer:
    unify: when_possible
  packages:
    all:
      compiler: [gcc@12.2.0]
  view: false
  specs:
  - jedi-bundle
"#;

    /// Container recipe template
    pub const CONTAINER_DOCKER: &str = r#"spack:
  container:
    format: docker
    labels:
      maintainer: jcsda
  packages:
    all::
      target: [x86_64]
  specs: []
"#;

    /// Container spec list
    pub const CONTAINER_SPECS: &str = r#"specs:
- jedi-ci
- ecbuild
"#;
}

/// Revision lookup returning fixed hashes, keyed by path.
#[allow(dead_code)]
pub struct FixedRevisions {
    pub stack: PathBuf,
}

impl spack_stack::git::RevisionSource for FixedRevisions {
    fn short_revision(&self, path: &Path) -> spack_stack::error::Result<String> {
        if path == self.stack {
            Ok("abc1234".to_string())
        } else {
            Ok("def5678".to_string())
        }
    }
}

/// A temporary spack-stack checkout.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = StackFixture::new()
///     .with_site("hera", configs::SITE_MODULES_LMOD)
///     .with_package("ncview", "class Ncview(AutotoolsPackage): pass");
///
/// let mut cmd = fixture.command();
/// cmd.args(["create", "env", "--site", "hera"]).assert().success();
/// ```
pub struct StackFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl StackFixture {
    /// Create a checkout with the common configuration, one template and one
    /// container recipe.
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        fixture
            .with_file(".spackstack", "")
            .with_file("configs/common/packages.yaml", configs::COMMON_PACKAGES)
            .with_file("configs/common/modules_lmod.yaml", configs::COMMON_MODULES_LMOD)
            .with_file("configs/common/modules_tcl.yaml", configs::COMMON_MODULES_TCL)
            .with_file("configs/common/config.yaml", configs::COMMON_CONFIG)
            .with_file(
                "configs/templates/unified-dev/spack.yaml",
                configs::TEMPLATE_UNIFIED,
            )
            .with_file(
                "configs/containers/docker-ubuntu-gcc-openmpi.yaml",
                configs::CONTAINER_DOCKER,
            )
            .with_file("configs/containers/specs/jedi-ci.yaml", configs::CONTAINER_SPECS)
    }

    /// Add a site configuration directory with the given `modules.yaml`.
    pub fn with_site(self, name: &str, modules_yaml: &str) -> Self {
        self.with_file(&format!("configs/sites/{}/modules.yaml", name), modules_yaml)
            .with_file(
                &format!("configs/sites/{}/compilers.yaml", name),
                configs::SITE_COMPILERS,
            )
    }

    /// Add a recipe to Spack's builtin repository, with a stale `__pycache__`.
    pub fn with_package(self, name: &str, recipe: &str) -> Self {
        let dir = format!("spack/var/spack/repos/builtin/packages/{}", name);
        self.with_file(&format!("{}/package.py", dir), recipe)
            .with_file(&format!("{}/__pycache__/package.cpython-311.pyc", dir), "\0")
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the checkout.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolved layout of the checkout.
    pub fn paths(&self) -> StackPaths {
        StackPaths::new(self.path())
    }

    /// Revision source answering for this checkout.
    pub fn revisions(&self) -> FixedRevisions {
        FixedRevisions {
            stack: self.path().to_path_buf(),
        }
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run inside this checkout.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("spack-stack");
        cmd.current_dir(self.path());
        cmd.env_remove("SPACK_STACK_DIR");
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

impl Default for StackFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_discoverable() {
        let fixture = StackFixture::new();
        let paths = StackPaths::discover(&fixture.path().join("configs/common")).unwrap();
        assert_eq!(paths.root, fixture.path());
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        let configs = [
            configs::COMMON_PACKAGES,
            configs::COMMON_MODULES_LMOD,
            configs::COMMON_MODULES_TCL,
            configs::COMMON_CONFIG,
            configs::SITE_MODULES_LMOD,
            configs::SITE_MODULES_TCL,
            configs::SITE_MODULES_BOTH,
            configs::SITE_COMPILERS,
            configs::TEMPLATE_UNIFIED,
            configs::CONTAINER_DOCKER,
            configs::CONTAINER_SPECS,
        ];

        for config in configs {
            serde_yaml::from_str::<serde_yaml::Value>(config).expect("Config should be valid YAML");
        }
    }
}
