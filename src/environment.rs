//! Scoped access to an environment directory
//!
//! Spack keeps per-environment state in `<env>/.spack-env/`, including a
//! transaction lock taken while the manifest is being modified. An
//! [`EnvironmentContext`] holds that lock for as long as it is alive and
//! releases it when dropped, whether composition succeeded or not.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::manifest::Manifest;

/// Directory holding per-environment state
pub const ENV_STATE_DIR: &str = ".spack-env";

/// Transaction lock file inside [`ENV_STATE_DIR`]
pub const TRANSACTION_LOCK: &str = "transaction_lock";

/// Manifest file name of an environment
pub const MANIFEST_FILE: &str = "spack.yaml";

/// Exclusive handle on an environment directory
#[derive(Debug)]
pub struct EnvironmentContext {
    dir: PathBuf,
    lock_path: PathBuf,
}

impl EnvironmentContext {
    /// Take the transaction lock of the environment in `dir`
    ///
    /// Fails with [`Error::Lock`] if another context already holds it.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let state_dir = dir.join(ENV_STATE_DIR);
        fs::create_dir_all(&state_dir)?;
        let lock_path = state_dir.join(TRANSACTION_LOCK);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Lock {
                    path: lock_path,
                    message: "environment is locked by another operation".to_string(),
                });
            }
            Err(err) => {
                return Err(Error::Lock {
                    path: lock_path,
                    message: err.to_string(),
                });
            }
        };
        writeln!(file, "pid={}", std::process::id())?;
        debug!("Acquired {}", lock_path.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            lock_path,
        })
    }

    /// The environment directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the environment's manifest file
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Write `manifest` as the environment's `spack.yaml`
    pub fn write_manifest(&self, manifest: &Manifest, header: Option<&str>) -> Result<()> {
        manifest.write(&self.manifest_path(), header)
    }
}

impl Drop for EnvironmentContext {
    fn drop(&mut self) {
        match fs::remove_file(&self.lock_path) {
            Ok(()) => debug!("Released {}", self.lock_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "Could not release environment lock {}: {}",
                self.lock_path.display(),
                err
            ),
        }
    }
}
