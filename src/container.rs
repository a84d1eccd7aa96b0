//! Container environments
//!
//! A container environment combines a container recipe template
//! (`configs/containers/<name>.yaml`), an application's spec list
//! (`configs/containers/specs/<specs>.yaml`) and the common `packages.yaml`
//! into a single `spack.yaml` suitable for `spack containerize`.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};
use crate::manifest::{dump_config, load_config};
use crate::merge::yaml::{get_key, merge_yaml, navigate_yaml_value, strip_override_markers};
use crate::merge::ConfigKey;
use crate::paths::StackPaths;

/// A container recipe to be written
#[derive(Debug, Clone)]
pub struct StackContainer {
    name: String,
    specs: String,
    container_path: PathBuf,
    specs_path: PathBuf,
    base_packages: PathBuf,
    dir: PathBuf,
}

fn locate(name: &str, dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(format!("{}.yaml", name));
    if candidate.exists() {
        Some(candidate)
    } else if Path::new(name).is_absolute() {
        Some(PathBuf::from(name))
    } else {
        None
    }
}

fn read_flattened(path: &Path) -> Result<YamlValue> {
    let mut value = load_config(&fs::read_to_string(path)?)?;
    strip_override_markers(&mut value);
    Ok(value)
}

fn spack_root_mut<'a>(document: &'a mut YamlValue, path: &Path) -> Result<&'a mut Mapping> {
    document
        .get_mut("spack")
        .and_then(YamlValue::as_mapping_mut)
        .ok_or_else(|| Error::Manifest {
            message: format!("'{}' has no 'spack' mapping", path.display()),
        })
}

impl StackContainer {
    /// Locate the container template and spec list
    ///
    /// Either may be a name under the containers directory or an absolute
    /// path.
    pub fn new(container: &str, dir: &Path, specs: &str, paths: &StackPaths) -> Result<Self> {
        let container_path =
            locate(container, &paths.containers()).ok_or_else(|| Error::ContainerNotFound {
                container: container.to_string(),
            })?;
        let specs_path =
            locate(specs, &paths.container_specs()).ok_or_else(|| Error::SpecsNotFound {
                specs: specs.to_string(),
            })?;

        Ok(Self {
            name: container.to_string(),
            specs: specs.to_string(),
            container_path,
            specs_path,
            base_packages: paths.common().join("packages.yaml"),
            dir: dir.to_path_buf(),
        })
    }

    /// `<dir>/<container>`
    pub fn env_dir(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Merge the inputs and write `<dir>/<container>/spack.yaml`
    pub fn write(&self) -> Result<PathBuf> {
        let mut document = read_flattened(&self.container_path)?;
        let specs = read_flattened(&self.specs_path)?;
        let packages = read_flattened(&self.base_packages)?;

        let spack = spack_root_mut(&mut document, &self.container_path)?;

        if let Some(common) = packages.as_mapping().and_then(|m| get_key(m, "packages")) {
            let entry = spack
                .entry(YamlValue::String("packages".to_string()))
                .or_insert_with(|| YamlValue::Mapping(Mapping::new()));
            merge_yaml(entry, common);
        }

        let entry = spack
            .entry(YamlValue::String("specs".to_string()))
            .or_insert_with(|| YamlValue::Sequence(Vec::new()));
        if let Some(app_specs) = specs.as_mapping().and_then(|m| get_key(m, "specs")) {
            merge_yaml(entry, app_specs);
        }

        let keys = ["spack", "container", "labels", "app"].map(ConfigKey::new);
        *navigate_yaml_value(&mut document, &keys)? = YamlValue::String(self.specs.clone());

        let env_dir = self.env_dir();
        fs::create_dir_all(&env_dir)?;
        let manifest_path = env_dir.join("spack.yaml");
        fs::write(&manifest_path, dump_config(&document)?)?;
        info!(
            "Successfully wrote container recipe at {}",
            manifest_path.display()
        );
        Ok(manifest_path)
    }
}
