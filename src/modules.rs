//! Module system selection
//!
//! Spack can generate environment-module files for two tools, Lmod and Tcl
//! environment modules. A site declares which one it uses in its
//! `modules.yaml`:
//!
//! ```yaml
//! modules:
//!   default:
//!     enable::
//!     - lmod
//!     lmod:
//!       ...
//! ```
//!
//! The common configuration ships one `modules_<tool>.yaml` per tool, and
//! exactly one of them ends up as the environment's `modules.yaml`.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};
use crate::manifest::{dump_config, load_config};
use crate::merge::yaml::{get_key, get_key_mut, remove_key};

/// Name of the module configuration file in a config directory
pub const MODULES_YAML: &str = "modules.yaml";

/// A module file generator supported by Spack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSystem {
    /// Lmod hierarchical modules
    Lmod,
    /// Tcl environment modules
    Tcl,
}

impl ModuleSystem {
    /// The identifier Spack uses for this module system
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleSystem::Lmod => "lmod",
            ModuleSystem::Tcl => "tcl",
        }
    }

    /// File name of this system's variant in the common config directory
    pub fn common_file_name(&self) -> String {
        format!("modules_{}.yaml", self.as_str())
    }
}

impl fmt::Display for ModuleSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleSystem {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lmod" => Ok(ModuleSystem::Lmod),
            "tcl" => Ok(ModuleSystem::Tcl),
            _ => Err(format!("Unknown module system '{}'. Use: lmod or tcl", s)),
        }
    }
}

fn enable_list_mut(document: &mut YamlValue) -> Option<&mut Vec<YamlValue>> {
    let modules = get_key_mut(document.as_mapping_mut()?, "modules")?;
    let default = get_key_mut(modules.as_mapping_mut()?, "default")?;
    get_key_mut(default.as_mapping_mut()?, "enable")?.as_sequence_mut()
}

fn default_block_mut(document: &mut YamlValue) -> Option<&mut Mapping> {
    let modules = get_key_mut(document.as_mapping_mut()?, "modules")?;
    get_key_mut(modules.as_mapping_mut()?, "default")?.as_mapping_mut()
}

/// Determine the module system enabled by a `modules.yaml` document
///
/// `modules:default:enable` must name exactly one distinct value, and that
/// value must be `lmod` or `tcl`.
pub fn module_system_of(document: &YamlValue, path: &Path) -> Result<ModuleSystem> {
    let invalid = |message: String| Error::InvalidModuleConfig {
        path: path.to_path_buf(),
        message,
    };

    let enable = document
        .as_mapping()
        .and_then(|root| get_key(root, "modules"))
        .and_then(YamlValue::as_mapping)
        .and_then(|modules| get_key(modules, "default"))
        .and_then(YamlValue::as_mapping)
        .and_then(|default| get_key(default, "enable"))
        .and_then(YamlValue::as_sequence)
        .ok_or_else(|| invalid("missing 'modules:default:enable' list".to_string()))?;

    let mut enabled: Vec<&str> = Vec::new();
    for entry in enable {
        let name = entry
            .as_str()
            .ok_or_else(|| invalid("non-string entry in 'modules:default:enable'".to_string()))?;
        if !enabled.contains(&name) {
            enabled.push(name);
        }
    }

    match enabled.as_slice() {
        [single] => single.parse().map_err(invalid),
        _ => Err(invalid(
            "Set one and only one value ('lmod' or 'tcl') under 'modules:default:enable' \
             in site modules.yaml, or use '--modulesys {tcl,lmod}'"
                .to_string(),
        )),
    }
}

/// Read the module system a site configuration directory enables
pub fn read_site_module_system(site_dir: &Path) -> Result<ModuleSystem> {
    let path = site_dir.join(MODULES_YAML);
    let document = load_config(&fs::read_to_string(&path)?)?;
    module_system_of(&document, &path)
}

/// Switch a site `modules.yaml` to `requested` if it enables anything else
///
/// The `enable` list becomes `[requested]`, keeping its key form, and the
/// per-system block of the first listed system (`modules:default:<old>`) is
/// moved to `modules:default:<requested>` unless that block already exists.
/// A site listing both systems is
/// accepted here since the request settles the choice. Returns `true` if the
/// file was rewritten.
pub fn override_site_module_system(modules_yaml: &Path, requested: ModuleSystem) -> Result<bool> {
    let mut document = load_config(&fs::read_to_string(modules_yaml)?)?;
    let Some(enable) = enable_list_mut(&mut document) else {
        return Err(Error::InvalidModuleConfig {
            path: modules_yaml.to_path_buf(),
            message: "missing 'modules:default:enable' list".to_string(),
        });
    };

    let listed: Vec<String> = enable
        .iter()
        .filter_map(|entry| entry.as_str().map(str::to_string))
        .collect();
    let only_requested = listed.len() == enable.len()
        && !listed.is_empty()
        && listed.iter().all(|name| name == requested.as_str());
    if only_requested {
        return Ok(false);
    }

    warn!(
        "Site enables '{}' modules but '{}' was requested",
        listed.join(", "),
        requested
    );
    info!("Updating site modules.yaml to reflect env module system override setting");

    *enable = vec![YamlValue::String(requested.as_str().to_string())];

    let previous = listed
        .first()
        .and_then(|name| name.parse::<ModuleSystem>().ok())
        .filter(|system| *system != requested);
    if let (Some(previous), Some(default)) = (previous, default_block_mut(&mut document)) {
        if get_key(default, requested.as_str()).is_none() {
            if let Some(block) = remove_key(default, previous.as_str()) {
                default.insert(YamlValue::String(requested.as_str().to_string()), block);
            }
        }
    }

    fs::write(modules_yaml, dump_config(&document)?)?;
    Ok(true)
}
