//! # Environment Manifest
//!
//! This module defines [`Manifest`], the in-memory form of a Spack
//! environment file (`spack.yaml`). The manifest is a YAML document with a
//! single `spack:` root whose entries are configuration sections (`packages`,
//! `modules`, `config`, ...) plus environment-specific keys such as
//! `include`, `specs` and `view`.
//!
//! ## Editing
//!
//! - [`Manifest::add`] applies a colon-separated config path with top
//!   precedence, the same way `spack config add` edits an environment scope.
//! - [`Manifest::snapshot_sections`] and [`Manifest::restore_sections`] let a
//!   caller make programmatic edits and then put the manifest's original
//!   settings back on top of them.
//!
//! ## Serialization
//!
//! Override keys are stored as `key:` in memory. `serde_yaml` would quote
//! them (`'all:':`), so [`dump_config`] rewrites them to Spack's `all::`
//! form before the text is written anywhere.
//!
//! Comment lines leading the parsed text are kept as the manifest's preamble
//! and written back after any provenance header.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};
use crate::merge::parse_config_path;
use crate::merge::yaml::{
    get_key, get_key_mut, is_truthy, merge_yaml, navigate_yaml_value, remove_key,
};

/// Manifest used when no template is given
pub const DEFAULT_MANIFEST_YAML: &str = "\
# This is a Spack Environment file.
#
# It describes a set of packages to be installed, along with
# configuration settings.
# Includes are in order of highest precedence first.
# Site configs take precedence over the base packages.yaml.
spack:

  view: false

";

/// Configuration sections a manifest may carry
pub const CONFIG_SECTIONS: &[&str] = &[
    "bootstrap",
    "cdash",
    "ci",
    "compilers",
    "concretizer",
    "config",
    "definitions",
    "develop",
    "env_vars",
    "mirrors",
    "modules",
    "packages",
    "repos",
    "upstreams",
];

/// Where the base manifest comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// [`DEFAULT_MANIFEST_YAML`]
    Empty,
    /// A named template: `<templates>/<name>/spack.yaml`
    Named { name: String, dir: PathBuf },
    /// A manifest file given by absolute path
    Path(PathBuf),
}

impl ManifestSource {
    /// Resolve a template argument against the templates directory
    ///
    /// `None` selects the empty default. An absolute path is used as the
    /// manifest file itself. Anything else must name a directory in
    /// `templates_dir`.
    pub fn resolve(template: Option<&str>, templates_dir: &Path) -> Result<Self> {
        let Some(template) = template else {
            return Ok(Self::Empty);
        };
        let as_path = Path::new(template);
        if as_path.is_absolute() {
            return Ok(Self::Path(as_path.to_path_buf()));
        }
        let dir = templates_dir.join(template);
        if dir.exists() {
            Ok(Self::Named {
                name: template.to_string(),
                dir,
            })
        } else {
            Err(Error::TemplateNotFound {
                template: template.to_string(),
            })
        }
    }

    /// Load the manifest this source points at
    pub fn load(&self) -> Result<Manifest> {
        let file = match self {
            Self::Empty => return Manifest::parse(DEFAULT_MANIFEST_YAML),
            Self::Named { dir, .. } => dir.join("spack.yaml"),
            Self::Path(path) => path.clone(),
        };
        if !file.is_file() {
            return Err(Error::TemplateNotFound {
                template: file.display().to_string(),
            });
        }
        Manifest::from_file(&file)
    }
}

/// Configuration sections captured from a manifest
pub type SectionSnapshot = Vec<(String, YamlValue)>;

/// An environment manifest (`spack.yaml`)
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Leading comment lines, without the `#` marker
    preamble: Vec<String>,
    /// Entries under the `spack:` root
    spack: Mapping,
    /// Any other top-level entries, kept verbatim
    rest: Mapping,
}

impl Manifest {
    /// Parse a manifest from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        let document: YamlValue = serde_yaml::from_str(content)?;
        let YamlValue::Mapping(mut rest) = document else {
            return Err(Error::Manifest {
                message: "manifest must be a mapping with a 'spack' root".to_string(),
            });
        };
        let spack = match remove_key(&mut rest, "spack") {
            Some(YamlValue::Mapping(map)) => map,
            Some(YamlValue::Null) => Mapping::new(),
            Some(_) => {
                return Err(Error::Manifest {
                    message: "'spack' root must be a mapping".to_string(),
                })
            }
            None => {
                return Err(Error::Manifest {
                    message: "missing 'spack' root".to_string(),
                })
            }
        };
        Ok(Self {
            preamble: leading_comments(content),
            spack,
            rest,
        })
    }

    /// Read and parse a manifest file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// The entries under `spack:`
    pub fn spack(&self) -> &Mapping {
        &self.spack
    }

    /// The current include list
    pub fn includes(&self) -> Vec<String> {
        get_key(&self.spack, "include")
            .and_then(YamlValue::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace the include list
    pub fn set_includes(&mut self, includes: &[String]) {
        let seq = includes
            .iter()
            .map(|i| YamlValue::String(i.clone()))
            .collect();
        self.set_entry("include", YamlValue::Sequence(seq));
    }

    /// A configuration section, if present
    pub fn section(&self, name: &str) -> Option<&YamlValue> {
        get_key(&self.spack, name)
    }

    /// Set an entry under `spack:`, keeping the key form already in use
    pub fn set_entry(&mut self, name: &str, value: YamlValue) {
        match get_key_mut(&mut self.spack, name) {
            Some(existing) => *existing = value,
            None => {
                self.spack.insert(YamlValue::String(name.to_string()), value);
            }
        }
    }

    /// Capture every non-empty configuration section
    pub fn snapshot_sections(&self) -> SectionSnapshot {
        CONFIG_SECTIONS
            .iter()
            .filter_map(|name| {
                self.section(name)
                    .filter(|value| is_truthy(value))
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }

    /// Apply a colon-separated config path with top precedence
    ///
    /// ```
    /// use spack_stack::manifest::Manifest;
    ///
    /// let mut manifest = Manifest::empty();
    /// manifest.add("packages:all:providers:mpi:[openmpi@4.1.5]").unwrap();
    /// let mpi = &manifest.section("packages").unwrap()["all"]["providers"]["mpi"];
    /// assert_eq!(mpi[0].as_str(), Some("openmpi@4.1.5"));
    /// ```
    pub fn add(&mut self, path: &str) -> Result<()> {
        let (keys, value) = parse_config_path(path)?;
        let section = &keys[0].name;
        if !CONFIG_SECTIONS.contains(&section.as_str()) {
            return Err(Error::ConfigPath {
                path: path.to_string(),
                message: format!("unknown configuration section '{}'", section),
            });
        }

        let mut root = YamlValue::Mapping(std::mem::take(&mut self.spack));
        let result = navigate_yaml_value(&mut root, &keys).map(|slot| {
            let value = match (&*slot, value) {
                (YamlValue::Sequence(_), YamlValue::Sequence(seq)) => YamlValue::Sequence(seq),
                (YamlValue::Sequence(_), scalar) => YamlValue::Sequence(vec![scalar]),
                (_, value) => value,
            };
            merge_yaml(slot, &value);
        });
        if let YamlValue::Mapping(map) = root {
            self.spack = map;
        }
        result
    }

    /// Merge captured sections back on top of the current ones
    pub fn restore_sections(&mut self, snapshot: &SectionSnapshot) {
        for (name, original) in snapshot {
            let mut merged = self.section(name).cloned().unwrap_or(YamlValue::Null);
            merge_yaml(&mut merged, original);
            self.set_entry(name, merged);
        }
    }

    /// Serialize the manifest, optionally preceded by a comment header
    pub fn to_yaml_string(&self, header: Option<&str>) -> Result<String> {
        let mut document = Mapping::new();
        document.insert(
            YamlValue::String("spack".to_string()),
            YamlValue::Mapping(self.spack.clone()),
        );
        for (key, value) in &self.rest {
            document.insert(key.clone(), value.clone());
        }

        let mut out = String::new();
        if let Some(header) = header {
            for line in header.lines() {
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
        }
        for line in &self.preamble {
            out.push('#');
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&dump_config(&YamlValue::Mapping(document))?);
        Ok(out)
    }

    /// Write the manifest to `path`
    pub fn write(&self, path: &Path, header: Option<&str>) -> Result<()> {
        fs::write(path, self.to_yaml_string(header)?)?;
        Ok(())
    }
}

impl Manifest {
    /// The default manifest: `spack:` with `view: false`
    pub fn empty() -> Self {
        let mut spack = Mapping::new();
        spack.insert(YamlValue::String("view".to_string()), YamlValue::Bool(false));
        Self {
            preamble: leading_comments(DEFAULT_MANIFEST_YAML),
            spack,
            rest: Mapping::new(),
        }
    }

    /// The leading comment lines, without the `#` marker
    pub fn preamble(&self) -> &[String] {
        &self.preamble
    }
}

/// Comment lines before the first YAML content line
fn leading_comments(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim_end)
        .skip_while(|line| line.is_empty())
        .take_while(|line| line.starts_with('#'))
        .map(|line| line[1..].to_string())
        .collect()
}

/// Serialize a config tree, rendering override keys as `key::`
pub fn dump_config(value: &YamlValue) -> Result<String> {
    let text = serde_yaml::to_string(value)?;
    let override_key = Regex::new(r#"(?m)^(\s*(?:- )?)(?:'([^'\n]+):'|"([^"\n]+):"):"#)?;
    Ok(override_key
        .replace_all(&text, |caps: &regex::Captures| {
            let key = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            format!("{}{}::", &caps[1], key)
        })
        .into_owned())
}

/// Parse a config fragment from YAML text
pub fn load_config(content: &str) -> Result<YamlValue> {
    Ok(serde_yaml::from_str(content)?)
}
