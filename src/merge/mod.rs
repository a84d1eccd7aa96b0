//! Config paths and precedence merging
//!
//! This module provides the pieces needed to edit a Spack-style configuration
//! tree the way `spack config add` does: colon-separated config paths and a
//! precedence-aware deep merge.
//!
//! ## Override keys
//!
//! Spack marks a key whose value should replace (rather than merge with)
//! lower-precedence values by writing it with a double colon, e.g.
//! `enable:: [lmod]`. A YAML reader sees that key as the plain string
//! `enable:`. This crate keeps that representation in memory: an override key
//! is the bare key followed by a single `:`. Lookups go through [`bare_key`]
//! so `enable` and `enable:` address the same entry.
//!
//! ## Submodules
//!
//! - `yaml` - deep merge, navigation and override-marker helpers for
//!   `serde_yaml::Value` trees.

pub mod yaml;

use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

/// One key in a colon-separated config path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigKey {
    /// The key name without quotes or override marker
    pub name: String,
    /// Whether the key was written with `::`
    pub overrides: bool,
}

impl ConfigKey {
    /// A plain key that merges with lower-precedence values
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overrides: false,
        }
    }

    /// A key whose value replaces lower-precedence values
    pub fn overriding(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overrides: true,
        }
    }

    /// The YAML mapping key this config key is stored under
    pub fn to_yaml_key(&self) -> YamlValue {
        if self.overrides {
            YamlValue::String(format!("{}:", self.name))
        } else {
            YamlValue::String(self.name.clone())
        }
    }
}

/// Strip the override marker from a key name
pub fn bare_key(key: &str) -> &str {
    key.strip_suffix(':').unwrap_or(key)
}

/// Whether a mapping key carries the override marker
pub fn is_override_key(key: &YamlValue) -> bool {
    key.as_str().is_some_and(|k| k.len() > 1 && k.ends_with(':'))
}

/// Parse a colon-separated config path into keys and a value
///
/// The last component is the value and is parsed as YAML, so
/// `packages:all:providers:mpi:[openmpi]` sets a one-element list. A value
/// that is not valid YAML on its own (for example one starting with `%`) is
/// kept as a plain string.
///
/// Supports:
/// - Plain keys: `config:install_tree:root:/opt/install`
/// - Override keys: `packages:all::compiler:[gcc]` (`all` replaces lower
///   precedence values)
/// - Quoted components: `upstreams:base:install_tree:'/opt/a:b/install'`,
///   with `''` standing for a literal `'` inside single quotes
///
/// # Examples
///
/// ```
/// use spack_stack::merge::{parse_config_path, ConfigKey};
///
/// let (keys, value) = parse_config_path("packages:all::compiler:[gcc]").unwrap();
/// assert_eq!(keys[1], ConfigKey::overriding("all"));
/// assert!(value.is_sequence());
/// ```
pub fn parse_config_path(path: &str) -> Result<(Vec<ConfigKey>, YamlValue)> {
    let mut components: Vec<(String, bool)> = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ':' => {
                    let overrides = chars.peek() == Some(&':');
                    if overrides {
                        chars.next();
                    }
                    components.push((std::mem::take(&mut current), overrides));
                }
                _ => current.push(ch),
            },
        }
    }

    if quote.is_some() {
        return Err(Error::ConfigPath {
            path: path.to_string(),
            message: "unterminated quote".to_string(),
        });
    }

    let raw_value = current.trim();
    if components.is_empty() || raw_value.is_empty() {
        return Err(Error::ConfigPath {
            path: path.to_string(),
            message: "expected at least a section and a value".to_string(),
        });
    }

    let mut keys = Vec::with_capacity(components.len());
    for (raw, overrides) in components {
        let name = unquote(raw.trim());
        if name.is_empty() {
            return Err(Error::ConfigPath {
                path: path.to_string(),
                message: "empty key".to_string(),
            });
        }
        keys.push(ConfigKey { name, overrides });
    }

    let value = serde_yaml::from_str::<YamlValue>(raw_value)
        .unwrap_or_else(|_| YamlValue::String(unquote(raw_value)));

    Ok((keys, value))
}

/// Quote a config path component so `:` and `'` inside it are kept literally
///
/// ```
/// use spack_stack::merge::{parse_config_path, quote_component};
///
/// let path = format!("config:install_tree:root:{}", quote_component("/opt/o'neil:a"));
/// let (_, value) = parse_config_path(&path).unwrap();
/// assert_eq!(value.as_str(), Some("/opt/o'neil:a"));
/// ```
pub fn quote_component(component: &str) -> String {
    format!("'{}'", component.replace('\'', "''"))
}

fn unquote(component: &str) -> String {
    if component.len() >= 2 && component.starts_with('\'') && component.ends_with('\'') {
        return component[1..component.len() - 1].replace("''", "'");
    }
    if component.len() >= 2 && component.starts_with('"') && component.ends_with('"') {
        return component[1..component.len() - 1].to_string();
    }
    component.to_string()
}
