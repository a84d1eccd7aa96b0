//! YAML merge operations
//!
//! This module merges Spack configuration trees the way Spack itself does
//! when stacking configuration scopes: the source has higher precedence than
//! the destination.
//!
//! ## Rules
//!
//! - Mappings merge recursively. Keys are compared by their bare name, so
//!   `all` and the override form `all:` address the same entry.
//! - An override key in the source replaces the destination entry wholesale
//!   instead of merging into it.
//! - Sequences: source items first, then destination items not already
//!   present in the source.
//! - Anything else: the source value replaces the destination value.
//!
//! ## Example
//!
//! ```
//! use spack_stack::merge::yaml::merge_yaml;
//! use serde_yaml::Value;
//!
//! let mut dest: Value = serde_yaml::from_str("compiler: [gcc]\nversion: 1").unwrap();
//! let source: Value = serde_yaml::from_str("compiler: [intel]\nversion: 2").unwrap();
//! merge_yaml(&mut dest, &source);
//! assert_eq!(dest["version"], Value::Number(2.into()));
//! assert_eq!(dest["compiler"].as_sequence().unwrap().len(), 2);
//! ```

use log::trace;
use serde_yaml::{Mapping, Value as YamlValue};

use super::{bare_key, is_override_key, ConfigKey};
use crate::error::{Error, Result};

/// Recursively merge `source` into `dest`, with `source` taking precedence
pub fn merge_yaml(dest: &mut YamlValue, source: &YamlValue) {
    match (&mut *dest, source) {
        (YamlValue::Mapping(dest_map), YamlValue::Mapping(source_map)) => {
            merge_mappings(dest_map, source_map);
        }
        (YamlValue::Sequence(dest_seq), YamlValue::Sequence(source_seq)) => {
            let mut merged = source_seq.clone();
            merged.extend(
                dest_seq
                    .iter()
                    .filter(|item| !source_seq.contains(item))
                    .cloned(),
            );
            *dest_seq = merged;
        }
        (target, _) => {
            trace!(
                "Replacing {} with {}",
                get_yaml_type_name(target),
                get_yaml_type_name(source)
            );
            *target = source.clone();
        }
    }
}

/// Merge the entries of `source` into `dest`, with `source` taking precedence
pub fn merge_mappings(dest: &mut Mapping, source: &Mapping) {
    for (key, value) in source {
        match find_key(dest, key) {
            None => {
                dest.insert(key.clone(), value.clone());
            }
            Some(existing) if is_override_key(key) => {
                replace_entry(dest, &existing, key.clone(), value.clone());
            }
            Some(existing) => {
                if let Some(target) = dest.get_mut(&existing) {
                    merge_yaml(target, value);
                }
            }
        }
    }
}

/// Find the key in `map` that addresses the same entry as `key`
///
/// String keys are compared by bare name; other keys must match exactly.
pub fn find_key(map: &Mapping, key: &YamlValue) -> Option<YamlValue> {
    match key.as_str() {
        Some(name) => {
            let name = bare_key(name);
            map.iter()
                .map(|(k, _)| k)
                .find(|k| k.as_str().map(bare_key) == Some(name))
                .cloned()
        }
        None => map.contains_key(key).then(|| key.clone()),
    }
}

/// Look up a string key, ignoring the override marker
pub fn get_key<'a>(map: &'a Mapping, name: &str) -> Option<&'a YamlValue> {
    let key = find_key(map, &YamlValue::String(name.to_string()))?;
    map.get(&key)
}

/// Mutable lookup of a string key, ignoring the override marker
pub fn get_key_mut<'a>(map: &'a mut Mapping, name: &str) -> Option<&'a mut YamlValue> {
    let key = find_key(map, &YamlValue::String(name.to_string()))?;
    map.get_mut(&key)
}

/// Remove a string key (in either form), returning its value
pub fn remove_key(map: &mut Mapping, name: &str) -> Option<YamlValue> {
    let key = find_key(map, &YamlValue::String(name.to_string()))?;
    let mut removed = None;
    let entries = std::mem::take(map);
    *map = entries
        .into_iter()
        .filter_map(|(k, v)| {
            if k == key {
                removed = Some(v);
                None
            } else {
                Some((k, v))
            }
        })
        .collect();
    removed
}

/// Replace the entry stored under `old_key` with `new_key: value`, keeping
/// its position in the mapping
fn replace_entry(map: &mut Mapping, old_key: &YamlValue, new_key: YamlValue, value: YamlValue) {
    let mut replacement = Some((new_key, value));
    let entries = std::mem::take(map);
    *map = entries
        .into_iter()
        .filter_map(|(k, v)| {
            if &k == old_key {
                replacement.take()
            } else {
                Some((k, v))
            }
        })
        .collect();
}

/// Navigate to a path of config keys, creating intermediate mappings
///
/// Existing keys are matched by bare name. A key that does not exist yet is
/// created in the form given by the path (plain or override), and an existing
/// plain key is promoted to an override key when the path asks for one.
///
/// # Errors
///
/// Returns `Error::Merge` if a non-mapping value sits on the path.
pub fn navigate_yaml_value<'a>(
    value: &'a mut YamlValue,
    path: &[ConfigKey],
) -> Result<&'a mut YamlValue> {
    let mut current = value;
    for segment in path {
        if current.is_null() {
            *current = YamlValue::Mapping(Mapping::new());
        }
        let found = get_yaml_type_name(current);
        let Some(map) = current.as_mapping_mut() else {
            return Err(Error::Merge {
                operation: "navigate".to_string(),
                message: format!(
                    "Expected mapping while navigating to '{}', found {}",
                    segment.name, found
                ),
            });
        };
        let key = match find_key(map, &segment.to_yaml_key()) {
            Some(existing) if segment.overrides && !is_override_key(&existing) => {
                let key = segment.to_yaml_key();
                let value = map.get(&existing).cloned().unwrap_or(YamlValue::Null);
                replace_entry(map, &existing, key.clone(), value);
                key
            }
            Some(key) => key,
            None => {
                let key = segment.to_yaml_key();
                map.insert(key.clone(), YamlValue::Mapping(Mapping::new()));
                key
            }
        };
        current = map.entry(key).or_insert(YamlValue::Null);
    }

    Ok(current)
}

/// Recursively drop override markers, turning every `key:` into `key`
///
/// Used when a fragment is folded into a single flat document where
/// precedence between scopes no longer applies.
pub fn strip_override_markers(value: &mut YamlValue) {
    match value {
        YamlValue::Mapping(map) => {
            let entries = std::mem::take(map);
            *map = entries
                .into_iter()
                .map(|(k, mut v)| {
                    strip_override_markers(&mut v);
                    let k = if is_override_key(&k) {
                        YamlValue::String(k.as_str().map(bare_key).unwrap_or_default().to_string())
                    } else {
                        k
                    };
                    (k, v)
                })
                .collect();
        }
        YamlValue::Sequence(seq) => seq.iter_mut().for_each(strip_override_markers),
        _ => {}
    }
}

/// Whether a value would count as "set" in a configuration section
///
/// Null, `false`, empty strings and empty collections are not.
pub fn is_truthy(value: &YamlValue) -> bool {
    match value {
        YamlValue::Null => false,
        YamlValue::Bool(b) => *b,
        YamlValue::String(s) => !s.is_empty(),
        YamlValue::Sequence(seq) => !seq.is_empty(),
        YamlValue::Mapping(map) => !map.is_empty(),
        _ => true,
    }
}

/// Get a human-readable type name for a YAML value
///
/// Used for logging and error messages to describe the type of a value.
pub fn get_yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "Null",
        YamlValue::Bool(_) => "Bool",
        YamlValue::Number(_) => "Number",
        YamlValue::String(_) => "String",
        YamlValue::Sequence(_) => "Sequence",
        YamlValue::Mapping(_) => "Mapping",
        YamlValue::Tagged(_) => "Tagged",
    }
}
