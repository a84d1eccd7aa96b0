//! Property-based tests for composing on top of a template manifest.

#[cfg(test)]
mod proptest_tests {
    use std::collections::BTreeMap;

    use crate::manifest::Manifest;
    use crate::merge::quote_component;
    use crate::merge::yaml::get_key;
    use proptest::prelude::*;
    use serde_yaml::{Mapping, Value as YamlValue};

    fn string(s: &str) -> YamlValue {
        YamlValue::String(s.to_string())
    }

    fn seq(items: &[String]) -> YamlValue {
        YamlValue::Sequence(items.iter().map(|i| string(i)).collect())
    }

    fn spec_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("(gcc|intel|openmpi|mpich)@[0-9]{1,2}\\.[0-9]", 0..4)
    }

    fn packages() -> impl Strategy<Value = BTreeMap<String, (Vec<String>, Option<String>)>> {
        prop::collection::btree_map(
            "p[a-z]{1,6}",
            (spec_list(), prop::option::of("[+~][a-z]{2,6}")),
            0..4,
        )
    }

    /// Original template: `packages` with an `all` entry and package
    /// preferences, plus an optional `config` section
    fn template(
        compilers: &[String],
        packages: &BTreeMap<String, (Vec<String>, Option<String>)>,
        build_jobs: Option<u32>,
    ) -> Manifest {
        let mut all = Mapping::new();
        all.insert(string("compiler"), seq(compilers));
        let mut section = Mapping::new();
        section.insert(string("all"), YamlValue::Mapping(all));
        for (name, (versions, variants)) in packages {
            let mut entry = Mapping::new();
            entry.insert(string("version"), seq(versions));
            if let Some(variants) = variants {
                entry.insert(string("variants"), string(variants));
            }
            section.insert(string(name), YamlValue::Mapping(entry));
        }

        let mut spack = Mapping::new();
        spack.insert(string("packages"), YamlValue::Mapping(section));
        if let Some(jobs) = build_jobs {
            let mut config = Mapping::new();
            config.insert(string("build_jobs"), YamlValue::Number(jobs.into()));
            spack.insert(string("config"), YamlValue::Mapping(config));
        }
        spack.insert(string("view"), YamlValue::Bool(false));

        let mut document = Mapping::new();
        document.insert(string("spack"), YamlValue::Mapping(spack));
        let text = serde_yaml::to_string(&YamlValue::Mapping(document)).unwrap();
        Manifest::parse(&text).unwrap()
    }

    /// Check that every scalar of `original` is unchanged in `result` and
    /// every list of `original` is a prefix of the matching list
    fn preserved(original: &YamlValue, result: &YamlValue, at: &str) -> Result<(), String> {
        match original {
            YamlValue::Mapping(map) => {
                let result = result
                    .as_mapping()
                    .ok_or_else(|| format!("{}: expected a mapping, got {:?}", at, result))?;
                for (key, value) in map {
                    let name = key
                        .as_str()
                        .ok_or_else(|| format!("{}: non-string key {:?}", at, key))?;
                    let found = get_key(result, name)
                        .ok_or_else(|| format!("{}:{} is missing", at, name))?;
                    preserved(value, found, &format!("{}:{}", at, name))?;
                }
                Ok(())
            }
            YamlValue::Sequence(items) => {
                let result = result
                    .as_sequence()
                    .ok_or_else(|| format!("{}: expected a list, got {:?}", at, result))?;
                if result.len() < items.len() || result[..items.len()] != items[..] {
                    return Err(format!("{}: {:?} does not start with {:?}", at, result, items));
                }
                Ok(())
            }
            scalar if scalar == result => Ok(()),
            scalar => Err(format!("{}: {:?} became {:?}", at, scalar, result)),
        }
    }

    proptest! {
        /// Property: programmatic settings never displace template values
        #[test]
        fn template_sections_survive_composition(
            compilers in spec_list(),
            template_packages in packages(),
            build_jobs in prop::option::of(1u32..64),
            compiler in "(gcc|intel)@[0-9]{1,2}\\.[0-9]\\.[0-9]",
            mpi in "(openmpi|mpich)@[0-9]\\.[0-9]",
            added_packages in packages(),
            jobs in 1u32..64,
            prefix in "(/[a-z0-9:_-]{1,8}){1,3}",
        ) {
            let original = template(&compilers, &template_packages, build_jobs);
            let mut manifest = original.clone();

            let snapshot = manifest.snapshot_sections();
            manifest.add(&format!("packages:all::compiler:[{}]", compiler)).unwrap();
            manifest.add(&format!("packages:all::providers:mpi:[{}]", mpi)).unwrap();
            for (name, (versions, variants)) in &added_packages {
                manifest
                    .add(&format!("packages:{}:version:[{}]", name, versions.join(",")))
                    .unwrap();
                if let Some(variants) = variants {
                    manifest
                        .add(&format!("packages:{}:variants:{}", name, quote_component(variants)))
                        .unwrap();
                }
            }
            manifest.add(&format!("config:build_jobs:{}", jobs)).unwrap();
            manifest
                .add(&format!("config:install_tree:root:{}", quote_component(&prefix)))
                .unwrap();
            manifest.restore_sections(&snapshot);

            for name in ["packages", "config"] {
                if let Some(section) = original.section(name) {
                    let result = manifest.section(name).unwrap();
                    let check = preserved(section, result, name);
                    prop_assert!(check.is_ok(), "{}", check.unwrap_err());
                }
            }

            let root = &manifest.section("config").unwrap()["install_tree"]["root"];
            prop_assert_eq!(root.as_str(), Some(prefix.as_str()));
        }
    }
}
