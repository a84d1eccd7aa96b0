//! Property-based tests for upstream naming and config merging.

#[cfg(test)]
mod proptest_tests {
    use crate::merge::yaml::merge_yaml;
    use crate::upstream::infer_upstream_name;
    use proptest::prelude::*;
    use serde_yaml::Value as YamlValue;

    // ============================================================================
    // infer_upstream_name property tests
    // ============================================================================

    proptest! {
        /// Property: spack-stack install trees are named <release>-<env>
        #[test]
        fn spack_stack_layout_yields_release_and_env(
            prefix in "(/[a-z0-9_]{1,8}){1,4}",
            version in "[0-9]\\.[0-9]{1,2}\\.[0-9]",
            env in "[a-z][a-z0-9-]{0,15}",
        ) {
            let path = format!("{}/spack-stack-{}/envs/{}/install", prefix, version, env);
            let name = infer_upstream_name(&path).unwrap();
            prop_assert_eq!(name, format!("spack-stack-{}-{}", version, env));
        }

        /// Property: any other path is named after its final segment
        #[test]
        fn other_paths_use_final_segment(
            parents in prop::collection::vec("[a-z0-9_]{1,8}", 0..4),
            last in "[a-z0-9_]{1,12}",
        ) {
            let mut path = String::new();
            for parent in &parents {
                path.push('/');
                path.push_str(parent);
            }
            path.push('/');
            path.push_str(&last);
            let name = infer_upstream_name(&path).unwrap();
            prop_assert_eq!(name, last);
        }

        /// Property: a trailing slash does not change the name
        #[test]
        fn trailing_slash_is_ignored(path in "(/[a-z0-9_.-]{1,8}){1,5}") {
            let with_slash = format!("{}/", path);
            prop_assert_eq!(
                infer_upstream_name(&path).unwrap(),
                infer_upstream_name(&with_slash).unwrap()
            );
        }
    }

    // ============================================================================
    // merge_yaml property tests
    // ============================================================================

    fn string_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,6}(@[0-9]{1,2})?", 0..6)
    }

    fn to_seq(items: &[String]) -> YamlValue {
        YamlValue::Sequence(items.iter().cloned().map(YamlValue::String).collect())
    }

    proptest! {
        /// Property: merged lists start with the source items, in order
        #[test]
        fn merged_list_starts_with_source(dest in string_list(), source in string_list()) {
            let mut merged = to_seq(&dest);
            merge_yaml(&mut merged, &to_seq(&source));
            let merged = merged.as_sequence().unwrap();
            prop_assert!(merged.len() >= source.len());
            for (got, want) in merged.iter().zip(&source) {
                prop_assert_eq!(got.as_str(), Some(want.as_str()));
            }
        }

        /// Property: no destination item is lost by a list merge
        #[test]
        fn merged_list_keeps_destination_items(dest in string_list(), source in string_list()) {
            let mut merged = to_seq(&dest);
            merge_yaml(&mut merged, &to_seq(&source));
            let merged = merged.as_sequence().unwrap();
            for item in &dest {
                prop_assert!(merged.iter().any(|v| v.as_str() == Some(item.as_str())));
            }
        }

        /// Property: merging a value into itself leaves mappings unchanged
        #[test]
        fn merge_mapping_with_itself_is_stable(
            keys in prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..6),
        ) {
            let mut map = serde_yaml::Mapping::new();
            for (k, v) in &keys {
                map.insert(YamlValue::String(k.clone()), YamlValue::String(v.clone()));
            }
            let original = YamlValue::Mapping(map);
            let mut merged = original.clone();
            merge_yaml(&mut merged, &original);
            prop_assert_eq!(merged, original);
        }
    }
}
