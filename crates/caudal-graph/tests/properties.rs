//! Property-based tests for format descriptor compatibility.

use caudal_graph::FormatDescriptor;
use proptest::prelude::*;

fn kind_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("audio/x-raw".to_string()),
        Just("audio/x-raw".to_string()),
        Just("audio/".to_string()),
        Just("audio/x-flac".to_string()),
        Just("video/x-raw".to_string()),
        "[a-z]{3,8}/x-[a-z]{2,6}",
    ]
}

fn attrs_strategy() -> impl Strategy<Value = Vec<(String, i64)>> {
    proptest::collection::vec(
        (
            prop_oneof![
                Just("format".to_string()),
                Just("rate".to_string()),
                Just("channels".to_string()),
                "[a-z]{2,6}",
            ],
            0i64..4,
        ),
        0..4,
    )
}

fn build(kind: &str, attrs: &[(String, i64)]) -> FormatDescriptor {
    let mut desc = FormatDescriptor::new(kind);
    for (name, value) in attrs {
        desc = desc.with(name.clone(), *value);
    }
    desc
}

proptest! {
    /// `accepts` is exactly: kind prefix match plus exact match of every
    /// required attribute on the candidate.
    #[test]
    fn accepts_matches_the_definition(
        required_kind in kind_strategy(),
        candidate_kind in kind_strategy(),
        required_attrs in attrs_strategy(),
        candidate_attrs in attrs_strategy(),
    ) {
        let required = build(&required_kind, &required_attrs);
        let candidate = build(&candidate_kind, &candidate_attrs);

        // Reference model: last write wins per attribute name, like the
        // builder.
        let mut required_map = std::collections::BTreeMap::new();
        for (name, value) in &required_attrs {
            required_map.insert(name.clone(), *value);
        }
        let mut candidate_map = std::collections::BTreeMap::new();
        for (name, value) in &candidate_attrs {
            candidate_map.insert(name.clone(), *value);
        }

        let expected = candidate_kind.starts_with(&required_kind)
            && required_map
                .iter()
                .all(|(name, value)| candidate_map.get(name) == Some(value));

        prop_assert_eq!(required.accepts(&candidate), expected);
    }

    /// Any descriptor satisfies itself.
    #[test]
    fn accepts_is_reflexive(kind in kind_strategy(), attrs in attrs_strategy()) {
        let desc = build(&kind, &attrs);
        prop_assert!(desc.accepts(&desc));
    }

    /// Merging a constraint into a base yields a candidate the constraint
    /// accepts, provided the kinds already matched.
    #[test]
    fn merged_result_satisfies_the_constraint(
        kind in kind_strategy(),
        base_attrs in attrs_strategy(),
        constraint_attrs in attrs_strategy(),
    ) {
        let base = build(&kind, &base_attrs);
        let constraint = build(&kind, &constraint_attrs);
        let merged = constraint.merged_into(&base);
        prop_assert!(constraint.accepts(&merged));
    }
}
