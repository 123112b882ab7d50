//! Property-based tests for formwork-schema.

use formwork_schema::prelude::*;
use proptest::prelude::*;
use serde_json::{Value, json};

fn profile_schema() -> SchemaNode {
    object()
        .field("name", string().min_length(1).trim().capitalize_words())
        .field("age", number().coerce().int().min(0.0).max(150.0))
        .field("tags", list(string().to_lowercase()).max_items(5))
        .field("bio", string().max_length(40).optional())
        .into()
}

fn raw_profile() -> impl Strategy<Value = Value> {
    (
        prop_oneof![
            "[a-zA-Z][a-zA-Z ]{0,11}",
            " {0,4}",
            "[a-zA-Z ]{0,12}",
        ],
        prop_oneof![
            (0i64..200).prop_map(Value::from),
            "[0-9]{0,3}".prop_map(Value::from),
            "[a-z ]{0,3}".prop_map(Value::from),
        ],
        prop::collection::vec("[a-zA-Z]{0,6}", 0..7),
        prop::option::of(".{0,50}"),
    )
        .prop_map(|(name, age, tags, bio)| {
            let mut raw = json!({ "name": name, "age": age, "tags": tags });
            if let Some(bio) = bio {
                raw["bio"] = Value::from(bio);
            }
            raw
        })
}

// ============================================================================
// IDEMPOTENCE: validating normalized output yields the same output
// ============================================================================

proptest! {
    #[test]
    fn success_is_idempotent(raw in raw_profile()) {
        let schema = profile_schema();
        if let Ok(Validation::Success(normalized)) = validate(&schema, &raw) {
            prop_assert_ne!(&normalized["name"], &json!(""));
            let again = validate(&schema, &normalized);
            prop_assert_eq!(again, Ok(Validation::Success(normalized)));
        }
    }

    #[test]
    fn validation_is_deterministic(raw in raw_profile()) {
        let schema = profile_schema();
        prop_assert_eq!(validate(&schema, &raw), validate(&schema, &raw));
    }
}

proptest! {
    #[test]
    fn blank_names_never_normalize_to_empty(spaces in " {1,6}") {
        let schema = profile_schema();
        let raw = json!({ "name": spaces, "age": 30, "tags": [] });
        let defect = validate(&schema, &raw).unwrap_err();
        prop_assert_eq!(defect.code(), "SCHEMA_TRANSFORM_FAILED");
    }
}

// ============================================================================
// ADDRESSING: every error path exists in the schema
// ============================================================================

proptest! {
    #[test]
    fn error_paths_resolve_to_schema_nodes(raw in raw_profile()) {
        let schema = profile_schema();
        if let Ok(Validation::Failure(errors)) = validate(&schema, &raw) {
            prop_assert!(!errors.is_empty());
            for path in errors.paths() {
                prop_assert!(schema.node_at(path).is_some(), "no node at {}", path);
            }
        }
    }
}

// ============================================================================
// PATHS: dotted form round-trips for generated paths
// ============================================================================

proptest! {
    #[test]
    fn dotted_paths_round_trip(
        segments in prop::collection::vec(
            prop_oneof![
                "[a-z_][a-z0-9_]{0,8}".prop_map(PathSegment::Key),
                (0usize..50).prop_map(PathSegment::Index),
            ],
            0..6,
        )
    ) {
        let path: FieldPath = segments.into_iter().collect();
        prop_assert_eq!(FieldPath::from(path.to_string()), path);
    }
}
