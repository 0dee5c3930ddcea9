//! Tests for the validator/transform compiler
//!
//! Covers the per-variant rules, error path formatting, nullability
//! short-circuiting, codecs in both directions, and the round-trip law.

use crate::config::ValidationConfig;
use crate::error::CodecError;
use crate::schema::builders::*;
use crate::schema::{Direction, Schema};
use crate::validation::{ValidationError, Validator};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn decode(schema: &Schema, value: Value) -> Result<Value, ValidationError> {
    Validator::new(schema.clone(), Direction::Decode).validate(&value)
}

fn encode(schema: &Schema, value: Value) -> Result<Value, ValidationError> {
    Validator::new(schema.clone(), Direction::Encode).validate(&value)
}

fn identity(value: &Value) -> Result<Value, CodecError> {
    Ok(value.clone())
}

// =============================================================================
// Scalars and enums
// =============================================================================

#[test]
fn test_scalars_do_not_coerce() {
    let err = decode(&number(), json!("7")).unwrap_err();
    assert_eq!(err.errors_at(""), Some(&["expected number, received string".to_string()][..]));

    assert!(decode(&string(), json!(7)).is_err());
    assert!(decode(&boolean(), json!("true")).is_err());
    assert_eq!(decode(&boolean(), json!(false)).unwrap(), json!(false));
}

#[test]
fn test_any_accepts_everything_present() {
    let schema = crate::schema::builders::any();
    for value in [json!(1), json!("x"), json!([1, {"a": null}]), json!({})] {
        assert_eq!(decode(&schema, value.clone()).unwrap(), value);
    }
}

#[test]
fn test_enum_uses_strict_equality() {
    let schema = enum_of([json!(1), json!("two")]);
    assert!(decode(&schema, json!(1)).is_ok());
    assert!(decode(&schema, json!("two")).is_ok());

    let err = decode(&schema, json!("1")).unwrap_err();
    assert_eq!(err.errors_at("").unwrap()[0], r#"expected one of [1, "two"]"#);
}

#[test]
fn test_enum_compares_numbers_by_value() {
    let schema = enum_of([json!(1), json!(2.5)]);
    assert_eq!(decode(&schema, json!(1.0)).unwrap(), json!(1.0));
    assert!(decode(&schema, json!(2.5)).is_ok());
    assert!(decode(&schema, json!(2)).is_err());
    assert!(decode(&schema, json!("1")).is_err());
}

// =============================================================================
// Nullability
// =============================================================================

#[test]
fn test_required_rejects_null_and_absent() {
    let validator = Validator::new(number(), Direction::Decode);
    for input in [None, Some(&Value::Null)] {
        let err = validator.validate_optional(input).unwrap_err();
        assert_eq!(err.errors_at(""), Some(&["is required".to_string()][..]));
    }
}

#[test]
fn test_optional_keeps_null_and_absent() {
    let validator = Validator::new(null_number(), Direction::Decode);
    assert_eq!(validator.validate_optional(None).unwrap(), None);
    assert_eq!(validator.validate_optional(Some(&Value::Null)).unwrap(), Some(Value::Null));
}

#[test]
fn test_optional_transform_never_calls_codec() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let schema = transform(
        string(),
        number(),
        move |value: &Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            identity(value)
        },
        identity,
    )
    .unwrap()
    .optional();

    for direction in [Direction::Decode, Direction::Encode] {
        let validator = Validator::new(schema.clone(), direction);
        assert_eq!(validator.validate_optional(None).unwrap(), None);
        assert_eq!(validator.validate(&Value::Null).unwrap(), Value::Null);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_refinement_skipped_for_null() {
    let schema = null_string().refine(|_: &Value| Err::<(), _>("always fails"));
    assert_eq!(decode(&schema, Value::Null).unwrap(), Value::Null);
    let err = decode(&schema, json!("x")).unwrap_err();
    assert_eq!(err.errors_at("").unwrap(), ["always fails".to_string()]);
}

// =============================================================================
// Objects, arrays and maps
// =============================================================================

#[test]
fn test_object_missing_required_key_names_path() {
    let schema = object([("name", string()), ("nickname", null_string())]);
    let err = decode(&schema, json!({})).unwrap_err();
    assert_eq!(err.paths(), vec!["name"]);
}

#[test]
fn test_object_optional_absent_stays_absent() {
    let schema = object([("name", string()), ("nickname", null_string())]);
    let value = decode(&schema, json!({"name": "Ada"})).unwrap();
    assert_eq!(value, json!({"name": "Ada"}));
    assert!(value.get("nickname").is_none());

    let value = decode(&schema, json!({"name": "Ada", "nickname": null})).unwrap();
    assert_eq!(value, json!({"name": "Ada", "nickname": null}));
}

#[test]
fn test_unknown_keys_carried_through() {
    let schema = object([("a", number())]);
    let value = decode(&schema, json!({"a": 1, "extra": {"x": true}})).unwrap();
    assert_eq!(value, json!({"a": 1, "extra": {"x": true}}));
}

#[test]
fn test_strict_objects_reject_unknown_keys() {
    let config = ValidationConfig::new().with_strict_objects(true);
    let validator =
        Validator::new(object([("a", number())]), Direction::Decode).with_config(config);
    let err = validator.validate(&json!({"a": 1, "b": 2, "c": 3})).unwrap_err();
    assert_eq!(err.paths(), vec!["b", "c"]);
}

#[test]
fn test_nested_error_paths_and_accumulation() {
    let schema = object([(
        "a",
        object([
            ("b", array(object([("c", number())]))),
            ("d", string()),
        ]),
    )]);
    let input = json!({
        "a": {
            "b": [{"c": 1}, {"c": 2}, {"c": "three"}],
            "d": 4
        }
    });

    let err = decode(&schema, input).unwrap_err();
    assert_eq!(err.paths(), vec!["a.b[2].c", "a.d"]);
    assert_eq!(
        err.errors_at("a.b[2].c").unwrap(),
        ["expected number, received string".to_string()]
    );
}

#[test]
fn test_all_array_elements_reported() {
    let err = decode(&array(number()), json!([1, "x", 3, null])).unwrap_err();
    assert_eq!(err.paths(), vec!["[1]", "[3]"]);
    assert_eq!(err.errors_at("[3]").unwrap(), ["is required".to_string()]);
}

#[test]
fn test_hash_map_validates_every_entry() {
    let schema = object([("scores", hash_map(number()))]);
    assert!(decode(&schema, json!({"scores": {"ada": 3, "bob": 4}})).is_ok());

    let err = decode(&schema, json!({"scores": {"ada": 3, "bob": "four"}})).unwrap_err();
    assert_eq!(err.paths(), vec!["scores.bob"]);
}

// =============================================================================
// Unions
// =============================================================================

fn shape() -> Schema {
    one_of([
        object([("type", literal("circle")), ("radius", number())]),
        object([("type", literal("square")), ("side", number())]),
    ])
}

#[test]
fn test_undiscriminated_union_first_match_wins() {
    let schema = one_of([cast_number(), string()]);
    assert_eq!(decode(&schema, json!("7")).unwrap(), json!(7));
    assert_eq!(decode(&schema, json!("seven")).unwrap(), json!("seven"));
}

#[test]
fn test_undiscriminated_union_reports_single_issue() {
    let schema = object([("value", one_of([number(), boolean()]))]);
    let err = decode(&schema, json!({"value": "x"})).unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(err.paths(), vec!["value"]);
    assert!(err.errors_at("value").unwrap()[0].contains("2 allowed options"));
}

#[test]
fn test_discriminated_union_surfaces_branch_issues() {
    let schema = object([("shape", shape())]);
    let err = decode(&schema, json!({"shape": {"type": "circle", "radius": "big"}})).unwrap_err();
    assert_eq!(err.paths(), vec!["shape.radius"]);
}

#[test]
fn test_discriminated_union_unknown_tag() {
    let schema = object([("shape", shape())]);

    let err = decode(&schema, json!({"shape": {"type": "triangle"}})).unwrap_err();
    assert_eq!(err.paths(), vec!["shape.type"]);
    assert_eq!(
        err.errors_at("shape.type").unwrap()[0],
        r#"expected one of ["circle", "square"]"#
    );

    let err = decode(&schema, json!({"shape": {"side": 2}})).unwrap_err();
    assert!(err.errors_at("shape.type").unwrap()[0].starts_with("is required"));
}

#[test]
fn test_discriminated_union_numeric_tag() {
    let schema = one_of([
        object([("version", literal(1)), ("name", string())]),
        object([("version", literal(2)), ("names", array(string()))]),
    ]);
    let value = json!({"version": 1.0, "name": "a"});
    assert_eq!(decode(&schema, value.clone()).unwrap(), value);

    let err = decode(&schema, json!({"version": 2.0, "names": "a"})).unwrap_err();
    assert_eq!(err.paths(), vec!["names"]);
}

// =============================================================================
// Lazy
// =============================================================================

fn tree() -> Schema {
    object([("value", number()), ("children", array(lazy("Tree", tree)))])
}

#[test]
fn test_lazy_recursion() {
    let input = json!({
        "value": 1,
        "children": [
            {"value": 2, "children": []},
            {"value": 3, "children": [{"value": "x", "children": []}]}
        ]
    });
    let err = decode(&tree(), input).unwrap_err();
    assert_eq!(err.paths(), vec!["children[1].children[0].value"]);
}

// =============================================================================
// Codecs
// =============================================================================

#[test]
fn test_transform_decodes_and_encodes() {
    let schema = object([("id", cast_number()), ("active", cast_boolean())]);
    let decoded = decode(&schema, json!({"id": "42", "active": "true"})).unwrap();
    assert_eq!(decoded, json!({"id": 42, "active": true}));

    let encoded = encode(&schema, decoded).unwrap();
    assert_eq!(encoded, json!({"id": "42", "active": "true"}));
}

#[test]
fn test_transform_validates_input_side_per_direction() {
    // Decode expects the wire string, encode expects the program number.
    assert!(decode(&cast_number(), json!(42)).is_err());
    assert!(encode(&cast_number(), json!("42")).is_err());
}

#[test]
fn test_codec_failure_reported_at_path() {
    let schema = object([("id", cast_number())]);
    let err = decode(&schema, json!({"id": "seven"})).unwrap_err();
    assert_eq!(err.errors_at("id").unwrap(), ["'seven' is not a number".to_string()]);
}

#[test]
fn test_verify_output_catches_bad_codec() {
    let schema = transform(string(), number(), identity, identity).unwrap();

    let err = decode(&schema, json!("abc")).unwrap_err();
    assert_eq!(err.errors_at("").unwrap(), ["expected number, received string".to_string()]);

    let lenient = Validator::new(schema, Direction::Decode)
        .with_config(ValidationConfig::new().with_verify_output(false));
    assert_eq!(lenient.validate(&json!("abc")).unwrap(), json!("abc"));
}

#[test]
fn test_cast_integer_rejects_fractions() {
    assert_eq!(decode(&cast_integer(), json!("12")).unwrap(), json!(12));
    assert!(decode(&cast_integer(), json!("1.5")).is_err());
    assert!(encode(&cast_integer(), json!(1.5)).is_err());
}

#[test]
fn test_custom_type_decodes_and_passes_through_on_encode() {
    let schema = custom_type("Wrapped", string(), |value: &Value| {
        Ok::<_, CodecError>(json!({ "inner": value }))
    })
    .unwrap();

    assert_eq!(decode(&schema, json!("x")).unwrap(), json!({"inner": "x"}));
    assert_eq!(encode(&schema, json!("x")).unwrap(), json!("x"));
    assert!(encode(&schema, json!(5)).is_err());
}

#[test]
fn test_refinement_reports_at_path_without_changing_value() {
    let schema = object([(
        "name",
        string().refine(|value: &Value| {
            if value.as_str().is_some_and(|s| !s.is_empty()) {
                Ok(())
            } else {
                Err("must not be empty")
            }
        }),
    )]);
    assert_eq!(decode(&schema, json!({"name": "Bob"})).unwrap(), json!({"name": "Bob"}));

    let err = decode(&schema, json!({"name": ""})).unwrap_err();
    assert_eq!(err.errors_at("name").unwrap(), ["must not be empty".to_string()]);
}

fn positive(value: &Value) -> Result<(), &'static str> {
    match value.as_f64() {
        Some(n) if n > 0.0 => Ok(()),
        _ => Err("must be positive"),
    }
}

#[test]
fn test_refinement_on_codec_sees_program_value() {
    let schema = object([("n", cast_number().refine(positive))]);

    assert_eq!(decode(&schema, json!({"n": "7"})).unwrap(), json!({"n": 7}));
    assert_eq!(encode(&schema, json!({"n": 7})).unwrap(), json!({"n": "7"}));

    let err = decode(&schema, json!({"n": "-1"})).unwrap_err();
    assert_eq!(err.errors_at("n").unwrap(), ["must be positive".to_string()]);
    let err = encode(&schema, json!({"n": -1})).unwrap_err();
    assert_eq!(err.errors_at("n").unwrap(), ["must be positive".to_string()]);
}

#[test]
fn test_validation_error_serializes_as_issue_list() {
    let err = decode(&object([("a", number())]), json!({})).unwrap_err();
    assert_eq!(
        serde_json::to_value(&err).unwrap(),
        json!([{"path": "a", "errors": ["is required"]}])
    );
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Encoding a decoded value gives back the wire value
    #[test]
    fn prop_round_trip_law(
        id in proptest::num::i64::ANY,
        flag in proptest::bool::ANY,
        name in "[a-z]{0,12}"
    ) {
        let schema = object([
            ("id", cast_integer()),
            ("flag", cast_boolean()),
            ("name", string()),
        ]);
        let wire = json!({"id": id.to_string(), "flag": flag.to_string(), "name": name});
        let decoded = decode(&schema, wire.clone()).unwrap();
        prop_assert_eq!(&decoded["id"], &json!(id));
        prop_assert_eq!(encode(&schema, decoded).unwrap(), wire);
    }

    /// Null and absent succeed for every optional schema, fail for required ones
    #[test]
    fn prop_nullability(kind in 0usize..7, required in proptest::bool::ANY) {
        let base = match kind {
            0 => number(),
            1 => string(),
            2 => array(number()),
            3 => object([("a", number())]),
            4 => cast_number(),
            5 => lazy("Node", number),
            _ => one_of([number(), string()]),
        };
        let schema = if required { base } else { base.optional() };
        for direction in [Direction::Decode, Direction::Encode] {
            let validator = Validator::new(schema.clone(), direction);
            prop_assert_eq!(validator.validate_optional(None).is_ok(), !required);
            prop_assert_eq!(validator.validate(&Value::Null).is_ok(), !required);
        }
    }

    /// Decoding `{}` succeeds iff no property is required
    #[test]
    fn prop_object_partition(flags in prop::collection::vec(proptest::bool::ANY, 0..6)) {
        let properties: Vec<(String, Schema)> = flags
            .iter()
            .enumerate()
            .map(|(i, required)| {
                let schema = if *required { number() } else { null_number() };
                (format!("p{}", i), schema)
            })
            .collect();
        let result = decode(&object(properties), json!({}));
        prop_assert_eq!(result.is_ok(), !flags.contains(&true));
        if let Err(err) = result {
            let expected: Vec<String> = flags
                .iter()
                .enumerate()
                .filter(|(_, required)| **required)
                .map(|(i, _)| format!("p{}", i))
                .collect();
            prop_assert_eq!(err.paths(), expected.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
