//! Discriminated-union detection.
//!
//! A `oneOf` is discriminated when every option is an object and all options
//! share a property that is an enum with a single literal, with a different
//! literal in each option. Validation can then jump straight to the matching
//! branch instead of trying each one.

use serde_json::Value;

use super::{Schema, literals_equal};

/// Find the discriminator key of a union, if it has one.
///
/// Candidates are the single-literal enum properties of the first option, in
/// declaration order. The first candidate that every other option also
/// declares as a single-literal enum, with no literal repeated, wins.
pub fn discriminator(options: &[Schema]) -> Option<String> {
    let first = options.first()?;
    let mut objects = Vec::with_capacity(options.len());
    for option in options {
        objects.push(option.properties()?);
    }

    let candidates = first
        .properties()?
        .iter()
        .filter(|(_, schema)| schema.single_literal().is_some())
        .map(|(key, _)| key);

    for key in candidates {
        let mut literals: Vec<&Value> = Vec::with_capacity(objects.len());
        let shared = objects.iter().all(|properties| {
            let Some(literal) = properties.get(key).and_then(Schema::single_literal) else {
                return false;
            };
            if literals.iter().any(|seen| literals_equal(seen, literal)) {
                return false;
            }
            literals.push(literal);
            true
        });
        if shared {
            tracing::trace!(key = %key, branches = options.len(), "Detected union discriminator");
            return Some(key.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builders::*;
    use proptest::prelude::*;

    fn branch(tag: &str) -> Schema {
        object([("type", literal(tag)), ("value", number())])
    }

    #[test]
    fn detects_shared_literal_field() {
        let options = [branch("a"), branch("b"), branch("c")];
        assert_eq!(discriminator(&options).as_deref(), Some("type"));
    }

    #[test]
    fn duplicate_literals_are_not_a_discriminator() {
        let options = [branch("a"), branch("a")];
        assert_eq!(discriminator(&options), None);
    }

    #[test]
    fn numerically_equal_literals_are_duplicates() {
        let options = [
            object([("version", literal(1))]),
            object([("version", literal(1.0))]),
        ];
        assert_eq!(discriminator(&options), None);
    }

    #[test]
    fn non_object_option_disables_detection() {
        let options = [branch("a"), string()];
        assert_eq!(discriminator(&options), None);
    }

    #[test]
    fn multi_option_enums_are_not_candidates() {
        let options = [
            object([("kind", enum_of(["a", "x"]))]),
            object([("kind", enum_of(["b"]))]),
        ];
        assert_eq!(discriminator(&options), None);
    }

    #[test]
    fn skips_candidates_missing_from_later_options() {
        let options = [
            object([("version", literal(1)), ("kind", literal("a"))]),
            object([("kind", literal("b"))]),
        ];
        assert_eq!(discriminator(&options).as_deref(), Some("kind"));
    }

    #[test]
    fn empty_union_has_no_discriminator() {
        assert_eq!(discriminator(&[]), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Distinct literals across all branches yield the shared key
        #[test]
        fn prop_distinct_literals_detected(
            tags in prop::collection::hash_set("[a-z]{1,8}", 1..6)
        ) {
            let options: Vec<Schema> = tags.iter().map(|t| branch(t)).collect();
            let found = discriminator(&options);
            prop_assert_eq!(found.as_deref(), Some("type"));
        }

        /// Any repeated literal disables detection
        #[test]
        fn prop_duplicate_literals_rejected(
            tags in prop::collection::vec("[a-z]{1,8}", 1..6),
            dup_index in proptest::arbitrary::any::<prop::sample::Index>()
        ) {
            let mut tags = tags;
            let dup = tags[dup_index.index(tags.len())].clone();
            tags.push(dup);
            let options: Vec<Schema> = tags.iter().map(|t| branch(t)).collect();
            prop_assert_eq!(discriminator(&options), None);
        }
    }
}
