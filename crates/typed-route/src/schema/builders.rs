//! Schema builders.
//!
//! Every builder produces a non-nullable node. The `null_*` variants and
//! [`Schema::optional`] produce the same node with `required == false`;
//! nothing else changes. Composite builders keep their children exactly as
//! given.
//!
//! Codec builders ([`transform`], [`custom_type`]) reject parents that are
//! themselves codecs or unions with a [`SchemaDefinitionError`].

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

use super::discriminator::discriminator;
use super::{
    CodecFn, CustomTypeSchema, LazySchema, RefineFn, Schema, SchemaKind, TransformSchema,
    UnionSchema,
};
use crate::error::{CodecError, SchemaDefinitionError};

// =============================================================================
// Modifiers
// =============================================================================

impl Schema {
    /// Copy of this node that accepts null and absent values.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Copy of this node that rejects null and absent values.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Copy of this node with an extra refinement.
    ///
    /// Refinements run after structural validation and may only reject the
    /// value, never change it. Chained refinements run in order.
    pub fn refine<F, E>(mut self, refine: F) -> Self
    where
        F: Fn(&Value) -> Result<(), E> + Send + Sync + 'static,
        E: Into<CodecError>,
    {
        let refine =
            move |value: &Value| -> Result<(), CodecError> { refine(value).map_err(Into::into) };
        let combined: RefineFn = if let Some(previous) = self.refinement.take() {
            Arc::new(move |value: &Value| -> Result<(), CodecError> {
                previous(value)?;
                refine(value)
            })
        } else {
            Arc::new(refine)
        };
        self.refinement = Some(combined);
        self
    }

    /// Copy of this node with a description, carried into documentation.
    pub fn describe(mut self, description: impl AsRef<str>) -> Self {
        self.description = Some(Arc::from(description.as_ref()));
        self
    }
}

// =============================================================================
// Scalars
// =============================================================================

/// Any JSON number.
pub fn number() -> Schema {
    Schema::from_kind(SchemaKind::Number)
}

/// Nullable [`number`].
pub fn null_number() -> Schema {
    number().optional()
}

/// Any JSON string.
pub fn string() -> Schema {
    Schema::from_kind(SchemaKind::String)
}

/// Nullable [`string`].
pub fn null_string() -> Schema {
    string().optional()
}

/// `true` or `false`.
pub fn boolean() -> Schema {
    Schema::from_kind(SchemaKind::Boolean)
}

/// Nullable [`boolean`].
pub fn null_boolean() -> Schema {
    boolean().optional()
}

/// Anything. Note that `any()` is still required: use [`null_any`] to accept
/// absent values.
pub fn any() -> Schema {
    Schema::from_kind(SchemaKind::Any)
}

/// Nullable [`any`].
pub fn null_any() -> Schema {
    any().optional()
}

// =============================================================================
// Literals and unions
// =============================================================================

/// One of a fixed list of literals.
pub fn enum_of<I, V>(options: I) -> Schema
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let options: Vec<Value> = options.into_iter().map(Into::into).collect();
    Schema::from_kind(SchemaKind::Enum(options.into()))
}

/// Nullable [`enum_of`].
pub fn null_enum_of<I, V>(options: I) -> Schema
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    enum_of(options).optional()
}

/// Enum with a single option.
pub fn literal(value: impl Into<Value>) -> Schema {
    enum_of([value.into()])
}

/// Exactly one of several schemas.
///
/// The discriminator, if any, is detected here once.
pub fn one_of(options: impl IntoIterator<Item = Schema>) -> Schema {
    let options: Vec<Schema> = options.into_iter().collect();
    let discriminator = discriminator(&options);
    Schema::from_kind(SchemaKind::OneOf(Arc::new(UnionSchema {
        options,
        discriminator,
    })))
}

/// Nullable [`one_of`].
pub fn null_one_of(options: impl IntoIterator<Item = Schema>) -> Schema {
    one_of(options).optional()
}

// =============================================================================
// Containers
// =============================================================================

/// Homogeneous sequence.
pub fn array(items: Schema) -> Schema {
    Schema::from_kind(SchemaKind::Array(Arc::new(items)))
}

/// Nullable [`array`].
pub fn null_array(items: Schema) -> Schema {
    array(items).optional()
}

/// Mapping with keys fixed at declaration time, in declaration order.
pub fn object<I, K>(properties: I) -> Schema
where
    I: IntoIterator<Item = (K, Schema)>,
    K: Into<String>,
{
    let properties: IndexMap<String, Schema> = properties
        .into_iter()
        .map(|(name, schema)| (name.into(), schema))
        .collect();
    Schema::from_kind(SchemaKind::Object(Arc::new(properties)))
}

/// Nullable [`object`].
pub fn null_object<I, K>(properties: I) -> Schema
where
    I: IntoIterator<Item = (K, Schema)>,
    K: Into<String>,
{
    object(properties).optional()
}

/// Mapping from arbitrary string keys to values of one schema.
pub fn hash_map(value: Schema) -> Schema {
    Schema::from_kind(SchemaKind::HashMap(Arc::new(value)))
}

/// Nullable [`hash_map`].
pub fn null_hash_map(value: Schema) -> Schema {
    hash_map(value).optional()
}

// =============================================================================
// Deferred schemas
// =============================================================================

/// Named deferred schema, for recursion.
///
/// `resolve` is not called here. It is called each time a compiler reaches
/// the node, so it must always return the same schema.
///
/// ```rust,ignore
/// fn tree() -> Schema {
///     object([
///         ("value", number()),
///         ("children", array(lazy("Tree", tree))),
///     ])
/// }
/// ```
pub fn lazy<F>(name: impl AsRef<str>, resolve: F) -> Schema
where
    F: Fn() -> Schema + Send + Sync + 'static,
{
    Schema::from_kind(SchemaKind::Lazy(LazySchema {
        name: Arc::from(name.as_ref()),
        resolve: Arc::new(resolve),
    }))
}

/// Nullable [`lazy`].
pub fn null_lazy<F>(name: impl AsRef<str>, resolve: F) -> Schema
where
    F: Fn() -> Schema + Send + Sync + 'static,
{
    lazy(name, resolve).optional()
}

// =============================================================================
// Codecs
// =============================================================================

fn check_codec_parent(name: &str, parent: &Schema) -> Result<(), SchemaDefinitionError> {
    match parent.kind() {
        SchemaKind::Transform(_) | SchemaKind::CustomType(_) => {
            Err(SchemaDefinitionError::CodecOverCodec {
                name: name.to_string(),
                parent: parent.kind().name(),
            })
        }
        SchemaKind::OneOf(_) => Err(SchemaDefinitionError::CodecOverUnion {
            name: name.to_string(),
        }),
        _ => Ok(()),
    }
}

fn codec_fn<F, E>(f: F) -> CodecFn
where
    F: Fn(&Value) -> Result<Value, E> + Send + Sync + 'static,
    E: Into<CodecError>,
{
    Arc::new(move |value: &Value| -> Result<Value, CodecError> { f(value).map_err(Into::into) })
}

fn transform_unchecked(
    encoded: Schema,
    decoded: Schema,
    decode: CodecFn,
    encode: CodecFn,
) -> Schema {
    Schema::from_kind(SchemaKind::Transform(Arc::new(TransformSchema {
        encoded,
        decoded,
        decode,
        encode,
    })))
}

/// Codec between a wire schema (`encoded`) and a program schema (`decoded`).
///
/// `decode` must turn every value accepted by `encoded` into one accepted by
/// `decoded`, and `encode` must be its inverse on decodable values.
///
/// # Errors
///
/// Returns [`SchemaDefinitionError`] if `encoded` is itself a codec or a
/// `oneOf`.
pub fn transform<D, DE, En, EE>(
    encoded: Schema,
    decoded: Schema,
    decode: D,
    encode: En,
) -> Result<Schema, SchemaDefinitionError>
where
    D: Fn(&Value) -> Result<Value, DE> + Send + Sync + 'static,
    DE: Into<CodecError>,
    En: Fn(&Value) -> Result<Value, EE> + Send + Sync + 'static,
    EE: Into<CodecError>,
{
    check_codec_parent("transform", &encoded)?;
    Ok(transform_unchecked(
        encoded,
        decoded,
        codec_fn(decode),
        codec_fn(encode),
    ))
}

/// Named codec with only a decode function.
///
/// On encode the value is checked against `parent` and passed through.
///
/// # Errors
///
/// Returns [`SchemaDefinitionError`] if `parent` is itself a codec or a
/// `oneOf`.
pub fn custom_type<D, DE>(
    name: impl Into<String>,
    parent: Schema,
    decode: D,
) -> Result<Schema, SchemaDefinitionError>
where
    D: Fn(&Value) -> Result<Value, DE> + Send + Sync + 'static,
    DE: Into<CodecError>,
{
    let name = name.into();
    check_codec_parent(&name, &parent)?;
    Ok(Schema::from_kind(SchemaKind::CustomType(Arc::new(
        CustomTypeSchema {
            name,
            parent,
            decode: codec_fn(decode),
        },
    ))))
}

// =============================================================================
// Cast codecs
// =============================================================================

fn expect_str(value: &Value) -> Result<&str, CodecError> {
    value
        .as_str()
        .ok_or_else(|| CodecError::new("expected a string"))
}

fn parse_number(text: &str) -> Result<Value, CodecError> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Value::from(int));
    }
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| CodecError::new(format!("'{}' is not a number", text)))
}

fn number_to_string(value: &Value) -> Result<Value, CodecError> {
    match value {
        Value::Number(n) => Ok(Value::String(n.to_string())),
        _ => Err(CodecError::new("expected a number")),
    }
}

/// Number carried as a string on the wire (path, query and header values).
pub fn cast_number() -> Schema {
    transform_unchecked(
        string(),
        number(),
        Arc::new(|value: &Value| parse_number(expect_str(value)?)),
        Arc::new(number_to_string),
    )
}

/// Nullable [`cast_number`].
pub fn null_cast_number() -> Schema {
    cast_number().optional()
}

/// Integer carried as a string on the wire.
pub fn cast_integer() -> Schema {
    transform_unchecked(
        string(),
        number().refine(|value: &Value| {
            if value.is_i64() || value.is_u64() {
                Ok(())
            } else {
                Err("expected an integer")
            }
        }),
        Arc::new(|value: &Value| {
            let text = expect_str(value)?.trim();
            text.parse::<i64>()
                .map(Value::from)
                .map_err(|_| CodecError::new(format!("'{}' is not an integer", text)))
        }),
        Arc::new(number_to_string),
    )
}

/// Nullable [`cast_integer`].
pub fn null_cast_integer() -> Schema {
    cast_integer().optional()
}

/// Boolean carried as `"true"` / `"false"` on the wire.
pub fn cast_boolean() -> Schema {
    transform_unchecked(
        string(),
        boolean(),
        Arc::new(|value: &Value| match expect_str(value)? {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(CodecError::new(format!(
                "'{}' is not a boolean, expected 'true' or 'false'",
                other
            ))),
        }),
        Arc::new(|value: &Value| match value {
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(CodecError::new("expected a boolean")),
        }),
    )
}

/// Nullable [`cast_boolean`].
pub fn null_cast_boolean() -> Schema {
    cast_boolean().optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builders_are_required_by_default() {
        for schema in [number(), string(), boolean(), any(), array(number())] {
            assert!(schema.is_required(), "{} should be required", schema.kind().name());
        }
        for schema in [null_number(), null_string(), null_boolean(), null_any()] {
            assert!(!schema.is_required());
        }
    }

    #[test]
    fn optional_keeps_everything_else() {
        let base = object([("a", number())]).describe("thing");
        let optional = base.clone().optional();
        assert!(!optional.is_required());
        assert_eq!(optional.description(), Some("thing"));
        assert_eq!(
            optional.properties().unwrap().keys().collect::<Vec<_>>(),
            vec!["a"]
        );
        assert!(base.is_required());
    }

    #[test]
    fn object_keeps_declaration_order() {
        let schema = object([("z", number()), ("a", string()), ("m", boolean())]);
        let keys: Vec<_> = schema.properties().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn transform_over_transform_is_rejected() {
        let err = transform(
            cast_number(),
            number(),
            |v: &Value| Ok::<_, CodecError>(v.clone()),
            |v: &Value| Ok::<_, CodecError>(v.clone()),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaDefinitionError::CodecOverCodec { parent: "transform", .. }));
    }

    #[test]
    fn custom_type_over_union_is_rejected() {
        let err = custom_type("Id", one_of([string(), number()]), |v: &Value| {
            Ok::<_, CodecError>(v.clone())
        })
        .unwrap_err();
        assert_eq!(
            err,
            SchemaDefinitionError::CodecOverUnion {
                name: "Id".to_string()
            }
        );
    }

    #[test]
    fn custom_type_over_custom_type_is_rejected() {
        let pass = |v: &Value| Ok::<_, CodecError>(v.clone());
        let inner = custom_type("Inner", string(), pass).unwrap();
        let err = custom_type("Outer", inner, pass).unwrap_err();
        assert!(matches!(err, SchemaDefinitionError::CodecOverCodec { parent: "customType", .. }));
    }

    #[test]
    fn lazy_is_not_resolved_at_definition() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let schema = lazy("Counted", || {
            CALLS.fetch_add(1, Ordering::SeqCst);
            number()
        });
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        let SchemaKind::Lazy(inner) = schema.kind() else {
            panic!("expected a lazy node");
        };
        assert_eq!(inner.name(), "Counted");
        inner.resolve();
        inner.resolve();
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn chained_refinements_all_run() {
        let schema = string()
            .refine(|v: &Value| match v.as_str() {
                Some(s) if !s.is_empty() => Ok(()),
                _ => Err("empty"),
            })
            .refine(|v: &Value| match v.as_str() {
                Some(s) if s.len() < 4 => Ok(()),
                _ => Err("too long"),
            });

        assert!(schema.refine_value(&json!("abc")).is_ok());
        assert_eq!(schema.refine_value(&json!("")).unwrap_err().message(), "empty");
        assert_eq!(schema.refine_value(&json!("abcdef")).unwrap_err().message(), "too long");
    }

    #[test]
    fn cast_number_parses_integers_and_floats() {
        let SchemaKind::Transform(codec) = cast_number().kind().clone() else {
            panic!("expected a transform");
        };
        use crate::schema::Direction;
        assert_eq!(codec.apply(Direction::Decode, &json!("7")).unwrap(), json!(7));
        assert_eq!(codec.apply(Direction::Decode, &json!("2.5")).unwrap(), json!(2.5));
        assert!(codec.apply(Direction::Decode, &json!("seven")).is_err());
        assert_eq!(codec.apply(Direction::Encode, &json!(7)).unwrap(), json!("7"));
    }
}
