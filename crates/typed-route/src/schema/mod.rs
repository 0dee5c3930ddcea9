//! Schema intermediate representation.
//!
//! A [`Schema`] describes the shape of a value, whether it may be null or
//! absent, and optionally how it is converted between its wire form and its
//! program form. Schemas carry no validation or rendering logic of their own;
//! they are consumed by three independent compilers:
//!
//! - [`Validator`](crate::validation::Validator) decodes and encodes values,
//! - [`DocCompiler`](crate::openapi::DocCompiler) describes them as OpenAPI,
//! - [`TypeRenderer`](crate::typescript::TypeRenderer) renders TypeScript types.
//!
//! Schemas are immutable. Every composite payload sits behind an [`Arc`], so
//! cloning a schema is cheap and modifiers such as
//! [`optional`](Schema::optional) return a new node that shares its children.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_route::schema::builders::*;
//!
//! let user = object([
//!     ("id", number()),
//!     ("name", string()),
//!     ("nickname", null_string()),
//!     ("role", enum_of(["admin", "member"])),
//! ]);
//! ```

pub mod builders;
pub mod discriminator;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::CodecError;

/// Conversion function used by codecs (`decode` / `encode`).
pub type CodecFn = Arc<dyn Fn(&Value) -> Result<Value, CodecError> + Send + Sync>;

/// Refinement run after structural validation succeeds.
pub type RefineFn = Arc<dyn Fn(&Value) -> Result<(), CodecError> + Send + Sync>;

/// Deferred constructor of a lazy schema.
pub type ResolveFn = Arc<dyn Fn() -> Schema + Send + Sync>;

/// Which way a value travels through the codecs of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Wire to program: validate against the encoded side, apply `decode`
    #[default]
    Decode,
    /// Program to wire: validate against the decoded side, apply `encode`
    Encode,
}

impl Direction {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Self::Decode => Self::Encode,
            Self::Encode => Self::Decode,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => write!(f, "decode"),
            Self::Encode => write!(f, "encode"),
        }
    }
}

/// A schema node.
#[derive(Clone)]
pub struct Schema {
    pub(crate) kind: SchemaKind,
    pub(crate) required: bool,
    pub(crate) refinement: Option<RefineFn>,
    pub(crate) description: Option<Arc<str>>,
}

/// The closed set of schema variants.
#[derive(Clone, Debug)]
pub enum SchemaKind {
    /// Any JSON number
    Number,
    /// Any JSON string
    String,
    /// `true` or `false`
    Boolean,
    /// Anything, including null
    Any,
    /// One of a fixed list of literals
    Enum(Arc<[Value]>),
    /// Exactly one of several schemas
    OneOf(Arc<UnionSchema>),
    /// Homogeneous sequence
    Array(Arc<Schema>),
    /// Mapping with keys fixed at declaration time
    Object(Arc<IndexMap<String, Schema>>),
    /// Mapping with arbitrary string keys and homogeneous values
    HashMap(Arc<Schema>),
    /// Deferred schema, used for recursion
    Lazy(LazySchema),
    /// Codec between a wire schema and a program schema
    Transform(Arc<TransformSchema>),
    /// Named single-direction codec
    CustomType(Arc<CustomTypeSchema>),
}

impl SchemaKind {
    /// Short lower-case name of the variant, used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Any => "any",
            Self::Enum(_) => "enum",
            Self::OneOf(_) => "oneOf",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::HashMap(_) => "hashMap",
            Self::Lazy(_) => "lazy",
            Self::Transform(_) => "transform",
            Self::CustomType(_) => "customType",
        }
    }
}

/// Options of a `oneOf` node, plus the discriminator detected at build time.
#[derive(Debug)]
pub struct UnionSchema {
    /// Options in declaration order
    pub options: Vec<Schema>,
    /// Shared single-literal property, when the union is discriminated
    pub discriminator: Option<String>,
}

impl UnionSchema {
    /// Find the option whose discriminator literal equals `tag`.
    pub fn branch_for(&self, tag: &Value) -> Option<&Schema> {
        let key = self.discriminator.as_deref()?;
        self.options.iter().find(|option| {
            option
                .property(key)
                .and_then(Schema::single_literal)
                .is_some_and(|literal| literals_equal(literal, tag))
        })
    }

    /// Discriminator literals in option order.
    pub fn tags(&self) -> Vec<&Value> {
        let Some(key) = self.discriminator.as_deref() else {
            return Vec::new();
        };
        self.options
            .iter()
            .filter_map(|option| option.property(key).and_then(Schema::single_literal))
            .collect()
    }
}

/// A named, deferred schema.
#[derive(Clone)]
pub struct LazySchema {
    pub(crate) name: Arc<str>,
    pub(crate) resolve: ResolveFn,
}

impl LazySchema {
    /// Definition name, used to deduplicate recursive definitions.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the deferred schema. Called on every traversal.
    pub fn resolve(&self) -> Schema {
        (self.resolve)()
    }
}

impl fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySchema").field("name", &self.name).finish()
    }
}

/// Codec between a wire representation and a program representation.
pub struct TransformSchema {
    /// Schema of the wire representation
    pub encoded: Schema,
    /// Schema of the program representation
    pub decoded: Schema,
    pub(crate) decode: CodecFn,
    pub(crate) encode: CodecFn,
}

impl TransformSchema {
    /// Schema validating the input side for a direction.
    pub fn input_side(&self, direction: Direction) -> &Schema {
        match direction {
            Direction::Decode => &self.encoded,
            Direction::Encode => &self.decoded,
        }
    }

    /// Schema describing the output side for a direction.
    pub fn output_side(&self, direction: Direction) -> &Schema {
        self.input_side(direction.reverse())
    }

    /// Apply the codec function for a direction.
    pub fn apply(&self, direction: Direction, value: &Value) -> Result<Value, CodecError> {
        match direction {
            Direction::Decode => (self.decode)(value),
            Direction::Encode => (self.encode)(value),
        }
    }
}

impl fmt::Debug for TransformSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformSchema")
            .field("encoded", &self.encoded)
            .field("decoded", &self.decoded)
            .finish_non_exhaustive()
    }
}

/// Legacy named codec with a decode function only.
pub struct CustomTypeSchema {
    /// Name of the custom type
    pub name: String,
    /// Schema the wire value must satisfy before decoding
    pub parent: Schema,
    pub(crate) decode: CodecFn,
}

impl CustomTypeSchema {
    /// Apply the decode function.
    pub fn decode(&self, value: &Value) -> Result<Value, CodecError> {
        (self.decode)(value)
    }
}

impl fmt::Debug for CustomTypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTypeSchema")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl Schema {
    pub(crate) fn from_kind(kind: SchemaKind) -> Self {
        Self {
            kind,
            required: true,
            refinement: None,
            description: None,
        }
    }

    /// The variant of this node.
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Whether null and absent values are rejected at this position.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Human-readable description, if one was attached.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Run the refinement, if any.
    pub fn refine_value(&self, value: &Value) -> Result<(), CodecError> {
        match &self.refinement {
            Some(refine) => refine(value),
            None => Ok(()),
        }
    }

    /// Whether a refinement is attached.
    pub fn has_refinement(&self) -> bool {
        self.refinement.is_some()
    }

    /// Object properties, if this is an object node.
    pub fn properties(&self) -> Option<&IndexMap<String, Schema>> {
        match &self.kind {
            SchemaKind::Object(properties) => Some(properties),
            _ => None,
        }
    }

    /// A single object property, if this is an object node.
    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties()?.get(name)
    }

    /// The literal of an enum with exactly one option.
    pub fn single_literal(&self) -> Option<&Value> {
        match &self.kind {
            SchemaKind::Enum(options) if options.len() == 1 => options.first(),
            _ => None,
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Schema");
        s.field("kind", &self.kind).field("required", &self.required);
        if self.refinement.is_some() {
            s.field("refinement", &"<fn>");
        }
        if let Some(description) = &self.description {
            s.field("description", description);
        }
        s.finish()
    }
}

/// Literal equality that treats numbers by value, so `1` matches `1.0`.
pub(crate) fn literals_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() || y.is_f64() => {
            x.as_f64() == y.as_f64()
        }
        _ => a == b,
    }
}
