//! Validator/transform compiler.
//!
//! A [`Validator`] pairs a [`Schema`] with a [`Direction`] and checks JSON
//! values against it, running codecs along the way:
//!
//! - **Decode** validates wire values against the encoded side of every
//!   transform and produces program values.
//! - **Encode** validates program values against the decoded side and
//!   produces wire values.
//!
//! Failures never stop at the first problem within a record: every sibling
//! property, array element and map entry is visited and all issues are
//! reported together, each at the path where it happened (`a.b[2].c`).
//! Unions and codecs stop at their first failure.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_route::prelude::*;
//! use serde_json::json;
//!
//! let schema = object([("id", cast_number()), ("tags", array(string()))]);
//! let decoder = Validator::new(schema, Direction::Decode);
//!
//! let value = decoder.validate(&json!({"id": "7", "tags": ["a"]}))?;
//! assert_eq!(value, json!({"id": 7, "tags": ["a"]}));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::ValidationConfig;
use crate::schema::{Direction, Schema, SchemaKind, UnionSchema, literals_equal};

// =============================================================================
// Issues
// =============================================================================

/// Every failure reported at a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Location of the failing value; empty for the root
    pub path: String,
    /// Messages, in the order they were found
    pub errors: Vec<String>,
}

impl Issue {
    /// Create an issue with a single message
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            errors: vec![message.into()],
        }
    }
}

/// All issues found while validating one value.
///
/// Serializes as the bare list of issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(transparent)]
#[error("validation failed with {} issue(s)", .issues.len())]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    /// Build an error from a list of issues, merging issues that share a path.
    pub fn from_issues(issues: impl IntoIterator<Item = Issue>) -> Self {
        let mut error = Self::default();
        for issue in issues {
            for message in issue.errors {
                error.push(issue.path.clone(), message);
            }
        }
        error
    }

    /// Record a message at a path.
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let path = path.into();
        match self.issues.iter_mut().find(|issue| issue.path == path) {
            Some(issue) => issue.errors.push(message.into()),
            None => self.issues.push(Issue::new(path, message)),
        }
    }

    /// Issues in the order they were found
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Consume the error, returning its issues
    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    /// Paths of all issues
    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.path.as_str()).collect()
    }

    /// Messages recorded at `path`, if any
    pub fn errors_at(&self, path: &str) -> Option<&[String]> {
        self.issues
            .iter()
            .find(|issue| issue.path == path)
            .map(|issue| issue.errors.as_slice())
    }

    /// Number of distinct failing paths
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether no issue was recorded
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

// =============================================================================
// Validator
// =============================================================================

/// A schema compiled for one direction.
///
/// Validators are cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Validator {
    schema: Schema,
    direction: Direction,
    config: ValidationConfig,
}

impl Validator {
    /// Create a validator with the default configuration.
    pub fn new(schema: Schema, direction: Direction) -> Self {
        Self {
            schema,
            direction,
            config: ValidationConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    /// The schema being validated against
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The direction codecs run in
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Validate a present value.
    ///
    /// # Errors
    ///
    /// Returns every issue found, each at its own path.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self.validate_optional(Some(value))
            .map(|value| value.unwrap_or(Value::Null))
    }

    /// Validate a value that may be absent.
    ///
    /// An absent value is accepted only when the schema is not required, and
    /// stays absent.
    ///
    /// # Errors
    ///
    /// Returns every issue found, each at its own path.
    pub fn validate_optional(
        &self,
        value: Option<&Value>,
    ) -> Result<Option<Value>, ValidationError> {
        let mut pass = Pass::new(&self.config, self.direction);
        match pass.visit(&self.schema, value, "", Mode::Run) {
            Ok(output) if pass.issues.is_empty() => {
                trace!(direction = %self.direction, "Validation passed");
                Ok(output)
            }
            _ => {
                debug!(
                    direction = %self.direction,
                    issue_count = pass.issues.len(),
                    paths = ?pass.issues.paths(),
                    "Validation failed"
                );
                Err(pass.issues)
            }
        }
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Whether codecs run, or values are only checked against the output side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Check,
}

/// Marker for a failed subtree. The reason is already in `Pass::issues`.
struct Failed;

type Visit<T> = Result<T, Failed>;

struct Pass<'a> {
    config: &'a ValidationConfig,
    direction: Direction,
    issues: ValidationError,
}

impl<'a> Pass<'a> {
    fn new(config: &'a ValidationConfig, direction: Direction) -> Self {
        Self {
            config,
            direction,
            issues: ValidationError::default(),
        }
    }

    fn fail<T>(&mut self, path: &str, message: impl Into<String>) -> Visit<T> {
        self.issues.push(path, message);
        Err(Failed)
    }

    fn visit(
        &mut self,
        schema: &Schema,
        value: Option<&Value>,
        path: &str,
        mode: Mode,
    ) -> Visit<Option<Value>> {
        let input = match value {
            None | Some(Value::Null) => None,
            Some(present) => Some(present),
        };
        let Some(input) = input else {
            if schema.is_required() {
                return self.fail(path, "is required");
            }
            return Ok(value.cloned());
        };

        let output = self.visit_present(schema, input, path, mode)?;
        // Refinements see program values: the codec input when encoding.
        let program_value = match schema.kind() {
            SchemaKind::Transform(_) | SchemaKind::CustomType(_)
                if self.direction == Direction::Encode =>
            {
                (mode == Mode::Run).then_some(input)
            }
            _ => Some(&output),
        };
        if let Some(Err(err)) = program_value.map(|value| schema.refine_value(value)) {
            return self.fail(path, err.message());
        }
        Ok(Some(output))
    }

    /// Visit a child that is known to be present, for nodes that hand the
    /// whole value on to another schema.
    fn visit_inner(
        &mut self,
        schema: &Schema,
        input: &Value,
        path: &str,
        mode: Mode,
    ) -> Visit<Value> {
        self.visit(schema, Some(input), path, mode)
            .map(|output| output.unwrap_or(Value::Null))
    }

    fn visit_present(
        &mut self,
        schema: &Schema,
        input: &Value,
        path: &str,
        mode: Mode,
    ) -> Visit<Value> {
        match schema.kind() {
            SchemaKind::Number => self.expect(input.is_number(), "number", input, path),
            SchemaKind::String => self.expect(input.is_string(), "string", input, path),
            SchemaKind::Boolean => self.expect(input.is_boolean(), "boolean", input, path),
            SchemaKind::Any => Ok(input.clone()),
            SchemaKind::Enum(options) => {
                if options.iter().any(|option| literals_equal(option, input)) {
                    Ok(input.clone())
                } else {
                    self.fail(path, format!("expected one of {}", literal_list(options.iter())))
                }
            }
            SchemaKind::Array(items) => self.visit_array(items, input, path, mode),
            SchemaKind::Object(properties) => {
                let Some(fields) = input.as_object() else {
                    return self.fail(path, mismatch("object", input));
                };
                let mut output = Map::with_capacity(fields.len());
                let mut failed = false;
                for (key, property) in properties.iter() {
                    let child = child_key(path, key);
                    match self.visit(property, fields.get(key), &child, mode) {
                        Ok(Some(value)) => {
                            output.insert(key.clone(), value);
                        }
                        Ok(None) => {}
                        Err(Failed) => failed = true,
                    }
                }
                for (key, value) in fields {
                    if properties.contains_key(key) {
                        continue;
                    }
                    if self.config.strict_objects {
                        self.issues.push(child_key(path, key), "is not a known property");
                        failed = true;
                    } else {
                        output.insert(key.clone(), value.clone());
                    }
                }
                if failed { Err(Failed) } else { Ok(Value::Object(output)) }
            }
            SchemaKind::HashMap(values) => {
                let Some(fields) = input.as_object() else {
                    return self.fail(path, mismatch("object", input));
                };
                let mut output = Map::with_capacity(fields.len());
                let mut failed = false;
                for (key, value) in fields {
                    let child = child_key(path, key);
                    match self.visit(values, Some(value), &child, mode) {
                        Ok(value) => {
                            output.insert(key.clone(), value.unwrap_or(Value::Null));
                        }
                        Err(Failed) => failed = true,
                    }
                }
                if failed { Err(Failed) } else { Ok(Value::Object(output)) }
            }
            SchemaKind::OneOf(union) => self.visit_union(union, input, path, mode),
            SchemaKind::Lazy(lazy) => {
                let resolved = lazy.resolve();
                self.visit_inner(&resolved, input, path, mode)
            }
            SchemaKind::Transform(codec) => {
                let direction = self.direction;
                if mode == Mode::Check {
                    return self.visit_inner(codec.output_side(direction), input, path, Mode::Check);
                }
                let accepted =
                    self.visit_inner(codec.input_side(direction), input, path, Mode::Run)?;
                let output = match codec.apply(direction, &accepted) {
                    Ok(output) => output,
                    Err(err) => {
                        debug!(path = %path, direction = %direction, error = %err, "Codec failed");
                        return self.fail(path, err.message());
                    }
                };
                if self.config.verify_output {
                    self.visit_inner(codec.output_side(direction), &output, path, Mode::Check)?;
                }
                Ok(output)
            }
            SchemaKind::CustomType(custom) => match (self.direction, mode) {
                (Direction::Decode, Mode::Run) => {
                    let accepted = self.visit_inner(&custom.parent, input, path, Mode::Run)?;
                    custom.decode(&accepted).or_else(|err| {
                        debug!(
                            path = %path,
                            custom_type = %custom.name,
                            error = %err,
                            "Custom type decode failed"
                        );
                        self.fail(path, err.message())
                    })
                }
                // Decoded custom values have no schema to check against.
                (Direction::Decode, Mode::Check) => Ok(input.clone()),
                (Direction::Encode, _) => self.visit_inner(&custom.parent, input, path, mode),
            },
        }
    }

    fn expect(&mut self, ok: bool, expected: &str, input: &Value, path: &str) -> Visit<Value> {
        if ok {
            Ok(input.clone())
        } else {
            self.fail(path, mismatch(expected, input))
        }
    }

    fn visit_array(
        &mut self,
        items: &Schema,
        input: &Value,
        path: &str,
        mode: Mode,
    ) -> Visit<Value> {
        let Some(elements) = input.as_array() else {
            return self.fail(path, mismatch("array", input));
        };
        let mut output = Vec::with_capacity(elements.len());
        let mut failed = false;
        for (index, element) in elements.iter().enumerate() {
            let child = format!("{}[{}]", path, index);
            match self.visit(items, Some(element), &child, mode) {
                Ok(value) => output.push(value.unwrap_or(Value::Null)),
                Err(Failed) => failed = true,
            }
        }
        if failed { Err(Failed) } else { Ok(Value::Array(output)) }
    }

    fn visit_union(
        &mut self,
        union: &UnionSchema,
        input: &Value,
        path: &str,
        mode: Mode,
    ) -> Visit<Value> {
        if let Some(key) = union.discriminator.as_deref() {
            let Some(fields) = input.as_object() else {
                return self.fail(path, mismatch("object", input));
            };
            let tag_path = child_key(path, key);
            let expected = literal_list(union.tags().into_iter());
            let Some(tag) = fields.get(key) else {
                return self.fail(&tag_path, format!("is required; expected one of {}", expected));
            };
            let Some(branch) = union.branch_for(tag) else {
                return self.fail(&tag_path, format!("expected one of {}", expected));
            };
            return self.visit_inner(branch, input, path, mode);
        }

        for option in &union.options {
            let mut attempt = Pass::new(self.config, self.direction);
            if let Ok(output) = attempt.visit_inner(option, input, path, mode) {
                return Ok(output);
            }
        }
        self.fail(
            path,
            format!("does not match any of the {} allowed options", union.options.len()),
        )
    }
}

fn child_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &str, received: &Value) -> String {
    format!("expected {}, received {}", expected, type_name(received))
}

fn literal_list<'v>(literals: impl Iterator<Item = &'v Value>) -> String {
    let rendered: Vec<String> = literals.map(Value::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
