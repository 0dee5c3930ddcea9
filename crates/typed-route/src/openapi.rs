//! OpenAPI documentation compiler.
//!
//! [`DocCompiler`] turns schemas into OpenAPI 3.0 schema objects, and
//! [`openapi_document`] assembles a full document from a resolved
//! [`RouteMap`].
//!
//! Everything is described as it appears on the wire: transforms contribute
//! their encoded side and custom types their parent. Lazy schemas are
//! compiled once per name into `components.schemas` and referenced with
//! `$ref`, so recursive schemas terminate.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_route::{openapi_document, resolve_routes, DocumentConfig};
//!
//! let routes = resolve_routes(&mut router)?;
//! let doc = openapi_document(&routes, &DocumentConfig::new("Pets", "1.0.0"))?;
//! println!("{}", serde_json::to_string_pretty(&doc)?);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::config::DocumentConfig;
use crate::endpoint::EndpointMetadata;
use crate::error::DocumentError;
use crate::http::Method;
use crate::router::RouteMap;
use crate::schema::{Schema, SchemaKind};

/// OpenAPI version written into generated documents.
pub const OPENAPI_VERSION: &str = "3.0.0";

const JSON_MEDIA_TYPE: &str = "application/json";

// =============================================================================
// Schema objects
// =============================================================================

/// An OpenAPI 3.0 schema object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Type name (e.g., "string", "number", "object")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// For object types, the properties in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, JsonSchema>>,
    /// Required properties for object types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// For array types, the item type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    /// For maps, the value type
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<JsonSchema>>,
    /// Allowed literals
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Union options
    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<JsonSchema>>,
    /// Used to attach `nullable` or a description to a `$ref`
    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<JsonSchema>>,
    /// Discriminator of a tagged union
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<DiscriminatorObject>,
    /// Reference into `components.schemas`
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Custom type name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description of the type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the value can be null
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl JsonSchema {
    fn typed(type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            ..Self::default()
        }
    }

    /// Reference to a shared definition.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("#/components/schemas/{}", name)),
            ..Self::default()
        }
    }
}

/// OpenAPI discriminator object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscriminatorObject {
    /// Name of the tag property
    #[serde(rename = "propertyName")]
    pub property_name: String,
}

// =============================================================================
// Operation objects
// =============================================================================

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Path segment
    Path,
    /// Query string
    Query,
    /// Request header
    Header,
}

/// OpenAPI parameter object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Whether the parameter must be present
    pub required: bool,
    /// Wire schema of the parameter
    pub schema: JsonSchema,
}

/// OpenAPI media type object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema
    pub schema: JsonSchema,
}

/// OpenAPI request body object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Whether required
    pub required: bool,
    /// Content by media type
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI response object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Content by media type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI operation object for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Path, query and header parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code
    pub responses: IndexMap<String, Response>,
}

fn json_content(schema: JsonSchema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(JSON_MEDIA_TYPE.to_string(), MediaType { schema });
    content
}

// =============================================================================
// Compiler
// =============================================================================

/// Compiles schemas into OpenAPI schema objects, sharing lazy definitions.
#[derive(Debug, Default)]
pub struct DocCompiler {
    definitions: IndexMap<String, JsonSchema>,
    in_progress: HashSet<String>,
}

impl DocCompiler {
    /// Create a compiler with an empty definition registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Definitions collected so far, keyed by lazy name.
    pub fn definitions(&self) -> &IndexMap<String, JsonSchema> {
        &self.definitions
    }

    /// Consume the compiler, returning its definitions.
    pub fn into_definitions(self) -> IndexMap<String, JsonSchema> {
        self.definitions
    }

    /// Compile a schema as it appears on the wire.
    pub fn compile(&mut self, schema: &Schema) -> JsonSchema {
        let mut compiled = self.compile_kind(schema);
        let description = wire_description(schema).map(str::to_string);

        if compiled.reference.is_some() {
            // `$ref` cannot carry siblings in OpenAPI 3.0.
            if schema.is_required() && description.is_none() {
                return compiled;
            }
            compiled = JsonSchema {
                all_of: Some(vec![compiled]),
                ..JsonSchema::default()
            };
        }

        if description.is_some() {
            compiled.description = description;
        }
        compiled.nullable = !schema.is_required();
        compiled
    }

    fn compile_kind(&mut self, schema: &Schema) -> JsonSchema {
        match schema.kind() {
            SchemaKind::Number => JsonSchema::typed("number"),
            SchemaKind::String => JsonSchema::typed("string"),
            SchemaKind::Boolean => JsonSchema::typed("boolean"),
            SchemaKind::Any => JsonSchema::default(),
            SchemaKind::Enum(options) => JsonSchema {
                type_name: literal_type(options).map(str::to_string),
                enum_values: Some(options.to_vec()),
                ..JsonSchema::default()
            },
            SchemaKind::OneOf(union) => JsonSchema {
                one_of: Some(union.options.iter().map(|option| self.compile(option)).collect()),
                discriminator: union.discriminator.clone().map(|property_name| {
                    DiscriminatorObject { property_name }
                }),
                ..JsonSchema::default()
            },
            SchemaKind::Array(items) => JsonSchema {
                items: Some(Box::new(self.compile(items))),
                ..JsonSchema::typed("array")
            },
            SchemaKind::Object(properties) => {
                let mut compiled = IndexMap::with_capacity(properties.len());
                let mut required = Vec::new();
                for (name, property) in properties.iter() {
                    if property.is_required() {
                        required.push(name.clone());
                    }
                    compiled.insert(name.clone(), self.compile(property));
                }
                JsonSchema {
                    properties: Some(compiled),
                    required,
                    ..JsonSchema::typed("object")
                }
            }
            SchemaKind::HashMap(values) => JsonSchema {
                additional_properties: Some(Box::new(self.compile(values))),
                ..JsonSchema::typed("object")
            },
            SchemaKind::Lazy(lazy) => {
                let name = lazy.name();
                if !self.definitions.contains_key(name)
                    && self.in_progress.insert(name.to_string())
                {
                    trace!(definition = %name, "Compiling lazy definition");
                    let definition = self.compile(&lazy.resolve());
                    self.in_progress.remove(name);
                    self.definitions.insert(name.to_string(), definition);
                }
                JsonSchema::reference(name)
            }
            SchemaKind::Transform(codec) => self.compile_kind(&codec.encoded),
            SchemaKind::CustomType(custom) => JsonSchema {
                title: Some(custom.name.clone()),
                ..self.compile_kind(&custom.parent)
            },
        }
    }

    /// Compile the operation object of one endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if a params, query or headers schema is not
    /// an object.
    pub fn compile_operation(
        &mut self,
        template: &str,
        method: Method,
        metadata: &EndpointMetadata,
    ) -> Result<Operation, DocumentError> {
        let mut parameters = Vec::new();
        let sections = [
            (ParameterLocation::Path, "params", &metadata.params),
            (ParameterLocation::Query, "query", &metadata.query),
            (ParameterLocation::Header, "headers", &metadata.headers),
        ];
        for (location, section, schema) in sections {
            let Some(schema) = schema else { continue };
            let properties = schema.properties().ok_or_else(|| DocumentError {
                template: template.to_string(),
                method,
                reason: format!(
                    "{} schema must be an object, found {}",
                    section,
                    schema.kind().name()
                ),
            })?;
            for (name, property) in properties.iter() {
                parameters.push(Parameter {
                    name: name.clone(),
                    location,
                    required: property.is_required(),
                    schema: self.compile(property),
                });
            }
        }

        let request_body = metadata.body.as_ref().map(|body| RequestBody {
            required: body.is_required(),
            content: json_content(self.compile(body)),
        });

        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
                content: metadata
                    .response
                    .as_ref()
                    .map(|response| json_content(self.compile(response))),
            },
        );

        Ok(Operation {
            parameters,
            request_body,
            responses,
        })
    }
}

/// A node's own description, else the one on its wire side.
fn wire_description(schema: &Schema) -> Option<&str> {
    schema.description().or_else(|| match schema.kind() {
        SchemaKind::Transform(codec) => wire_description(&codec.encoded),
        SchemaKind::CustomType(custom) => wire_description(&custom.parent),
        _ => None,
    })
}

fn literal_type(options: &[Value]) -> Option<&'static str> {
    let first = options.first()?;
    let name = match first {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        _ => return None,
    };
    let same = options.iter().all(|option| {
        matches!(
            (first, option),
            (Value::String(_), Value::String(_))
                | (Value::Number(_), Value::Number(_))
                | (Value::Bool(_), Value::Bool(_))
        )
    });
    same.then_some(name)
}

// =============================================================================
// Document
// =============================================================================

/// OpenAPI info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// API version
    pub version: String,
}

/// OpenAPI server object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Server URL
    pub url: String,
}

/// OpenAPI components object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    /// Shared definitions
    #[serde(default)]
    pub schemas: IndexMap<String, JsonSchema>,
}

/// A complete OpenAPI document, before overrides are merged in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// Servers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Operations by path template and lower-case method
    pub paths: IndexMap<String, IndexMap<String, Operation>>,
    /// Shared definitions
    pub components: Components,
}

impl OpenApiDocument {
    /// Build the document for every route in `routes`.
    ///
    /// # Errors
    ///
    /// Returns the first [`DocumentError`] raised by an endpoint.
    pub fn build(routes: &RouteMap, config: &DocumentConfig) -> Result<Self, DocumentError> {
        let mut compiler = DocCompiler::new();
        let mut paths: IndexMap<String, IndexMap<String, Operation>> = IndexMap::new();

        for (template, method, metadata) in routes.iter() {
            let operation = compiler.compile_operation(template, method, metadata)?;
            paths
                .entry(openapi_path(template))
                .or_default()
                .insert(method.as_lowercase().to_string(), operation);
        }

        let schemas = compiler.into_definitions();
        debug!(
            paths = paths.len(),
            definitions = schemas.len(),
            "Built OpenAPI document"
        );

        Ok(Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: config.title.clone(),
                description: config.description.clone(),
                version: config.version.clone(),
            },
            servers: config
                .servers
                .iter()
                .map(|url| Server { url: url.clone() })
                .collect(),
            paths,
            components: Components { schemas },
        })
    }

    /// Convert to a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Build the OpenAPI document for `routes` and merge `config.overrides` into
/// it. Override values win at any depth.
///
/// # Errors
///
/// Returns [`DocumentError`] if an endpoint's params, query or headers schema
/// is not an object.
pub fn openapi_document(
    routes: &RouteMap,
    config: &DocumentConfig,
) -> Result<Value, DocumentError> {
    let mut document = OpenApiDocument::build(routes, config)?.to_value();
    if config.overrides.is_object() {
        deep_merge(&mut document, config.overrides.clone());
    }
    Ok(document)
}

/// Rewrite `/users/:id` as `/users/{id}`.
pub fn openapi_path(template: &str) -> String {
    let segments: Vec<String> = template
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name.trim_end_matches('?')),
            None => segment.to_string(),
        })
        .collect();
    segments.join("/")
}

/// Merge `overrides` into `base`. Objects merge key by key; anything else in
/// `overrides` replaces the value in `base`.
pub fn deep_merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}
