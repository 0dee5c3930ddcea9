//! TypeScript type rendering.
//!
//! [`TypeRenderer`] renders schemas as TypeScript type expressions. Lazy
//! schemas become named type aliases, collected once per name, so recursive
//! schemas render as recursive aliases.
//!
//! # Type Mappings
//!
//! | Schema | TypeScript |
//! |--------|------------|
//! | `number()` | `number` |
//! | `string()` | `string` |
//! | `boolean()` | `boolean` |
//! | `any()` | `any` |
//! | `enum_of(["a", "b"])` | `"a" \| "b"` |
//! | `one_of([A, B])` | `A \| B` |
//! | `array(T)` | `T[]` |
//! | `object([("a", T)])` | `{ a: T }` |
//! | `hash_map(T)` | `Record<string, T>` |
//! | `lazy("Name", ..)` | `Name` |
//! | nullable `T` | `T \| null` |
//!
//! Transforms render one side depending on [`RenderConfig::direction`]:
//! `Encode` renders what goes on the wire, `Decode` what handlers see.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::router::RouteMap;
use crate::schema::{Direction, Schema, SchemaKind};

/// Configuration for TypeScript rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Indentation unit for multi-line output (default: two spaces)
    pub indent: String,
    /// Which side of each codec to render (default: `Encode`, the wire side)
    pub direction: Direction,
    /// Prefix declarations with `export` (default: true)
    pub export_types: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            direction: Direction::Encode,
            export_types: true,
        }
    }
}

impl RenderConfig {
    /// Create a new render config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the indentation unit.
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Set which side of each codec to render.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set whether declarations are exported.
    pub fn with_export_types(mut self, export: bool) -> Self {
        self.export_types = export;
        self
    }
}

/// A rendered type and whether it is a top-level union.
struct Rendered {
    text: String,
    union: bool,
}

impl Rendered {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            union: false,
        }
    }

    fn union(parts: Vec<String>) -> Self {
        match parts.len() {
            0 => Self::plain("never"),
            1 => Self::plain(parts.into_iter().collect::<String>()),
            _ => Self {
                text: parts.join(" | "),
                union: true,
            },
        }
    }
}

/// Renders schemas as TypeScript types.
#[derive(Debug, Default)]
pub struct TypeRenderer {
    config: RenderConfig,
    declarations: IndexMap<String, String>,
    in_progress: HashSet<String>,
}

impl TypeRenderer {
    /// Create a renderer.
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            declarations: IndexMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Render a schema as a type expression.
    pub fn render(&mut self, schema: &Schema) -> String {
        self.render_node(schema).text
    }

    /// Named declarations collected so far, keyed by lazy name.
    pub fn declarations(&self) -> &IndexMap<String, String> {
        &self.declarations
    }

    /// Render every collected declaration as `type Name = ...;` statements.
    pub fn declarations_source(&self) -> String {
        let export = if self.config.export_types { "export " } else { "" };
        let mut out = String::new();
        for (name, body) in &self.declarations {
            out.push_str(&format!("{}type {} = {};\n", export, name, body));
        }
        out
    }

    fn render_node(&mut self, schema: &Schema) -> Rendered {
        let rendered = self.render_kind(schema.kind());
        if schema.is_required() || matches!(schema.kind(), SchemaKind::Any) {
            return rendered;
        }
        Rendered::union(vec![rendered.text, "null".to_string()])
    }

    fn render_kind(&mut self, kind: &SchemaKind) -> Rendered {
        match kind {
            SchemaKind::Number => Rendered::plain("number"),
            SchemaKind::String => Rendered::plain("string"),
            SchemaKind::Boolean => Rendered::plain("boolean"),
            SchemaKind::Any => Rendered::plain("any"),
            SchemaKind::Enum(options) => {
                Rendered::union(options.iter().map(Value::to_string).collect())
            }
            SchemaKind::OneOf(union) => {
                let parts = union
                    .options
                    .iter()
                    .map(|option| self.render(option))
                    .collect();
                Rendered::union(parts)
            }
            SchemaKind::Array(items) => {
                let item = self.render_node(items);
                if item.union {
                    Rendered::plain(format!("({})[]", item.text))
                } else {
                    Rendered::plain(format!("{}[]", item.text))
                }
            }
            SchemaKind::Object(properties) => {
                if properties.is_empty() {
                    return Rendered::plain("{}");
                }
                let members: Vec<String> = properties
                    .iter()
                    .map(|(name, property)| self.member(name, property))
                    .collect();
                Rendered::plain(format!("{{ {} }}", members.join("; ")))
            }
            SchemaKind::HashMap(values) => {
                Rendered::plain(format!("Record<string, {}>", self.render(values)))
            }
            SchemaKind::Lazy(lazy) => {
                let name = lazy.name();
                if !self.declarations.contains_key(name)
                    && self.in_progress.insert(name.to_string())
                {
                    let body = self.render(&lazy.resolve());
                    self.in_progress.remove(name);
                    self.declarations.insert(name.to_string(), body);
                }
                Rendered::plain(name)
            }
            SchemaKind::Transform(codec) => {
                let side = match self.config.direction {
                    Direction::Decode => &codec.decoded,
                    Direction::Encode => &codec.encoded,
                };
                self.render_kind(side.kind())
            }
            SchemaKind::CustomType(custom) => match self.config.direction {
                Direction::Encode => self.render_kind(custom.parent.kind()),
                Direction::Decode => Rendered::plain("unknown"),
            },
        }
    }

    fn member(&mut self, name: &str, property: &Schema) -> String {
        let doc = property
            .description()
            .map(|text| format!("/** {} */ ", text))
            .unwrap_or_default();
        let marker = if property.is_required() { "" } else { "?" };
        format!("{}{}{}: {}", doc, property_key(name), marker, self.render(property))
    }
}

/// Quote a property name unless it is a plain identifier.
fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if identifier {
        name.to_string()
    } else {
        Value::String(name.to_string()).to_string()
    }
}

/// Render a TypeScript module describing every route.
///
/// The module holds a declaration per lazy definition and an interface
/// `Routes` with one entry per `"METHOD /template"`, whose members are the
/// endpoint's `params`, `query`, `headers`, `body` and `response` types.
/// Sections an endpoint does not declare are left out.
pub fn render_bindings(routes: &RouteMap, config: &RenderConfig) -> String {
    let mut renderer = TypeRenderer::new(config.clone());
    let indent = &config.indent;
    let mut entries = String::new();

    for (template, method, metadata) in routes.iter() {
        let key = Value::String(format!("{} {}", method, template)).to_string();
        entries.push_str(&format!("{}{}: {{\n", indent, key));
        let sections = [
            ("params", &metadata.params),
            ("query", &metadata.query),
            ("headers", &metadata.headers),
            ("body", &metadata.body),
            ("response", &metadata.response),
        ];
        for (section, schema) in sections {
            if let Some(schema) = schema {
                let rendered = renderer.render(schema);
                entries.push_str(&format!("{}{}{}: {};\n", indent, indent, section, rendered));
            }
        }
        entries.push_str(&format!("{}}};\n", indent));
    }

    let export = if config.export_types { "export " } else { "" };
    let mut out = renderer.declarations_source();
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("{}interface Routes {{\n{}}}\n", export, entries));

    debug!(
        routes = routes.len(),
        declarations = renderer.declarations().len(),
        "Rendered TypeScript bindings"
    );
    out
}
