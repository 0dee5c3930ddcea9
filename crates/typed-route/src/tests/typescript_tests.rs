//! Tests for the TypeScript renderer

use crate::endpoint::EndpointMetadata;
use crate::error::CodecError;
use crate::http::Method;
use crate::router::RouteMap;
use crate::schema::builders::*;
use crate::schema::{Direction, Schema};
use crate::typescript::{RenderConfig, TypeRenderer, render_bindings};
use serde_json::{Value, json};
use std::sync::Arc;

fn render(schema: &Schema) -> String {
    TypeRenderer::new(RenderConfig::default()).render(schema)
}

fn render_decoded(schema: &Schema) -> String {
    TypeRenderer::new(RenderConfig::new().with_direction(Direction::Decode)).render(schema)
}

// =============================================================================
// Type expressions
// =============================================================================

#[test]
fn test_scalars() {
    assert_eq!(render(&number()), "number");
    assert_eq!(render(&null_string()), "string | null");
    assert_eq!(render(&boolean()), "boolean");
    assert_eq!(render(&null_any()), "any");
}

#[test]
fn test_enums_render_as_literal_unions() {
    assert_eq!(render(&enum_of([json!("a"), json!(1), json!(true)])), r#""a" | 1 | true"#);
    assert_eq!(render(&enum_of(Vec::<Value>::new())), "never");
    assert_eq!(render(&literal("only")), r#""only""#);
}

#[test]
fn test_arrays_parenthesize_unions() {
    assert_eq!(render(&array(string())), "string[]");
    assert_eq!(render(&array(null_number())), "(number | null)[]");
    assert_eq!(render(&array(one_of([number(), string()]))), "(number | string)[]");
    assert_eq!(render(&null_array(number())), "number[] | null");
}

#[test]
fn test_objects() {
    let schema = object([
        ("id", number()),
        ("nickname", null_string().describe("Display name")),
        ("content-type", string()),
    ]);
    assert_eq!(
        render(&schema),
        r#"{ id: number; /** Display name */ nickname?: string | null; "content-type": string }"#
    );
    assert_eq!(render(&object(Vec::<(String, Schema)>::new())), "{}");
    assert_eq!(render(&hash_map(boolean())), "Record<string, boolean>");
}

#[test]
fn test_transform_renders_side_per_direction() {
    let schema = object([("id", cast_number()), ("flag", null_cast_boolean())]);
    assert_eq!(render(&schema), "{ id: string; flag?: string | null }");
    assert_eq!(render_decoded(&schema), "{ id: number; flag?: boolean | null }");
}

#[test]
fn test_custom_type_renders_parent_on_wire() {
    let schema = custom_type("Date", string(), |value: &Value| {
        Ok::<_, CodecError>(value.clone())
    })
    .unwrap();
    assert_eq!(render(&schema), "string");
    assert_eq!(render_decoded(&schema), "unknown");
}

#[test]
fn test_lazy_collects_named_declaration() {
    fn tree() -> Schema {
        object([("value", number()), ("children", array(lazy("Tree", tree)))])
    }

    let mut renderer = TypeRenderer::new(RenderConfig::default());
    assert_eq!(renderer.render(&null_lazy("Tree", tree)), "Tree | null");
    assert_eq!(
        renderer.declarations().get("Tree").map(String::as_str),
        Some("{ value: number; children: Tree[] }")
    );
    assert_eq!(
        renderer.declarations_source(),
        "export type Tree = { value: number; children: Tree[] };\n"
    );
}

// =============================================================================
// Bindings
// =============================================================================

#[test]
fn test_render_bindings() {
    let mut routes = RouteMap::new();
    routes.insert(
        "/users/:id",
        Method::Post,
        Arc::new(EndpointMetadata {
            params: Some(object([("id", cast_number())])),
            body: Some(object([("name", string())])),
            response: Some(object([("id", number()), ("name", string())])),
            ..EndpointMetadata::default()
        }),
    );

    let expected = concat!(
        "export interface Routes {\n",
        "  \"POST /users/:id\": {\n",
        "    params: { id: string };\n",
        "    body: { name: string };\n",
        "    response: { id: number; name: string };\n",
        "  };\n",
        "}\n",
    );
    assert_eq!(render_bindings(&routes, &RenderConfig::default()), expected);
}

#[test]
fn test_render_bindings_with_declarations_and_no_export() {
    fn node() -> Schema {
        object([("next", null_lazy("Node", node))])
    }

    let mut routes = RouteMap::new();
    routes.insert(
        "/nodes",
        Method::Get,
        Arc::new(EndpointMetadata {
            response: Some(lazy("Node", node)),
            ..EndpointMetadata::default()
        }),
    );

    let config = RenderConfig::new().with_export_types(false).with_indent("\t");
    let expected = concat!(
        "type Node = { next?: Node | null };\n",
        "\n",
        "interface Routes {\n",
        "\t\"GET /nodes\": {\n",
        "\t\tresponse: Node;\n",
        "\t};\n",
        "}\n",
    );
    assert_eq!(render_bindings(&routes, &config), expected);
}
