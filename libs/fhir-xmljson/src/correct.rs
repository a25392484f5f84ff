//! Second pass: cardinality repair and resource wrapper rewriting
//!
//! The normalizer decides cardinality by child name only. This pass knows the
//! parent field name of every value and fixes what that reveals: scalar
//! fields wrapped in a one-element list, repeating fields left bare, and the
//! `{ TypeName: {...} }` resource wrapper of the XML form.

use serde_json::{Map, Value};
use tracing::debug;

use crate::tables::{
    is_array_element, is_namespace_declaration, is_scalar_element, TEXT_KEY, VALUE_ATTRIBUTE_KEY,
    XHTML_NS,
};
use crate::wrapper::{merge_wrapper, resolve_wrapper, split_wrapper};

/// Correct a value found under `hint` (`None` for the root).
pub fn correct(value: Value, hint: Option<&str>) -> Value {
    match value {
        Value::Array(items) => correct_list(items, hint, true),
        Value::Object(map) => correct_map(map),
        other => other,
    }
}

/// Only the outermost list under a field collapses; nested lists keep their
/// shape.
fn correct_list(items: Vec<Value>, hint: Option<&str>, outer: bool) -> Value {
    let mut items: Vec<Value> = items
        .into_iter()
        .map(|item| match item {
            Value::Array(inner) => correct_list(inner, hint, false),
            other => correct(other, hint),
        })
        .collect();
    if !outer || items.len() != 1 || !hint.is_some_and(is_scalar_element) {
        return Value::Array(items);
    }

    match items.remove(0) {
        Value::Object(map) if hint == Some("resource") => {
            Value::Object(resolve_wrapper(&map).unwrap_or(map))
        }
        single => single,
    }
}

fn correct_map(map: Map<String, Value>) -> Value {
    if is_marker_shape(&map) {
        return unwrap_value(Value::Object(map));
    }

    match split_wrapper(map) {
        Ok((resource_type, content)) => {
            debug!(resource_type = %resource_type, "rewriting resource wrapper");
            Value::Object(merge_wrapper(resource_type, correct_fields(content)))
        }
        Err(map) => Value::Object(correct_fields(map)),
    }
}

/// Correct every field of a map, dropping namespace declarations.
pub(crate) fn correct_fields(map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        if is_namespace_declaration(&key) {
            continue;
        }
        let corrected = if key == "div" {
            narrative_div(value)
        } else {
            patch_field(&key, correct(value, Some(&key)))
        };
        out.insert(key, corrected);
    }
    out
}

fn patch_field(key: &str, value: Value) -> Value {
    match (key, value) {
        ("given" | "profile" | "tag" | "line", text @ Value::String(_)) => Value::Array(vec![text]),
        (
            "coding" | "category" | "component" | "interpretation" | "referenceRange"
            | "qualification",
            map @ Value::Object(_),
        ) => Value::Array(vec![map]),
        (_, Value::Null) => Value::Null,
        (key, single) if is_array_element(key) && !single.is_array() => Value::Array(vec![single]),
        (_, value) => value,
    }
}

/// `Narrative.div` must be an XHTML string.
fn narrative_div(value: Value) -> Value {
    if let Value::Object(map) = &value {
        if map.len() <= 2 {
            let text = map
                .get("value")
                .or_else(|| map.get(TEXT_KEY))
                .and_then(Value::as_str);
            if let Some(text) = text {
                return Value::String(div_markup(text));
            }
        }
    }

    match correct(value, Some("div")) {
        Value::String(text) => Value::String(div_markup(&text)),
        other => other,
    }
}

fn div_markup(text: &str) -> String {
    if text.trim_start().starts_with('<') {
        text.to_string()
    } else {
        format!(
            r#"<div xmlns="{XHTML_NS}">{}</div>"#,
            html_escape::encode_text(text)
        )
    }
}

fn is_marker_shape(map: &Map<String, Value>) -> bool {
    map.len() == 1
        && map
            .keys()
            .all(|key| key == VALUE_ATTRIBUTE_KEY || key == TEXT_KEY)
}

/// Collapse `{"@value": x}` / `{"#text": x}` to `x`.
pub(crate) fn unwrap_value(value: Value) -> Value {
    match value {
        Value::Object(map) if is_marker_shape(&map) => {
            map.into_iter().map(|(_, v)| v).next().unwrap_or_default()
        }
        other => other,
    }
}
