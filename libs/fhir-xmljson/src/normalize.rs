//! First pass: parsed XML tree to JSON-shaped values
//!
//! Decisions here are local to one element. Anything that depends on the
//! parent field name is left to [`crate::correct`].

use serde_json::{Map, Value};
use tracing::trace;

use crate::correct::unwrap_value;
use crate::node::{XmlKey, XmlNode};
use crate::tables::is_array_element;

/// Convert a parsed XML node found under `hint` (`None` for the root).
///
/// Returns `None` for empty elements so the caller can omit the field.
pub fn normalize(node: &XmlNode, hint: Option<&str>) -> Option<Value> {
    if node.is_empty() {
        return None;
    }

    match node {
        XmlNode::Empty => None,
        XmlNode::Text(text) => Some(Value::String(text.clone())),
        // never flattened, even when every item is dropped
        XmlNode::List(items) => Some(Value::Array(
            items.iter().filter_map(|item| normalize(item, hint)).collect(),
        )),
        XmlNode::Element(entries) => Some(normalize_element(entries, hint)),
    }
}

fn normalize_element(entries: &[(XmlKey, XmlNode)], hint: Option<&str>) -> Value {
    // <family value="Doe"/> and <note>text</note> collapse to the bare value
    if let [(key, value)] = entries {
        if matches!(key, XmlKey::Text) || key.is_value_attribute() {
            return scalar(value);
        }
    }

    let mut out = Map::with_capacity(entries.len());
    for (key, value) in entries {
        match key {
            XmlKey::Attribute(name) => {
                out.insert(name.clone(), scalar(value));
            }
            XmlKey::Text => {
                out.insert("value".to_string(), scalar(value));
            }
            XmlKey::Child(name) => {
                let Some(converted) = normalize(value, Some(name)) else {
                    trace!(element = %name, parent = hint.unwrap_or("<root>"), "dropping empty element");
                    continue;
                };
                let converted = match unwrap_value(converted) {
                    list @ Value::Array(_) => list,
                    single if is_array_element(name) => Value::Array(vec![single]),
                    single => single,
                };
                out.insert(name.clone(), converted);
            }
        }
    }

    Value::Object(out)
}

/// Attribute and text values are copied verbatim.
fn scalar(node: &XmlNode) -> Value {
    match node {
        XmlNode::Text(text) => Value::String(text.clone()),
        XmlNode::Empty => Value::String(String::new()),
        other => normalize(other, None).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(input: Value, hint: Option<&str>) -> Option<Value> {
        normalize(&XmlNode::from(&input), hint)
    }

    #[test]
    fn empty_nodes_produce_nothing() {
        assert_eq!(run(json!(null), Some("active")), None);
        assert_eq!(run(json!({}), Some("active")), None);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(run(json!("x"), None), Some(json!("x")));
    }

    #[test]
    fn value_attribute_and_text_collapse() {
        assert_eq!(run(json!({"@value": "Doe"}), Some("family")), Some(json!("Doe")));
        assert_eq!(run(json!({"#text": "hi"}), Some("note")), Some(json!("hi")));
    }

    #[test]
    fn attributes_lose_their_marker_and_text_becomes_value() {
        let out = run(json!({"@id": "a1", "@url": "http://x", "#text": "t"}), None).unwrap();
        assert_eq!(out, json!({"id": "a1", "url": "http://x", "value": "t"}));
    }

    #[test]
    fn lists_drop_empty_items_but_are_not_flattened() {
        let out = run(json!([{"@value": "a"}, null, {"@value": "b"}]), Some("given")).unwrap();
        assert_eq!(out, json!(["a", "b"]));

        let out = run(json!({"given": [null]}), None).unwrap();
        assert_eq!(out, json!({"given": []}));
    }

    #[test]
    fn array_elements_are_wrapped_by_their_own_name() {
        let out = run(
            json!({
                "identifier": {"system": {"@value": "urn:x"}, "value": {"@value": "1"}},
                "gender": {"@value": "female"}
            }),
            Some("Patient"),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({
                "identifier": [{"system": "urn:x", "value": "1"}],
                "gender": "female"
            })
        );
    }

    #[test]
    fn empty_children_are_dropped() {
        let out = run(json!({"active": null, "gender": {"@value": "male"}}), None).unwrap();
        assert_eq!(out, json!({"gender": "male"}));
    }

    #[test]
    fn subject_name_keeps_family_scalar() {
        let out = run(
            json!({"name": {"given": {"@value": "Jane"}, "family": {"@value": "Doe"}}}),
            Some("Patient"),
        )
        .unwrap();
        assert_eq!(out, json!({"name": [{"given": "Jane", "family": "Doe"}]}));
    }
}
