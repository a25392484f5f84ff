//! Default narrative injection
//!
//! DomainResources must carry a `text` narrative. Resources converted from
//! XML often lack one, so a minimal generated narrative is added.

use serde_json::{json, Map, Value};

use crate::tables::{is_narrative_exempt, NARRATIVE_KEY, RESOURCE_TYPE_KEY};

pub const DEFAULT_NARRATIVE_DIV: &str =
    r#"<div xmlns="http://www.w3.org/1999/xhtml">No narrative</div>"#;

/// Fields that stay ahead of an injected narrative.
const LEADING_FIELDS: &[&str] = &["resourceType", "id", "meta", "implicitRules", "language"];

/// Add a default narrative to every typed resource in `value` that needs one.
///
/// Walks the whole tree, so resources nested in `entry[].resource`,
/// `contained` or `Parameters.parameter[].resource` are covered as well.
/// Bundle, Parameters and Binary never receive a narrative. Resources that
/// already have `text` are left as they are, which makes this idempotent.
pub fn ensure_narrative(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(ensure_narrative).collect()),
        Value::Object(map) => Value::Object(ensure_in_map(map)),
        other => other.clone(),
    }
}

pub fn default_narrative() -> Value {
    json!({
        "status": "generated",
        "div": DEFAULT_NARRATIVE_DIV,
    })
}

pub fn needs_narrative(map: &Map<String, Value>) -> bool {
    let Some(resource_type) = map.get(RESOURCE_TYPE_KEY).and_then(Value::as_str) else {
        return false;
    };
    !is_narrative_exempt(resource_type) && !map.contains_key(NARRATIVE_KEY)
}

fn ensure_in_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len() + 1);
    let mut pending = needs_narrative(map);

    for (key, value) in map {
        if pending && !LEADING_FIELDS.contains(&key.as_str()) {
            out.insert(NARRATIVE_KEY.to_string(), default_narrative());
            pending = false;
        }
        let walked = match value {
            Value::Object(_) | Value::Array(_) => ensure_narrative(value),
            scalar => scalar.clone(),
        };
        out.insert(key.clone(), walked);
    }

    if pending {
        out.insert(NARRATIVE_KEY.to_string(), default_narrative());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_narrative_after_leading_fields() {
        let out = ensure_narrative(&json!({
            "resourceType": "Patient",
            "id": "p1",
            "meta": {"versionId": "1"},
            "active": true
        }));
        let keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["resourceType", "id", "meta", "text", "active"]);
        assert_eq!(out["text"]["status"], "generated");
        assert_eq!(out["text"]["div"], DEFAULT_NARRATIVE_DIV);
    }

    #[test]
    fn appends_when_only_leading_fields() {
        let out = ensure_narrative(&json!({"resourceType": "Observation"}));
        assert_eq!(out, json!({"resourceType": "Observation", "text": default_narrative()}));
    }

    #[test]
    fn keeps_existing_narrative() {
        let input = json!({
            "resourceType": "Patient",
            "text": {"status": "additional", "div": "<div>x</div>"}
        });
        assert_eq!(ensure_narrative(&input), input);
    }

    #[test]
    fn exempt_types_get_nothing() {
        for rt in ["Bundle", "Parameters", "Binary"] {
            let input = json!({"resourceType": rt, "id": "x"});
            assert_eq!(ensure_narrative(&input), input);
        }
    }

    #[test]
    fn walks_bundle_entries_and_contained() {
        let out = ensure_narrative(&json!({
            "resourceType": "Bundle",
            "type": "transaction",
            "entry": [
                {"fullUrl": "urn:uuid:1", "resource": {"resourceType": "Patient", "id": "1"}},
                {"resource": {
                    "resourceType": "Observation",
                    "contained": [{"resourceType": "Medication", "id": "m"}]
                }}
            ]
        }));
        assert!(out.get("text").is_none());
        assert_eq!(out["entry"][0]["resource"]["text"], default_narrative());
        assert_eq!(out["entry"][1]["resource"]["text"], default_narrative());
        assert_eq!(
            out["entry"][1]["resource"]["contained"][0]["text"],
            default_narrative()
        );
        assert!(out["entry"][0].get("text").is_none());
    }

    #[test]
    fn untyped_maps_are_untouched() {
        let input = json!({"name": [{"family": "Doe"}], "n": 1});
        assert_eq!(ensure_narrative(&input), input);
    }

    #[test]
    fn injection_is_idempotent() {
        let input = json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Condition", "id": "c"}}]
        });
        let once = ensure_narrative(&input);
        assert_eq!(ensure_narrative(&once), once);
    }
}
