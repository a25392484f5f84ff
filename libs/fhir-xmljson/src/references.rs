//! Reference resolution for `urn:uuid:` placeholders
//!
//! Transaction Bundles link entries through `fullUrl` placeholders
//! (`urn:uuid:...`). Once an entry has been created on a server its
//! placeholder can be swapped for the server's `Type/id` reference.

use std::collections::HashMap;

use serde_json::Value;

use crate::tables::RESOURCE_TYPE_KEY;

pub const UUID_PREFIX: &str = "urn:uuid:";

const REFERENCE_KEY: &str = "reference";
const HISTORY_SEGMENT: &str = "_history";

/// Rewrite every `reference` field holding a known `urn:uuid:` placeholder,
/// in place. Unknown placeholders and other references are left alone.
/// Returns the number of references rewritten.
pub fn resolve_references_in(value: &mut Value, resolved: &HashMap<String, String>) -> usize {
    match value {
        Value::Object(map) => {
            let mut count = 0;
            for (key, field) in map.iter_mut() {
                if key == REFERENCE_KEY {
                    if let Value::String(reference) = &mut *field {
                        if reference.starts_with(UUID_PREFIX) {
                            if let Some(target) = resolved.get(reference.as_str()) {
                                *reference = target.clone();
                                count += 1;
                            }
                            continue;
                        }
                    }
                }
                count += resolve_references_in(field, resolved);
            }
            count
        }
        Value::Array(items) => items
            .iter_mut()
            .map(|item| resolve_references_in(item, resolved))
            .sum(),
        _ => 0,
    }
}

/// Copying variant of [`resolve_references_in`].
pub fn resolve_references(value: &Value, resolved: &HashMap<String, String>) -> Value {
    let mut copy = value.clone();
    resolve_references_in(&mut copy, resolved);
    copy
}

/// `Type/id` from a `Location` header or response location.
///
/// Accepts absolute URLs (`https://host/fhir/Patient/1/_history/2`) and
/// relative paths (`Patient/1`). A bare id is qualified with `resource_type`.
pub fn reference_from_location(location: &str, resource_type: Option<&str>) -> Option<String> {
    let path = location
        .trim()
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(pos) = segments.iter().position(|s| *s == HISTORY_SEGMENT) {
        segments.truncate(pos);
    }

    match segments.as_slice() {
        [.., rt, id] => Some(format!("{rt}/{id}")),
        [id] => resource_type
            .filter(|rt| !rt.is_empty())
            .map(|rt| format!("{rt}/{id}")),
        [] => None,
    }
}

/// Reference to the created resource from a transaction-response body:
/// the first entry's `response.location`, else its `resource.id`.
pub fn reference_from_response(body: &Value, resource_type: Option<&str>) -> Option<String> {
    if body.get(RESOURCE_TYPE_KEY).and_then(Value::as_str) != Some("Bundle") {
        return None;
    }
    let entry = body.get("entry")?.as_array()?.first()?;

    let from_location = entry
        .get("response")
        .and_then(|response| response.get("location"))
        .and_then(Value::as_str)
        .and_then(|location| reference_from_location(location, resource_type));
    if from_location.is_some() {
        return from_location;
    }

    let resource = entry.get("resource")?;
    let id = resource.get("id").and_then(Value::as_str)?;
    let rt = resource
        .get(RESOURCE_TYPE_KEY)
        .and_then(Value::as_str)
        .or(resource_type)?;
    Some(format!("{rt}/{id}"))
}
