//! Resource wrapper resolution
//!
//! FHIR XML names the element after the resource type (`<Patient>...`), which
//! a dict-shaped tree turns into `{"Patient": {...}}`. FHIR JSON instead tags
//! the object with `resourceType`. Only known resource type names count as
//! wrappers, so capitalized element names that are not resource types are
//! never rewritten.

use serde_json::{Map, Value};

use crate::correct::correct_fields;
use crate::tables::{is_resource_type, ATTRIBUTE_MARKER, RESOURCE_TYPE_KEY};

/// Resource type of a `{ TypeName: content }` wrapper, if `map` is one.
///
/// Content must be an object, or a list holding exactly one object.
pub fn wrapped_type(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    let (key, content) = map.iter().next()?;
    if !is_type_name(key) {
        return None;
    }
    match content {
        Value::Object(_) => Some(key.as_str()),
        Value::Array(items) if items.len() == 1 && items[0].is_object() => Some(key.as_str()),
        _ => None,
    }
}

/// Rewrite `{ TypeName: content }` into `{ resourceType: TypeName, ...content }`
/// with the content corrected. `None` means `map` is not a wrapper.
pub fn resolve_wrapper(map: &Map<String, Value>) -> Option<Map<String, Value>> {
    wrapped_type(map)?;
    let (resource_type, content) = split_wrapper(map.clone()).ok()?;
    Some(merge_wrapper(resource_type, correct_fields(content)))
}

/// Take a wrapper apart, handing the map back untouched when it is not one.
pub(crate) fn split_wrapper(
    map: Map<String, Value>,
) -> Result<(String, Map<String, Value>), Map<String, Value>> {
    if wrapped_type(&map).is_none() {
        return Err(map);
    }

    let Some((resource_type, content)) = map.into_iter().next() else {
        return Err(Map::new());
    };
    match into_content(content) {
        Ok(content) => Ok((resource_type, content)),
        Err(content) => {
            let mut map = Map::new();
            map.insert(resource_type, content);
            Err(map)
        }
    }
}

pub(crate) fn merge_wrapper(
    resource_type: String,
    content: Map<String, Value>,
) -> Map<String, Value> {
    let mut out = Map::with_capacity(content.len() + 1);
    out.insert(RESOURCE_TYPE_KEY.to_string(), Value::String(resource_type));
    out.extend(content);
    out
}

fn into_content(content: Value) -> Result<Map<String, Value>, Value> {
    match content {
        Value::Object(map) => Ok(map),
        Value::Array(mut items) if items.len() == 1 => match items.pop() {
            Some(Value::Object(map)) => Ok(map),
            other => Err(Value::Array(other.into_iter().collect())),
        },
        other => Err(other),
    }
}

fn is_type_name(key: &str) -> bool {
    !key.starts_with(ATTRIBUTE_MARKER)
        && key.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && key.chars().all(|c| c.is_ascii_alphanumeric())
        && is_resource_type(key)
}
