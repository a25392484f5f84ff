//! FHIR XML → FHIR JSON conversion.
//!
//! The conversion runs over a generic element tree rather than a typed model,
//! so it needs to recover what the XML form leaves implicit:
//! - Cardinality: a single occurrence of a repeating element looks exactly
//!   like a non-repeating one. Name tables in [`tables`] decide.
//! - Resource wrappers: `<resource><Patient>…</Patient></resource>` becomes
//!   `"resource": {"resourceType": "Patient", …}`.
//! - Primitives: `<family value="Doe"/>` becomes `"family": "Doe"`.
//! - Narrative: `div` content is kept as an XHTML string.
//!
//! The pipeline is [`reader`] → [`normalize`] → [`correct`]. Callers then
//! apply [`ExtensionSubstituter`] and [`ensure_narrative`] as needed, and
//! can break a transaction Bundle into single-entry transactions with
//! [`TransactionSplitter`].
//!
//! ```rust
//! use ferrum_xmljson::{ensure_narrative, xml_to_value, ReadOptions};
//!
//! let xml = r#"<Patient xmlns="http://hl7.org/fhir">
//!     <name><family value="Doe"/><given value="Jane"/></name>
//! </Patient>"#;
//!
//! let patient = xml_to_value(xml, &ReadOptions::default()).unwrap();
//! assert_eq!(patient["name"][0]["given"][0], "Jane");
//!
//! let patient = ensure_narrative(&patient);
//! assert_eq!(patient["text"]["status"], "generated");
//! ```

pub mod correct;
pub mod error;
pub mod extensions;
pub mod narrative;
pub mod node;
pub mod normalize;
pub mod reader;
pub mod references;
pub mod tables;
pub mod transaction;
pub mod wrapper;

use serde_json::{Map, Value};
use tracing::debug;

pub use correct::correct;
pub use error::{ConvertError, ExtensionError, Result};
pub use extensions::ExtensionSubstituter;
pub use narrative::{default_narrative, ensure_narrative, DEFAULT_NARRATIVE_DIV};
pub use node::{XmlKey, XmlNode};
pub use normalize::normalize;
pub use reader::{read_document, ReadOptions, XmlDocument};
pub use references::{reference_from_location, resolve_references};
pub use transaction::{split_transaction, TransactionSplitter};
pub use wrapper::resolve_wrapper;

use tables::RESOURCE_TYPE_KEY;

/// Convert a FHIR XML payload into pretty-printed FHIR JSON.
pub fn xml_to_json(input: &str) -> Result<String> {
    let value = xml_to_value(input, &ReadOptions::default())?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Convert a FHIR XML payload into a FHIR JSON value.
///
/// Fails only when the input is blank or is not well-formed XML; the
/// structural passes never fail.
pub fn xml_to_value(input: &str, options: &ReadOptions) -> Result<Value> {
    let doc = read_document(input, options)?;
    debug!(resource_type = %doc.root_name, "converting XML resource");
    Ok(convert_document(&doc))
}

/// Convert an already parsed document. The root element name becomes the
/// `resourceType`.
pub fn convert_document(doc: &XmlDocument) -> Value {
    let mut resource = Map::new();
    resource.insert(
        RESOURCE_TYPE_KEY.to_string(),
        Value::String(doc.root_name.clone()),
    );
    match normalize(&doc.root, Some(&doc.root_name)) {
        Some(Value::Object(content)) => resource.extend(content),
        Some(value) => {
            resource.insert("value".to_string(), value);
        }
        None => {}
    }
    correct(Value::Object(resource), None)
}

/// Convert a whole parsed tree, e.g. `{"Patient": {...}}` from an external
/// parser. The root wrapper is resolved like any nested one.
pub fn convert_tree(tree: &XmlNode) -> Option<Value> {
    normalize(tree, None).map(|value| correct(value, None))
}
