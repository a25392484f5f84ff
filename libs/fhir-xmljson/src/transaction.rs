//! Splitting a Bundle into single-entry transactions
//!
//! Servers that cannot resolve `urn:uuid:` links inside one large
//! transaction accept the same entries one at a time, as long as each later
//! entry refers to what the earlier ones created. [`TransactionSplitter`]
//! tracks those results and builds each single-entry transaction with its
//! placeholders already resolved. Sending the requests is up to the caller.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::references::{
    reference_from_location, reference_from_response, resolve_references_in,
};
use crate::tables::RESOURCE_TYPE_KEY;

/// Resource type assumed when an entry's resource carries none.
pub const FALLBACK_RESOURCE_TYPE: &str = "Resource";

/// Entries of a Bundle; empty for anything else.
pub fn bundle_entries(bundle: &Value) -> &[Value] {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Resource type of an entry's resource.
pub fn entry_resource_type(entry: &Value) -> &str {
    entry
        .get("resource")
        .and_then(|resource| resource.get(RESOURCE_TYPE_KEY))
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_RESOURCE_TYPE)
}

/// Wrap one entry in a `transaction` Bundle, keeping its `fullUrl`,
/// `resource` and `request`.
pub fn single_entry_transaction(entry: &Value) -> Value {
    let mut one = Map::new();
    for key in ["fullUrl", "resource", "request"] {
        if let Some(value) = entry.get(key) {
            one.insert(key.to_string(), value.clone());
        }
    }
    json!({
        "resourceType": "Bundle",
        "type": "transaction",
        "entry": [Value::Object(one)],
    })
}

/// Every entry of `bundle` as its own transaction, placeholders untouched.
pub fn split_transaction(bundle: &Value) -> Vec<Value> {
    bundle_entries(bundle)
        .iter()
        .map(single_entry_transaction)
        .collect()
}

/// Builds single-entry transactions in order, resolving `urn:uuid:`
/// references against the results recorded for earlier entries.
#[derive(Debug, Clone, Default)]
pub struct TransactionSplitter {
    resolved: HashMap<String, String>,
}

impl TransactionSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `fullUrl` → `Type/id` for every entry recorded so far.
    pub fn resolved(&self) -> &HashMap<String, String> {
        &self.resolved
    }

    /// The transaction for `entry`, with its resource's references resolved
    /// on a copy.
    pub fn transaction_for(&self, entry: &Value) -> Value {
        let mut transaction = single_entry_transaction(entry);
        if let Some(resource) = transaction.pointer_mut("/entry/0/resource") {
            resolve_references_in(resource, &self.resolved);
        }
        transaction
    }

    /// Map an entry's `fullUrl` to a server reference.
    pub fn record(&mut self, full_url: &str, reference: impl Into<String>) {
        if full_url.is_empty() {
            return;
        }
        let reference = reference.into();
        debug!(full_url, reference = %reference, "resolved transaction entry");
        self.resolved.insert(full_url.to_string(), reference);
    }

    /// Record the outcome of submitting `entry`: the `Location` header if it
    /// yields a reference, else the response body. Returns the reference.
    pub fn record_response(
        &mut self,
        entry: &Value,
        location: Option<&str>,
        body: Option<&Value>,
    ) -> Option<String> {
        let resource_type = entry_resource_type(entry);
        let reference = location
            .and_then(|location| reference_from_location(location, Some(resource_type)))
            .or_else(|| body.and_then(|body| reference_from_response(body, Some(resource_type))))?;

        let full_url = entry.get("fullUrl").and_then(Value::as_str).unwrap_or_default();
        self.record(full_url, reference.clone());
        Some(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> Value {
        json!({
            "resourceType": "Bundle",
            "type": "transaction",
            "entry": [
                {
                    "fullUrl": "urn:uuid:p",
                    "resource": {"resourceType": "Patient", "name": [{"family": "Doe"}]},
                    "request": {"method": "POST", "url": "Patient"}
                },
                {
                    "fullUrl": "urn:uuid:o",
                    "resource": {
                        "resourceType": "Observation",
                        "subject": {"reference": "urn:uuid:p"}
                    },
                    "request": {"method": "POST", "url": "Observation"}
                }
            ]
        })
    }

    #[test]
    fn splits_into_single_entry_transactions() {
        let parts = split_transaction(&bundle());
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["type"], "transaction");
        assert_eq!(parts[1]["entry"].as_array().unwrap().len(), 1);
        assert_eq!(parts[1]["entry"][0]["fullUrl"], "urn:uuid:o");
        assert_eq!(parts[1]["entry"][0]["resource"]["subject"]["reference"], "urn:uuid:p");
        assert_eq!(parts[1]["entry"][0]["request"]["url"], "Observation");
    }

    #[test]
    fn non_bundles_have_no_entries() {
        assert!(bundle_entries(&json!({"resourceType": "Patient"})).is_empty());
        assert!(split_transaction(&json!({"resourceType": "Bundle"})).is_empty());
    }

    #[test]
    fn single_entry_keeps_only_transport_fields() {
        let tx = single_entry_transaction(&json!({
            "resource": {"resourceType": "Patient"},
            "search": {"mode": "match"}
        }));
        assert_eq!(
            tx["entry"][0],
            json!({"resource": {"resourceType": "Patient"}})
        );
    }

    #[test]
    fn later_entries_see_earlier_results() {
        let bundle = bundle();
        let entries = bundle_entries(&bundle);
        let mut splitter = TransactionSplitter::new();

        let first = splitter.transaction_for(&entries[0]);
        assert_eq!(first["entry"][0]["resource"]["resourceType"], "Patient");
        let reference = splitter.record_response(
            &entries[0],
            Some("https://hl7int-server.com/server/fhir/Patient/42/_history/1"),
            None,
        );
        assert_eq!(reference.as_deref(), Some("Patient/42"));

        let second = splitter.transaction_for(&entries[1]);
        assert_eq!(
            second["entry"][0]["resource"]["subject"]["reference"],
            "Patient/42"
        );
        // the source bundle is never touched
        assert_eq!(
            entries[1]["resource"]["subject"]["reference"],
            "urn:uuid:p"
        );
    }

    #[test]
    fn response_body_is_the_fallback() {
        let bundle = bundle();
        let mut splitter = TransactionSplitter::new();
        let body = json!({
            "resourceType": "Bundle",
            "type": "transaction-response",
            "entry": [{"response": {"location": "Observation/9/_history/1"}}]
        });
        let reference = splitter.record_response(&bundle_entries(&bundle)[1], None, Some(&body));
        assert_eq!(reference.as_deref(), Some("Observation/9"));
        assert_eq!(splitter.resolved()["urn:uuid:o"], "Observation/9");
    }

    #[test]
    fn unresolvable_responses_record_nothing() {
        let bundle = bundle();
        let mut splitter = TransactionSplitter::new();
        let entry = &bundle_entries(&bundle)[0];
        assert_eq!(splitter.record_response(entry, None, None), None);
        assert_eq!(splitter.record_response(entry, Some(""), None), None);
        assert!(splitter.resolved().is_empty());
    }

    #[test]
    fn bare_location_id_uses_entry_type() {
        let mut splitter = TransactionSplitter::new();
        let entry = json!({"fullUrl": "urn:uuid:x", "resource": {"resourceType": "Condition"}});
        assert_eq!(
            splitter.record_response(&entry, Some("c1"), None).as_deref(),
            Some("Condition/c1")
        );
        let entry = json!({"fullUrl": "urn:uuid:y", "resource": {}});
        assert_eq!(
            splitter.record_response(&entry, Some("r1"), None).as_deref(),
            Some("Resource/r1")
        );
    }

    #[test]
    fn entries_without_full_url_are_not_recorded() {
        let mut splitter = TransactionSplitter::new();
        splitter.record("", "Patient/1");
        assert!(splitter.resolved().is_empty());
    }
}
