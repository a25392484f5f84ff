use ferrum_xmljson::tables::{is_array_element, is_scalar_element};
use ferrum_xmljson::transaction::bundle_entries;
use ferrum_xmljson::{
    ensure_narrative, xml_to_json, xml_to_value, ExtensionSubstituter, ReadOptions,
    TransactionSplitter, DEFAULT_NARRATIVE_DIV,
};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Helper to get test data directory
fn test_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
}

/// Discover all test file base names that have both an XML input and an
/// expected JSON output
fn discover_test_cases() -> Vec<String> {
    let data_dir = test_data_dir();
    let mut cases = Vec::new();

    if let Ok(entries) = fs::read_dir(&data_dir) {
        for entry in entries.flatten() {
            if let Some(stem) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(".xml"))
            {
                if data_dir.join(format!("{}.json", stem)).exists() {
                    cases.push(stem.to_string());
                }
            }
        }
    }

    cases.sort();
    cases
}

/// Helper to load test files
fn load_test_files(base_name: &str) -> (String, Value) {
    let json_path = test_data_dir().join(format!("{}.json", base_name));
    let xml_path = test_data_dir().join(format!("{}.xml", base_name));

    let json = fs::read_to_string(&json_path)
        .unwrap_or_else(|_| panic!("Failed to read {}", json_path.display()));
    let xml = fs::read_to_string(&xml_path)
        .unwrap_or_else(|_| panic!("Failed to read {}", xml_path.display()));

    let expected = serde_json::from_str(&json)
        .unwrap_or_else(|e| panic!("{}: expected JSON is invalid: {}", base_name, e));
    (xml, expected)
}

fn convert(xml: &str) -> Value {
    xml_to_value(xml, &ReadOptions::default()).expect("conversion failed")
}

/// Walk every object in `value`, calling `f` with each key/value pair.
fn walk_fields(value: &Value, f: &mut dyn FnMut(&str, &Value)) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                f(k, v);
                walk_fields(v, f);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| walk_fields(item, f)),
        _ => {}
    }
}

// ============================================================================
// Fixture conversions
// ============================================================================

#[test]
fn test_data_files_exist() {
    let test_cases = discover_test_cases();
    assert!(
        test_cases.len() >= 2,
        "No test cases found in {}",
        test_data_dir().display()
    );
}

#[test]
fn test_all_xml_converts_to_expected_json() {
    for base_name in discover_test_cases() {
        println!("Testing XML→JSON for: {}", base_name);
        let (xml, expected) = load_test_files(&base_name);
        let actual = convert(&xml);
        assert_eq!(
            actual,
            expected,
            "{}: converted JSON differs:\n{}",
            base_name,
            serde_json::to_string_pretty(&actual).unwrap()
        );
    }
}

#[test]
fn test_output_is_stable_pretty_json() {
    let (xml, _) = load_test_files("patient-example");
    let first = xml_to_json(&xml).unwrap();
    let second = xml_to_json(&xml).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("\n  \"id\": \"example\""));
}

// ============================================================================
// Cardinality properties
// ============================================================================

#[test]
fn test_array_fields_are_always_lists() {
    for base_name in discover_test_cases() {
        let (xml, _) = load_test_files(&base_name);
        walk_fields(&convert(&xml), &mut |key, value| {
            if is_array_element(key) {
                assert!(value.is_array(), "{}: '{}' is not a list", base_name, key);
            }
        });
    }
}

#[test]
fn test_scalar_fields_are_never_singleton_lists() {
    for base_name in discover_test_cases() {
        let (xml, _) = load_test_files(&base_name);
        walk_fields(&convert(&xml), &mut |key, value| {
            if is_scalar_element(key) {
                let singleton = value.as_array().is_some_and(|items| items.len() == 1);
                assert!(!singleton, "{}: '{}' is a one-element list", base_name, key);
            }
        });
    }
}

#[test]
fn test_repeated_scalar_elements_stay_lists_when_many() {
    let xml = r#"
    <Observation xmlns="http://hl7.org/fhir">
        <status value="final"/>
        <code>
            <coding><system value="http://loinc.org"/><code value="1"/></coding>
            <coding><system value="http://snomed.info/sct"/><code value="2"/></coding>
        </code>
    </Observation>
    "#;
    let value = convert(xml);
    assert_eq!(value["code"]["coding"].as_array().unwrap().len(), 2);
}

// ============================================================================
// Post-processing: extensions and narrative
// ============================================================================

#[test]
fn test_bundle_post_processing() {
    let (xml, _) = load_test_files("bundle-transaction");
    let bundle = convert(&xml);

    let substituter =
        ExtensionSubstituter::from_file(test_data_dir().join("new_extension.json")).unwrap();
    let bundle = substituter.apply_document(&bundle);
    let bundle = ensure_narrative(&bundle);

    let patient = &bundle["entry"][0]["resource"];
    assert_eq!(
        patient["extension"][0]["url"],
        "http://example.org/fhir/StructureDefinition/patient-nationality"
    );
    // existing narrative is kept
    assert_eq!(
        patient["text"]["div"],
        "<div xmlns=\"http://www.w3.org/1999/xhtml\"><p>Jane Doe</p></div>"
    );

    let observation = &bundle["entry"][1]["resource"];
    assert_eq!(observation["text"]["div"], DEFAULT_NARRATIVE_DIV);
    assert!(observation.get("extension").is_none());

    assert!(bundle.get("text").is_none());
    assert_eq!(ensure_narrative(&bundle), bundle);
}

#[test]
fn test_patient_without_extensions_gains_none() {
    let xml = r#"<Patient xmlns="http://hl7.org/fhir"><id value="bare"/></Patient>"#;
    let patient = convert(xml);

    let substituter =
        ExtensionSubstituter::from_file(test_data_dir().join("new_extension.json")).unwrap();
    let out = substituter.apply_document(&patient);
    assert_eq!(
        serde_json::to_string(&out).unwrap(),
        serde_json::to_string(&patient).unwrap()
    );
}

#[test]
fn test_plain_text_narrative_is_wrapped() {
    let xml = r#"
    <Condition xmlns="http://hl7.org/fhir">
        <text>
            <status value="generated"/>
            <div>Diabetes &amp; more</div>
        </text>
    </Condition>
    "#;
    let value = convert(xml);
    assert_eq!(
        value["text"]["div"],
        "<div xmlns=\"http://www.w3.org/1999/xhtml\">Diabetes &amp; more</div>"
    );
}

#[test]
fn test_prefixed_xhtml_narrative_becomes_div() {
    let xml = r#"
    <Condition xmlns="http://hl7.org/fhir" xmlns:h="http://www.w3.org/1999/xhtml">
        <text>
            <status value="generated"/>
            <h:div><h:p>Asthma</h:p></h:div>
        </text>
    </Condition>
    "#;
    let value = convert(xml);
    assert_eq!(
        value["text"],
        serde_json::json!({
            "status": "generated",
            "div": "<div xmlns=\"http://www.w3.org/1999/xhtml\"><p>Asthma</p></div>"
        })
    );
}

// ============================================================================
// Sequential transactions
// ============================================================================

#[test]
fn test_converted_bundle_splits_with_resolved_references() {
    let (xml, _) = load_test_files("bundle-transaction");
    let bundle = convert(&xml);
    let entries = bundle_entries(&bundle);
    assert_eq!(entries.len(), 2);

    let mut splitter = TransactionSplitter::new();
    let patient_tx = splitter.transaction_for(&entries[0]);
    assert_eq!(patient_tx["type"], "transaction");
    assert_eq!(patient_tx["entry"][0]["resource"]["resourceType"], "Patient");

    splitter.record_response(&entries[0], Some("Patient/p-1/_history/1"), None);
    let observation_tx = splitter.transaction_for(&entries[1]);
    assert_eq!(
        observation_tx["entry"][0]["resource"]["subject"]["reference"],
        "Patient/p-1"
    );
    assert_eq!(observation_tx["entry"][0]["request"]["url"], "Observation");
}
