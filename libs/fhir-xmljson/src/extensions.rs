//! Extension substitution for subject resources
//!
//! Replaces the `extension` list of every subject resource (Patient by
//! default) with a fixed replacement set. Resources without extensions are
//! never given any.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::ExtensionError;
use crate::tables::RESOURCE_TYPE_KEY;

const EXTENSION_KEY: &str = "extension";

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionSubstituter {
    subject_type: String,
    replacements: Vec<Value>,
}

impl ExtensionSubstituter {
    pub const DEFAULT_SUBJECT_TYPE: &'static str = "Patient";

    pub fn new(replacements: Vec<Value>) -> Self {
        Self {
            subject_type: Self::DEFAULT_SUBJECT_TYPE.to_string(),
            replacements,
        }
    }

    pub fn with_subject_type(mut self, subject_type: impl Into<String>) -> Self {
        self.subject_type = subject_type.into();
        self
    }

    /// Use the `extension` array of a JSON document as the replacement set.
    pub fn from_document(document: &Value) -> Self {
        let replacements = document
            .get(EXTENSION_KEY)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Self::new(replacements)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtensionError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ExtensionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let document: Value = serde_json::from_str(&raw).map_err(|source| ExtensionError::Json {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_document(&document))
    }

    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn replacements(&self) -> &[Value] {
        &self.replacements
    }

    /// True for subject resources that already carry extensions.
    pub fn matches(&self, resource: &Value) -> bool {
        let is_subject = resource.get(RESOURCE_TYPE_KEY).and_then(Value::as_str)
            == Some(self.subject_type.as_str());
        let has_extensions = match resource.get(EXTENSION_KEY) {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        };
        is_subject && has_extensions
    }

    /// Copy-on-write replacement: the input is never mutated and is borrowed
    /// back unchanged when it does not match.
    pub fn apply<'a>(&self, resource: &'a Value) -> Cow<'a, Value> {
        if !self.matches(resource) {
            return Cow::Borrowed(resource);
        }
        let mut replaced = resource.clone();
        if let Value::Object(map) = &mut replaced {
            map.insert(
                EXTENSION_KEY.to_string(),
                Value::Array(self.replacements.clone()),
            );
        }
        Cow::Owned(replaced)
    }

    /// Replace extensions of matching entry resources inside a Bundle, in
    /// place. Returns the number of resources replaced.
    pub fn apply_to_bundle(&self, bundle: &mut Value) -> usize {
        let Some(entries) = bundle.get_mut("entry").and_then(Value::as_array_mut) else {
            return 0;
        };

        let mut replaced = 0;
        for entry in entries {
            let Some(resource) = entry.get_mut("resource") else {
                continue;
            };
            if !self.matches(resource) {
                continue;
            }
            if let Value::Object(map) = resource {
                map.insert(
                    EXTENSION_KEY.to_string(),
                    Value::Array(self.replacements.clone()),
                );
                replaced += 1;
            }
        }
        debug!(replaced, subject_type = %self.subject_type, "replaced bundle entry extensions");
        replaced
    }

    /// Apply to a whole document: a subject resource directly, a Bundle
    /// through its entries (on a private copy), anything else unchanged.
    pub fn apply_document(&self, document: &Value) -> Value {
        match document.get(RESOURCE_TYPE_KEY).and_then(Value::as_str) {
            Some(rt) if rt == self.subject_type => self.apply(document).into_owned(),
            Some("Bundle") => {
                let mut bundle = document.clone();
                self.apply_to_bundle(&mut bundle);
                bundle
            }
            _ => document.clone(),
        }
    }
}
