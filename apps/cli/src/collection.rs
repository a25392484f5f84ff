//! Postman collection model
//!
//! Only the parts of the Postman v2 collection format the generator reads.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_CONTENT_TYPE: &str = "application/fhir+json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub item: Vec<Item>,

    #[serde(default)]
    pub variable: Vec<Variable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub request: Option<Request>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub method: Option<String>,

    #[serde(default)]
    pub url: Option<RequestUrl>,

    #[serde(default)]
    pub header: Vec<Header>,

    #[serde(default)]
    pub body: Option<Body>,
}

/// Postman stores URLs either as a plain string or as a structured object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequestUrl {
    Raw(String),
    Structured {
        #[serde(default)]
        raw: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub value: Option<Value>,
}

impl Collection {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Collection not found: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid collection file: {}", path.display()))
    }

    /// Variables for `{{key}}` substitution. `host` and `host_ips` always
    /// resolve to `base_url`, whatever the collection declares.
    pub fn variables(&self, base_url: &str) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = self
            .variable
            .iter()
            .filter_map(|v| match (&v.key, &v.value) {
                (Some(key), Some(Value::String(value))) if !key.is_empty() && !value.is_empty() => {
                    Some((key.clone(), value.clone()))
                }
                _ => None,
            })
            .collect();
        vars.insert("host".to_string(), base_url.to_string());
        vars.insert("host_ips".to_string(), base_url.to_string());
        vars
    }
}

impl Request {
    pub fn method(&self) -> String {
        self.method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("GET")
            .to_uppercase()
    }

    pub fn resolved_url(&self, vars: &HashMap<String, String>) -> String {
        let raw = match &self.url {
            Some(RequestUrl::Raw(raw)) | Some(RequestUrl::Structured { raw }) => raw.as_str(),
            None => "",
        };
        substitute(raw, vars)
    }

    pub fn raw_body(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.raw.as_deref())
            .unwrap_or_default()
    }
}

pub fn substitute(raw: &str, vars: &HashMap<String, String>) -> String {
    vars.iter().fold(raw.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{key}}}}}"), value)
    })
}

pub fn content_type(headers: &[Header]) -> &str {
    headers
        .iter()
        .find(|h| h.key.eq_ignore_ascii_case("content-type"))
        .map(|h| h.value.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE))
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Replace any Content-Type header with `content_type`.
pub fn with_content_type(headers: &[Header], content_type: &str) -> Vec<Header> {
    let mut out: Vec<Header> = headers
        .iter()
        .filter(|h| !h.key.eq_ignore_ascii_case("content-type"))
        .cloned()
        .collect();
    out.push(Header {
        key: "Content-Type".to_string(),
        value: Some(content_type.to_string()),
    });
    out
}
