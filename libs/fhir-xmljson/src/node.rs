//! Parsed XML tree
//!
//! The generic element tree handed to the normalizer. It mirrors the usual
//! "XML as nested dictionaries" shape (attributes, text content and child
//! elements share one ordered key space) but as a closed sum type.

use serde_json::Value;

use crate::tables::{ATTRIBUTE_MARKER, TEXT_KEY};

/// Key of an entry inside an [`XmlNode::Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlKey {
    /// Attribute, stored without its marker.
    Attribute(String),
    /// Text content of the element.
    Text,
    /// Child element name.
    Child(String),
}

impl XmlKey {
    /// Classify a dict-shaped key (`@attr`, `#text`, `child`).
    pub fn parse(key: &str) -> Self {
        if key == TEXT_KEY {
            XmlKey::Text
        } else if let Some(attr) = key.strip_prefix(ATTRIBUTE_MARKER) {
            XmlKey::Attribute(attr.to_string())
        } else {
            XmlKey::Child(key.to_string())
        }
    }

    pub fn is_value_attribute(&self) -> bool {
        matches!(self, XmlKey::Attribute(name) if name == "value")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// Element with no attributes, children or text.
    Empty,
    Text(String),
    /// Repeated (or force-listed) element occurrences.
    List(Vec<XmlNode>),
    /// Attributes, text and children in document order.
    Element(Vec<(XmlKey, XmlNode)>),
}

impl XmlNode {
    pub fn text(value: impl Into<String>) -> Self {
        XmlNode::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            XmlNode::Empty => true,
            XmlNode::Element(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Look up the first entry with the given key.
    pub fn get(&self, key: &XmlKey) -> Option<&XmlNode> {
        match self {
            XmlNode::Element(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.get(&XmlKey::Child(name.to_string()))
    }
}

impl From<&Value> for XmlNode {
    /// Build a tree from a dict-shaped JSON document.
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => XmlNode::Empty,
            Value::String(s) => XmlNode::Text(s.clone()),
            Value::Bool(b) => XmlNode::Text(b.to_string()),
            Value::Number(n) => XmlNode::Text(n.to_string()),
            Value::Array(items) => XmlNode::List(items.iter().map(XmlNode::from).collect()),
            Value::Object(map) => XmlNode::Element(
                map.iter()
                    .map(|(k, v)| (XmlKey::parse(k), XmlNode::from(v)))
                    .collect(),
            ),
        }
    }
}
