//! XML text to [`XmlNode`] tree
//!
//! Thin adapter over `roxmltree` that produces the dict-shaped tree the
//! normalizer expects. Narrative XHTML is kept as raw markup.

use std::collections::HashSet;

use crate::error::{ConvertError, Result};
use crate::node::{XmlKey, XmlNode};
use crate::tables::XHTML_NS;

/// Elements the reader always emits as lists, whatever their occurrence count.
pub const DEFAULT_FORCE_LIST: &[&str] = &[
    "entry",
    "identifier",
    "name",
    "address",
    "telecom",
    "extension",
    "section",
];

#[derive(Debug, Clone)]
pub struct ReadOptions {
    force_list: HashSet<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::with_force_list(DEFAULT_FORCE_LIST.iter().copied())
    }
}

impl ReadOptions {
    pub fn with_force_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            force_list: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn forces_list(&self, name: &str) -> bool {
        self.force_list.contains(name)
    }
}

/// A parsed document: the root element name and its content.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root_name: String,
    pub root: XmlNode,
}

/// Parse XML text into a tree. Blank input is rejected before parsing.
pub fn read_document(input: &str, options: &ReadOptions) -> Result<XmlDocument> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ConvertError::EmptyInput);
    }

    let doc = roxmltree::Document::parse(input)?;
    let root = doc.root_element();
    Ok(XmlDocument {
        root_name: element_name(&root),
        root: read_element(input, &root, options),
    })
}

fn read_element(source: &str, node: &roxmltree::Node, options: &ReadOptions) -> XmlNode {
    if node.tag_name().namespace() == Some(XHTML_NS) {
        return XmlNode::Text(xhtml_markup(source, node));
    }

    let mut entries = Vec::new();
    for (prefix, uri) in declared_namespaces(node) {
        let key = match prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        entries.push((XmlKey::Attribute(key), XmlNode::Text(uri)));
    }
    for attr in node.attributes() {
        let prefix = attr.namespace().and_then(|ns| node.lookup_prefix(ns));
        entries.push((
            XmlKey::Attribute(qualified_name(prefix, attr.name())),
            XmlNode::text(attr.value()),
        ));
    }

    let mut children: Vec<(String, Vec<XmlNode>)> = Vec::new();
    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let name = element_name(&child);
            let value = read_element(source, &child, options);
            match children.iter_mut().find(|(n, _)| *n == name) {
                Some((_, values)) => values.push(value),
                None => children.push((name, vec![value])),
            }
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }

    let text = text.trim();
    if entries.is_empty() && children.is_empty() {
        return if text.is_empty() {
            XmlNode::Empty
        } else {
            XmlNode::text(text)
        };
    }

    for (name, mut values) in children {
        let value = if values.len() == 1 && !options.forces_list(&name) {
            values.swap_remove(0)
        } else {
            XmlNode::List(values)
        };
        entries.push((XmlKey::Child(name), value));
    }
    if !text.is_empty() {
        entries.push((XmlKey::Text, XmlNode::text(text)));
    }

    XmlNode::Element(entries)
}

fn element_name(node: &roxmltree::Node) -> String {
    let tag = node.tag_name();
    if tag.namespace() == Some(XHTML_NS) {
        return tag.name().to_string();
    }
    let prefix = tag.namespace().and_then(|ns| node.lookup_prefix(ns));
    qualified_name(prefix, tag.name())
}

fn qualified_name(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

/// Narrative markup. Unprefixed XHTML is taken verbatim from the source;
/// prefixed XHTML (`<h:div>`) is rewritten into the default namespace so the
/// string stands on its own.
fn xhtml_markup(source: &str, node: &roxmltree::Node) -> String {
    let prefixed = node
        .lookup_prefix(XHTML_NS)
        .is_some_and(|prefix| !prefix.is_empty());
    if !prefixed {
        return source[node.range()].to_string();
    }
    let mut out = String::new();
    write_xhtml(node, true, &mut out);
    out
}

fn write_xhtml(node: &roxmltree::Node, root: bool, out: &mut String) {
    if node.is_text() {
        out.push_str(&html_escape::encode_text(node.text().unwrap_or_default()));
        return;
    }
    if !node.is_element() {
        return;
    }

    let name = node.tag_name().name();
    out.push('<');
    out.push_str(name);
    if root {
        out.push_str(&format!(r#" xmlns="{XHTML_NS}""#));
    }
    for attr in node.attributes() {
        let prefix = match attr.namespace() {
            Some(ns) if ns == XHTML_NS => None,
            Some(ns) => node.lookup_prefix(ns),
            None => None,
        };
        out.push_str(&format!(
            r#" {}="{}""#,
            qualified_name(prefix, attr.name()),
            html_escape::encode_double_quoted_attribute(attr.value())
        ));
    }
    if !node.has_children() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in node.children() {
        write_xhtml(&child, false, out);
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Namespace declarations written on this element (not inherited ones).
fn declared_namespaces(node: &roxmltree::Node) -> Vec<(Option<String>, String)> {
    fn in_scope(n: &roxmltree::Node) -> Vec<(Option<String>, String)> {
        n.namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
            .collect()
    }

    let inherited = node
        .parent_element()
        .map(|parent| in_scope(&parent))
        .unwrap_or_default();

    in_scope(node)
        .into_iter()
        .filter(|decl| !inherited.contains(decl))
        .collect()
}
