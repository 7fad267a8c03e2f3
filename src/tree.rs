//! The request/reply XML tree (X/R in spec.md §3).
//!
//! A generic, owned XML DOM: every element carries a name, an optional XML
//! namespace, an ordered attribute list, ordered children, and optional body
//! text. This is the Rust analogue of clixon's `cxobj*` tree — the operation
//! decoders in [`crate::operations`] walk it the same way
//! `original_source/apps/netconf/netconf_rpc.c` walks `cxobj` with
//! `xml_child_each`/`xpath_first`/`xml_find_value`.
//!
//! Parsing and serialization go through `quick-xml`'s pull-based event API
//! rather than `serde`, since the payload shape is not fixed: YANG-declared
//! RPCs and `<config>` subtrees carry arbitrary application-defined
//! elements.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::error::EngineError;

/// One XML element. The schema attachment mentioned in spec.md §3 (a
/// non-owning pointer into the Schema Index) is deliberately not stored
/// here — validation threads it through as a separate parameter instead, so
/// that `XmlNode` has no lifetime tied to a `SchemaIndex`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    pub name: String,
    /// The element's own `xmlns` attribute, if declared directly on it.
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    text: Option<String>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> XmlNode {
        XmlNode {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> XmlNode {
        let mut node = XmlNode::new(name);
        node.set_text(text);
        node
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> XmlNode {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn push_child(&mut self, child: XmlNode) -> &mut XmlNode {
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(existing) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = value.into();
        } else {
            self.attributes.push((name, value.into()));
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(idx).1)
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Body text, trimmed, or the empty string if there is none. Matches
    /// clixon's `xml_body` in the common case.
    pub fn body(&self) -> &str {
        self.text.as_deref().unwrap_or("").trim()
    }

    /// First direct child with this name. Corresponds to `xpath_first(xn,
    /// "name")` for a one-level path.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with this name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first search for the first descendant (including self) with
    /// this name, corresponding to clixon's `//name` xpath shorthand used
    /// e.g. by `kill-session`'s `//session-id` lookup.
    pub fn find_descendant(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_descendant(name))
    }

    pub fn find_descendant_mut(&mut self, name: &str) -> Option<&mut XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_descendant_mut(name))
    }

    /// Parse a single root element from an XML document.
    pub fn parse(xml: &str) -> EngineResult<XmlNode> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Start(start) => {
                    let node = node_from_start(&start)?;
                    stack.push(node);
                }
                Event::Empty(start) => {
                    let node = node_from_start(&start)?;
                    push_completed(&mut stack, &mut root, node);
                }
                Event::End(_end) => {
                    let node = stack.pop().ok_or_else(|| malformed_msg("unbalanced end tag"))?;
                    push_completed(&mut stack, &mut root, node);
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        append_text(top, &text)?;
                    }
                }
                Event::CData(text) => {
                    if let Some(top) = stack.last_mut() {
                        let unescaped = text.into_inner();
                        let s = std::str::from_utf8(&unescaped).map_err(|_| malformed_msg("invalid utf-8 in CDATA"))?;
                        append_text_str(top, s);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or_else(|| malformed_msg("no root element"))
    }

    /// Serialize this node (and descendants) back to an XML string.
    pub fn to_xml_string(&self) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_node(&mut writer, self).expect("writing to an in-memory buffer cannot fail");
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).expect("quick-xml only emits valid utf-8")
    }

    /// Serialize with indentation, for `CLICON_RESTCONF_PRETTY` (spec.md §6).
    pub fn to_xml_string_pretty(&self) -> String {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        write_node(&mut writer, self).expect("writing to an in-memory buffer cannot fail");
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).expect("quick-xml only emits valid utf-8")
    }
}

type EngineResult<T> = Result<T, EngineError>;

fn malformed(err: quick_xml::Error) -> EngineError {
    EngineError::Fatal(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("malformed XML frame: {}", err),
    ))
}

fn malformed_msg(msg: &str) -> EngineError {
    EngineError::Fatal(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
}

fn node_from_start(start: &BytesStart) -> EngineResult<XmlNode> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|_| malformed_msg("invalid utf-8 in element name"))?
        .to_string();
    let mut node = XmlNode::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|_| malformed_msg("invalid attribute"))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|_| malformed_msg("invalid utf-8 in attribute name"))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|_| malformed_msg("invalid attribute value"))?
            .into_owned();
        if key == "xmlns" {
            node.namespace = Some(value.clone());
        }
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn append_text(node: &mut XmlNode, text: &BytesText) -> EngineResult<()> {
    let unescaped = text
        .unescape()
        .map_err(|_| malformed_msg("invalid text content"))?;
    append_text_str(node, unescaped.as_ref());
    Ok(())
}

fn append_text_str(node: &mut XmlNode, s: &str) {
    if s.trim().is_empty() && node.text.is_none() {
        return;
    }
    match &mut node.text {
        Some(existing) => existing.push_str(s),
        None => node.text = Some(s.to_string()),
    }
}

fn push_completed(stack: &mut Vec<XmlNode>, root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_child(node);
        }
        None => *root = Some(node),
    }
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &XmlNode) -> std::io::Result<()> {
    let mut start = BytesStart::new(node.name.clone());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if node.children.is_empty() && node.text.is_none() {
        writer
            .write_event(Event::Empty(start))
            .map_err(quick_xml_to_io)?;
        return Ok(());
    }
    writer
        .write_event(Event::Start(start))
        .map_err(quick_xml_to_io)?;
    if let Some(text) = &node.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(quick_xml_to_io)?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.clone())))
        .map_err(quick_xml_to_io)?;
    Ok(())
}

fn quick_xml_to_io(err: quick_xml::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}
