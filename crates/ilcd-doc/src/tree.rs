//! Lossless XML tree on top of quick-xml events.
//!
//! Text and attribute values are kept in their escaped on-disk form and only
//! unescaped when read through [`TreeNode`], so untouched content serializes
//! exactly as it was parsed.

use anyhow::{anyhow, Context, Result};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::borrow::Cow;

use crate::node::TreeNode;

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Escaped character data.
    Text(String),
    CData(String),
    /// Comments, processing instructions, declarations and doctypes.
    Other(Event<'static>),
}

/// An XML element with its qualified name, raw attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    /// `(qualified name, escaped value)` in document order.
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
    /// Parsed from `<name/>`; written back the same way while childless.
    self_closing: bool,
}

impl Element {
    /// Create an empty element with the given qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// Qualified name as written in the document (`common:UUID`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    fn from_start(start: &BytesStart<'_>, self_closing: bool) -> Result<Self> {
        let name = String::from_utf8(start.name().as_ref().to_vec())
            .context("element name is not valid UTF-8")?;
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.with_context(|| format!("invalid attribute on <{}>", name))?;
            let key = String::from_utf8(attr.key.as_ref().to_vec())
                .context("attribute name is not valid UTF-8")?;
            let value = String::from_utf8(attr.value.into_owned())
                .with_context(|| format!("attribute {} is not valid UTF-8", key))?;
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            self_closing,
        })
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            // values parsed from single quotes may hold a literal `"`
            let value = if value.contains('"') {
                Cow::Owned(value.replace('"', "&quot;").into_bytes())
            } else {
                Cow::Borrowed(value.as_bytes())
            };
            start.push_attribute(Attribute {
                key: QName(key.as_bytes()),
                value,
            });
        }
        if self.children.is_empty() && self.self_closing {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            write_node(child, writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn matches_name(qualified: &str, wanted: &str) -> bool {
    qualified == wanted || local_part(qualified) == wanted
}

impl TreeNode for Element {
    fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    fn child_elements(&self) -> Vec<&Self> {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Element(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    fn child_elements_mut(&mut self) -> Vec<&mut Self> {
        self.children
            .iter_mut()
            .filter_map(|node| match node {
                Node::Element(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => match unescape(raw) {
                    Ok(text) => out.push_str(&text),
                    Err(_) => out.push_str(raw),
                },
                Node::CData(data) => out.push_str(data),
                _ => {}
            }
        }
        out
    }

    fn set_text(&mut self, text: &str) {
        self.children
            .retain(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
        if !text.is_empty() {
            self.children
                .insert(0, Node::Text(escape(text).into_owned()));
        }
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(key, _)| matches_name(key, name))
            .map(|(_, raw)| match unescape(raw) {
                Ok(value) => value.into_owned(),
                Err(_) => raw.clone(),
            })
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        let escaped = escape(value).into_owned();
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| matches_name(key, name))
        {
            Some((_, raw)) => *raw = escaped,
            None => self.attributes.push((name.to_string(), escaped)),
        }
    }

    fn insert_child_after(&mut self, name: &str, after: &str) {
        let position = self.children.iter().position(|node| match node {
            Node::Element(e) => e.local_name() == after,
            _ => false,
        });
        let element = Node::Element(Element::new(name));
        match position {
            Some(idx) => self.children.insert(idx + 1, element),
            None => self.children.push(element),
        }
    }
}

fn write_node(node: &Node, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    match node {
        Node::Element(e) => e.write_to(writer)?,
        Node::Text(raw) => writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?,
        Node::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str())))?,
        Node::Other(event) => writer.write_event(event.clone())?,
    }
    Ok(())
}

/// A parsed XML document: prolog nodes, exactly one root element, epilog.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
}

impl Document {
    /// Parse a document from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut stack: Vec<Element> = Vec::new();
        let mut prolog: Vec<Node> = Vec::new();
        let mut root: Option<Element> = None;
        let mut epilog: Vec<Node> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .with_context(|| format!("malformed XML at byte {}", reader.buffer_position()))?;
            let node = match event {
                Event::Start(start) => {
                    stack.push(Element::from_start(&start, false)?);
                    continue;
                }
                Event::End(end) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| anyhow!("unexpected closing tag"))?;
                    if element.name.as_bytes() != end.name().as_ref() {
                        return Err(anyhow!("closing tag does not match <{}>", element.name));
                    }
                    Node::Element(element)
                }
                Event::Empty(start) => Node::Element(Element::from_start(&start, true)?),
                Event::Text(text) => Node::Text(
                    String::from_utf8(text.into_inner().into_owned())
                        .context("text is not valid UTF-8")?,
                ),
                Event::CData(data) => Node::CData(
                    String::from_utf8(data.into_inner().into_owned())
                        .context("CDATA is not valid UTF-8")?,
                ),
                Event::Eof => break,
                other => Node::Other(other.into_owned()),
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
                continue;
            }
            match (node, root.is_some()) {
                (Node::Element(element), false) => root = Some(element),
                (Node::Element(element), true) => {
                    return Err(anyhow!("second root element <{}>", element.name));
                }
                (other, false) => prolog.push(other),
                (other, true) => epilog.push(other),
            }
        }

        if let Some(open) = stack.last() {
            return Err(anyhow!("unclosed element <{}>", open.name));
        }
        let root = root.ok_or_else(|| anyhow!("document has no root element"))?;
        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Serialize the document back to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.prolog {
            write_node(node, &mut writer)?;
        }
        self.root.write_to(&mut writer)?;
        for node in &self.epilog {
            write_node(node, &mut writer)?;
        }
        Ok(writer.into_inner())
    }
}
