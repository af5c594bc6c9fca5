//! Lossless XML event tree over `quick-xml`.
//!
//! Elements keep their raw start tag (attributes and namespace declarations
//! byte-for-byte) and text keeps its escaped form, so a parse → write pass with
//! no edits reproduces the input part exactly. Only nodes the caller replaces
//! are re-encoded.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::docx::DocxError;

/// Deepest element nesting accepted. The tree and its writer recurse once per
/// level, so deeper input is rejected while parsing.
pub const MAX_DEPTH: usize = 512;

/// Opening tag of an element, remembered together with its original form
/// (`<a/>` vs `<a></a>`).
#[derive(Debug, Clone)]
pub struct Tag {
    start: BytesStart<'static>,
    self_closing: bool,
}

impl Tag {
    fn from_start(start: BytesStart<'_>, self_closing: bool) -> Self {
        Self {
            start: start.into_owned(),
            self_closing,
        }
    }

    /// A new tag with no attributes, written self-closing when it has no children.
    pub fn new(name: &str) -> Self {
        Self {
            start: BytesStart::new(name.to_string()),
            self_closing: true,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.start.push_attribute((key, value));
        self
    }

    /// Local part of the qualified name (`p` for `w:p`).
    pub fn local_name(&self) -> &[u8] {
        let name = self.start.name().into_inner();
        match name.iter().position(|b| *b == b':') {
            Some(i) => &name[i + 1..],
            None => name,
        }
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local.as_bytes()
    }

    /// Builds the qualified name of a sibling element in the same namespace
    /// prefix, e.g. `t` → `w:t` when this tag is `w:r`.
    pub fn sibling_name(&self, local: &str) -> String {
        let name = self.start.name().into_inner();
        match name.iter().position(|b| *b == b':') {
            Some(i) => format!("{}:{}", String::from_utf8_lossy(&name[..i]), local),
            None => local.to_string(),
        }
    }

    /// Value of the attribute whose local name is `local`, if present.
    pub fn attribute(&self, local: &str) -> Option<String> {
        self.start
            .attributes()
            .flatten()
            .find(|a| a.key.local_name().as_ref() == local.as_bytes())
            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
    }
}

#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(BytesText<'static>),
    /// Declarations, comments, processing instructions, CDATA, doctype.
    Other(Event<'static>),
}

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub tag: Tag,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            children: Vec::new(),
        }
    }

    /// Decoded character content of the direct children (text and CDATA).
    pub fn text(&self) -> Result<String, DocxError> {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(&t.unescape()?),
                XmlNode::Other(Event::CData(c)) => {
                    out.push_str(std::str::from_utf8(c).map_err(DocxError::Encoding)?)
                }
                _ => {}
            }
        }
        Ok(out)
    }
}

/// A parsed XML part: everything before the root element, the root, and
/// everything after it.
#[derive(Debug, Clone)]
pub struct XmlTree {
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
    pub epilog: Vec<XmlNode>,
}

impl XmlTree {
    pub fn parse(xml: &[u8]) -> Result<Self, DocxError> {
        let source = std::str::from_utf8(xml).map_err(DocxError::Encoding)?;
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(false);

        let mut top: Vec<XmlNode> = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            let node = match reader.read_event()? {
                Event::Start(start) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(DocxError::Malformed(format!(
                            "element nesting exceeds {MAX_DEPTH} levels"
                        )));
                    }
                    stack.push(XmlElement::new(Tag::from_start(start, false)));
                    continue;
                }
                Event::End(_) => match stack.pop() {
                    Some(element) => XmlNode::Element(element),
                    None => return Err(DocxError::Malformed("unbalanced end tag".to_string())),
                },
                Event::Empty(start) => XmlNode::Element(XmlElement::new(Tag::from_start(start, true))),
                Event::Text(text) => XmlNode::Text(text.into_owned()),
                Event::Eof => break,
                other => XmlNode::Other(other.into_owned()),
            };
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => top.push(node),
            }
        }

        if let Some(open) = stack.last() {
            return Err(DocxError::Malformed(format!(
                "unclosed element <{}>",
                String::from_utf8_lossy(open.tag.local_name())
            )));
        }

        let root_index = top
            .iter()
            .position(|n| matches!(n, XmlNode::Element(_)))
            .ok_or_else(|| DocxError::Malformed("no root element".to_string()))?;
        let epilog = top.split_off(root_index + 1);
        let root = match top.pop() {
            Some(XmlNode::Element(root)) => root,
            _ => return Err(DocxError::Malformed("no root element".to_string())),
        };

        Ok(Self {
            prolog: top,
            root,
            epilog,
        })
    }
}

/// Thin wrapper over `quick_xml::Writer` that knows how to emit tree nodes
/// and typed elements.
pub struct XmlSink {
    writer: Writer<Vec<u8>>,
}

impl Default for XmlSink {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlSink {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    /// Writes `tag`, the content produced by `body`, and the matching end tag.
    /// A tag that was self-closing in the source stays self-closing while it
    /// has no children.
    pub fn element<F>(&mut self, tag: &Tag, has_children: bool, body: F) -> Result<(), DocxError>
    where
        F: FnOnce(&mut Self) -> Result<(), DocxError>,
    {
        if tag.self_closing && !has_children {
            self.writer.write_event(Event::Empty(tag.start.borrow()))?;
            return Ok(());
        }
        self.writer.write_event(Event::Start(tag.start.borrow()))?;
        body(self)?;
        let end: BytesEnd<'_> = tag.start.to_end();
        self.writer.write_event(Event::End(end))?;
        Ok(())
    }

    pub fn node(&mut self, node: &XmlNode) -> Result<(), DocxError> {
        match node {
            XmlNode::Element(element) => self.tree_element(element),
            XmlNode::Text(text) => {
                self.writer.write_event(Event::Text(text.clone()))?;
                Ok(())
            }
            XmlNode::Other(event) => {
                self.writer.write_event(event.borrow())?;
                Ok(())
            }
        }
    }

    pub fn nodes(&mut self, nodes: &[XmlNode]) -> Result<(), DocxError> {
        nodes.iter().try_for_each(|n| self.node(n))
    }

    pub fn tree_element(&mut self, element: &XmlElement) -> Result<(), DocxError> {
        self.element(&element.tag, !element.children.is_empty(), |sink| {
            sink.nodes(&element.children)
        })
    }
}

/// Builds a text element (`w:t`) carrying `text`, with whitespace preserved.
pub fn text_element(name: &str, text: &str) -> XmlElement {
    let mut element = XmlElement::new(Tag::new(name).with_attribute("xml:space", "preserve"));
    element
        .children
        .push(XmlNode::Text(BytesText::new(text).into_owned()));
    element
}
