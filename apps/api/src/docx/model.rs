//! Typed view of `word/document.xml`.
//!
//! The parser discriminates body children once, into `Block::Paragraph` and
//! `Block::Table`. Everything the protocol does not reason about (paragraph and
//! run properties, section properties, bookmarks, drawings, nested tables) is
//! kept as opaque XML and written back untouched.

use crate::docx::xml::{text_element, Tag, XmlElement, XmlNode, XmlSink, XmlTree};
use crate::docx::DocxError;

/// Elements inside a paragraph whose runs belong to the paragraph's own run sequence.
const RUN_CONTAINERS: &[&str] = &["hyperlink", "smartTag", "ins"];

// ────────────────────────────────────────────────────────────────────────────
// Tree plumbing
// ────────────────────────────────────────────────────────────────────────────

/// A child slot: either a typed node or anything else carried verbatim.
#[derive(Debug, Clone)]
pub enum Child<T> {
    Node(T),
    Other(XmlNode),
}

impl<T> Child<T> {
    pub fn node(&self) -> Option<&T> {
        match self {
            Child::Node(n) => Some(n),
            Child::Other(_) => None,
        }
    }

    pub fn node_mut(&mut self) -> Option<&mut T> {
        match self {
            Child::Node(n) => Some(n),
            Child::Other(_) => None,
        }
    }
}

trait WriteXml {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError>;
}

impl<T: WriteXml> WriteXml for Child<T> {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        match self {
            Child::Node(n) => n.write_xml(sink),
            Child::Other(node) => sink.node(node),
        }
    }
}

fn write_children<T: WriteXml>(sink: &mut XmlSink, tag: &Tag, items: &[T]) -> Result<(), DocxError> {
    sink.element(tag, !items.is_empty(), |sink| {
        items.iter().try_for_each(|item| item.write_xml(sink))
    })
}

/// Splits `children` into typed nodes named `local` and opaque siblings.
fn parse_children<T>(
    children: Vec<XmlNode>,
    local: &str,
    parse: fn(XmlElement) -> Result<T, DocxError>,
) -> Result<Vec<Child<T>>, DocxError> {
    children
        .into_iter()
        .map(|node| match node {
            XmlNode::Element(el) if el.tag.is(local) => parse(el).map(Child::Node),
            other => Ok(Child::Other(other)),
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

/// The main document part. `Clone` gives an independent deep copy.
#[derive(Debug, Clone)]
pub struct Document {
    prolog: Vec<XmlNode>,
    root: Tag,
    /// Root children other than the body.
    root_children: Vec<XmlNode>,
    /// Position of the body among the root children.
    body_index: usize,
    body: Tag,
    pub(super) items: Vec<Child<Block>>,
    epilog: Vec<XmlNode>,
}

impl Document {
    pub fn parse(xml: &[u8]) -> Result<Self, DocxError> {
        let XmlTree {
            prolog,
            root,
            epilog,
        } = XmlTree::parse(xml)?;

        if !root.tag.is("document") {
            return Err(DocxError::Malformed(format!(
                "expected a <w:document> root, found <{}>",
                String::from_utf8_lossy(root.tag.local_name())
            )));
        }

        let XmlElement {
            tag: root_tag,
            children: mut root_children,
        } = root;
        let body_index = root_children
            .iter()
            .position(|n| matches!(n, XmlNode::Element(el) if el.tag.is("body")))
            .ok_or_else(|| DocxError::Malformed("document has no <w:body>".to_string()))?;
        let body = match root_children.remove(body_index) {
            XmlNode::Element(el) => el,
            _ => return Err(DocxError::Malformed("document has no <w:body>".to_string())),
        };

        let items = body
            .children
            .into_iter()
            .map(parse_body_child)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            prolog,
            root: root_tag,
            root_children,
            body_index,
            body: body.tag,
            items,
            epilog,
        })
    }

    pub fn to_xml(&self) -> Result<Vec<u8>, DocxError> {
        let mut sink = XmlSink::new();
        sink.nodes(&self.prolog)?;
        sink.element(&self.root, true, |sink| {
            for (i, child) in self.root_children.iter().enumerate() {
                if i == self.body_index {
                    write_children(sink, &self.body, &self.items)?;
                }
                sink.node(child)?;
            }
            if self.body_index >= self.root_children.len() {
                write_children(sink, &self.body, &self.items)?;
            }
            Ok(())
        })?;
        sink.nodes(&self.epilog)?;
        Ok(sink.into_inner())
    }
}

fn parse_body_child(node: XmlNode) -> Result<Child<Block>, DocxError> {
    match node {
        XmlNode::Element(el) if el.tag.is("p") => {
            Ok(Child::Node(Block::Paragraph(Paragraph::from_element(el)?)))
        }
        XmlNode::Element(el) if el.tag.is("tbl") => {
            Ok(Child::Node(Block::Table(Table::from_element(el)?)))
        }
        other => Ok(Child::Other(other)),
    }
}

/// A top-level body block.
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

impl WriteXml for Block {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        match self {
            Block::Paragraph(p) => p.write_xml(sink),
            Block::Table(t) => t.write_xml(sink),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Paragraphs and runs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Paragraph {
    tag: Tag,
    items: Vec<ParagraphItem>,
}

#[derive(Debug, Clone)]
enum ParagraphItem {
    Run(Run),
    /// Hyperlinks and similar wrappers whose runs count as paragraph runs.
    Container { tag: Tag, items: Vec<ParagraphItem> },
    Other(XmlNode),
}

impl ParagraphItem {
    fn parse_all(children: Vec<XmlNode>) -> Result<Vec<Self>, DocxError> {
        children
            .into_iter()
            .map(|node| match node {
                XmlNode::Element(el) if el.tag.is("r") => Ok(ParagraphItem::Run(Run::from_element(el)?)),
                XmlNode::Element(XmlElement { tag, children })
                    if RUN_CONTAINERS.iter().any(|c| tag.is(c)) =>
                {
                    Ok(ParagraphItem::Container {
                        tag,
                        items: Self::parse_all(children)?,
                    })
                }
                other => Ok(ParagraphItem::Other(other)),
            })
            .collect()
    }
}

impl WriteXml for ParagraphItem {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        match self {
            ParagraphItem::Run(run) => run.write_xml(sink),
            ParagraphItem::Container { tag, items } => write_children(sink, tag, items),
            ParagraphItem::Other(node) => sink.node(node),
        }
    }
}

fn collect_runs<'a>(items: &'a [ParagraphItem], out: &mut Vec<&'a Run>) {
    for item in items {
        match item {
            ParagraphItem::Run(run) => out.push(run),
            ParagraphItem::Container { items, .. } => collect_runs(items, out),
            ParagraphItem::Other(_) => {}
        }
    }
}

fn collect_runs_mut<'a>(items: &'a mut [ParagraphItem], out: &mut Vec<&'a mut Run>) {
    for item in items.iter_mut() {
        match item {
            ParagraphItem::Run(run) => out.push(run),
            ParagraphItem::Container { items, .. } => collect_runs_mut(items, out),
            ParagraphItem::Other(_) => {}
        }
    }
}

impl Paragraph {
    fn from_element(el: XmlElement) -> Result<Self, DocxError> {
        Ok(Self {
            tag: el.tag,
            items: ParagraphItem::parse_all(el.children)?,
        })
    }

    /// Runs in document order, including those inside hyperlinks.
    pub fn runs(&self) -> Vec<&Run> {
        let mut out = Vec::new();
        collect_runs(&self.items, &mut out);
        out
    }

    pub fn runs_mut(&mut self) -> Vec<&mut Run> {
        let mut out = Vec::new();
        collect_runs_mut(&mut self.items, &mut out);
        out
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs().iter().map(|r| r.text()).collect()
    }

    /// Puts `text` into the first run and empties every other run. A paragraph
    /// without runs gets a single unstyled run (only when `text` is non-empty).
    pub fn set_text(&mut self, text: &str) {
        let mut runs = self.runs_mut();
        if runs.is_empty() {
            if !text.is_empty() {
                let run = Run::plain(&self.tag, text);
                self.items.push(ParagraphItem::Run(run));
            }
            return;
        }
        for (i, run) in runs.iter_mut().enumerate() {
            run.set_text(if i == 0 { text } else { "" });
        }
    }
}

impl WriteXml for Paragraph {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        write_children(sink, &self.tag, &self.items)
    }
}

/// A styled span of text. The run properties (`w:rPr`) are opaque.
#[derive(Debug, Clone)]
pub struct Run {
    tag: Tag,
    items: Vec<RunItem>,
}

#[derive(Debug, Clone)]
enum RunItem {
    Text { element: XmlElement, text: String },
    Tab(XmlElement),
    /// Text-wrapping line break (`w:br` without a page/column type, or `w:cr`).
    Break(XmlElement),
    Other(XmlNode),
}

impl RunItem {
    fn is_text(&self) -> bool {
        !matches!(self, RunItem::Other(_))
    }
}

impl WriteXml for RunItem {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        match self {
            RunItem::Text { element, .. } | RunItem::Tab(element) | RunItem::Break(element) => {
                sink.tree_element(element)
            }
            RunItem::Other(node) => sink.node(node),
        }
    }
}

fn is_line_break(tag: &Tag) -> bool {
    if tag.is("cr") {
        return true;
    }
    tag.is("br")
        && matches!(
            tag.attribute("type").as_deref(),
            None | Some("textWrapping")
        )
}

impl Run {
    fn from_element(el: XmlElement) -> Result<Self, DocxError> {
        let items = el
            .children
            .into_iter()
            .map(|node| match node {
                XmlNode::Element(child) if child.tag.is("t") => {
                    let text = child.text()?;
                    Ok(RunItem::Text {
                        element: child,
                        text,
                    })
                }
                XmlNode::Element(child) if child.tag.is("tab") => Ok(RunItem::Tab(child)),
                XmlNode::Element(child) if is_line_break(&child.tag) => Ok(RunItem::Break(child)),
                other => Ok(RunItem::Other(other)),
            })
            .collect::<Result<Vec<_>, DocxError>>()?;
        Ok(Self { tag: el.tag, items })
    }

    /// A run with no properties, named in the namespace of `paragraph`.
    fn plain(paragraph: &Tag, text: &str) -> Self {
        let tag = Tag::new(&paragraph.sibling_name("r"));
        let items = text_items(&tag, text);
        Self { tag, items }
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                RunItem::Text { text, .. } => out.push_str(text),
                RunItem::Tab(_) => out.push('\t'),
                RunItem::Break(_) => out.push('\n'),
                RunItem::Other(_) => {}
            }
        }
        out
    }

    /// Replaces the run's text content in place. Properties and non-text
    /// children (drawings, field characters, page breaks) stay where they are.
    pub fn set_text(&mut self, text: &str) {
        let at = self
            .items
            .iter()
            .position(RunItem::is_text)
            .unwrap_or(self.items.len());
        self.items.retain(|item| !item.is_text());
        let at = at.min(self.items.len());
        let new_items = text_items(&self.tag, text);
        self.items.splice(at..at, new_items);
    }
}

impl WriteXml for Run {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        write_children(sink, &self.tag, &self.items)
    }
}

/// Encodes `text` as `w:t` segments, with `\t` as `w:tab` and `\n` as `w:br`.
fn text_items(run: &Tag, text: &str) -> Vec<RunItem> {
    fn flush(run: &Tag, buf: &mut String, items: &mut Vec<RunItem>) {
        if !buf.is_empty() {
            let text = std::mem::take(buf);
            items.push(RunItem::Text {
                element: text_element(&run.sibling_name("t"), &text),
                text,
            });
        }
    }

    let mut items = Vec::new();
    let mut buf = String::new();
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(run, &mut buf, &mut items);
                items.push(RunItem::Tab(XmlElement::new(Tag::new(&run.sibling_name("tab")))));
            }
            '\n' => {
                flush(run, &mut buf, &mut items);
                items.push(RunItem::Break(XmlElement::new(Tag::new(&run.sibling_name("br")))));
            }
            _ => buf.push(ch),
        }
    }
    flush(run, &mut buf, &mut items);
    items
}

// ────────────────────────────────────────────────────────────────────────────
// Tables
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Table {
    tag: Tag,
    items: Vec<Child<Row>>,
}

impl Table {
    fn from_element(el: XmlElement) -> Result<Self, DocxError> {
        Ok(Self {
            tag: el.tag,
            items: parse_children(el.children, "tr", Row::from_element)?,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.items.iter().filter_map(Child::node)
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.items.iter_mut().filter_map(Child::node_mut)
    }
}

impl WriteXml for Table {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        write_children(sink, &self.tag, &self.items)
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    tag: Tag,
    items: Vec<Child<Cell>>,
}

impl Row {
    fn from_element(el: XmlElement) -> Result<Self, DocxError> {
        Ok(Self {
            tag: el.tag,
            items: parse_children(el.children, "tc", Cell::from_element)?,
        })
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.items.iter().filter_map(Child::node)
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.items.iter_mut().filter_map(Child::node_mut)
    }
}

impl WriteXml for Row {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        write_children(sink, &self.tag, &self.items)
    }
}

/// A table cell. Nested tables are opaque.
#[derive(Debug, Clone)]
pub struct Cell {
    tag: Tag,
    items: Vec<Child<Paragraph>>,
}

impl Cell {
    fn from_element(el: XmlElement) -> Result<Self, DocxError> {
        Ok(Self {
            tag: el.tag,
            items: parse_children(el.children, "p", Paragraph::from_element)?,
        })
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.items.iter().filter_map(Child::node)
    }

    pub fn first_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        self.items.iter_mut().find_map(Child::node_mut)
    }
}

impl WriteXml for Cell {
    fn write_xml(&self, sink: &mut XmlSink) -> Result<(), DocxError> {
        write_children(sink, &self.tag, &self.items)
    }
}
