//! Owned markup tree for vector documents.
//!
//! [`Document::parse`] reads SVG text with `quick-xml` into a tree the
//! customization engine can mutate freely; [`Document::to_xml`] writes it
//! back. Serialization is deterministic: attribute order is preserved,
//! values are always double-quoted and childless elements are self-closed,
//! so equal trees always produce byte-identical text.

use std::collections::HashMap;
use std::sync::LazyLock;

use quick_xml::escape::{escape, partial_escape, resolve_predefined_entity};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use super::error::ParseError;

/// Index path from the root element to a descendant element.
///
/// Each entry indexes into the `children` vector (all markup kinds, not
/// just elements) of the element at that depth.
pub type ElementPath = Vec<usize>;

/// One node of markup content.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element(Element),
    /// Character data, stored unescaped.
    Text(String),
    CData(String),
    Comment(String),
    /// Processing instruction body, without the `<?` `?>` delimiters.
    Instruction(String),
    /// XML declaration body, e.g. `xml version="1.0"`.
    Declaration(String),
    DocType(String),
}

/// A markup element with its attributes in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Markup>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Element name without its namespace prefix (`svg:g` -> `g`).
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Namespace prefix of the element name, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place so that
    /// attribute order stays stable.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Direct child elements, skipping text, comments and the like.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Markup::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Concatenated character data of every descendant.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &idx in path {
            current = match current.children.get(idx)? {
                Markup::Element(el) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &idx in path {
            current = match current.children.get_mut(idx)? {
                Markup::Element(el) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_to(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Markup::Text(text) | Markup::CData(text) => out.push_str(text),
            Markup::Element(inner) => collect_text(inner, out),
            _ => {}
        }
    }
}

impl Markup {
    fn write_to(&self, out: &mut String) {
        match self {
            Markup::Element(el) => el.write_to(out),
            Markup::Text(text) => out.push_str(&partial_escape(text.as_str())),
            Markup::CData(data) => {
                out.push_str("<![CDATA[");
                out.push_str(data);
                out.push_str("]]>");
            }
            Markup::Comment(body) => {
                out.push_str("<!--");
                out.push_str(body);
                out.push_str("-->");
            }
            Markup::Instruction(body) | Markup::Declaration(body) => {
                out.push_str("<?");
                out.push_str(body);
                out.push_str("?>");
            }
            Markup::DocType(body) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(body.trim_start());
                out.push('>');
            }
        }
    }
}

/// A complete markup document: prolog, root element and epilog.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub prolog: Vec<Markup>,
    pub root: Element,
    pub epilog: Vec<Markup>,
}

impl Document {
    /// Read `text` into an owned tree.
    ///
    /// General entities declared in the DOCTYPE internal subset (as in
    /// Illustrator exports) are expanded in text and attribute values.
    /// Mismatched or unclosed tags, duplicate attributes, undeclared entity
    /// references, multiple roots and stray text outside the root are all
    /// reported as [`ParseError`]s.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().check_end_names = true;

        let mut builder = TreeBuilder::default();
        let mut entities = Entities::default();

        loop {
            let event = reader.read_event().map_err(|e| ParseError::Malformed {
                position: reader.error_position() as u64,
                message: e.to_string(),
            })?;
            let position = reader.buffer_position() as u64;

            match event {
                Event::Start(start) => {
                    let el = element_from_start(&start, position, &entities)?;
                    builder.open.push(el);
                }
                Event::Empty(start) => {
                    let el = element_from_start(&start, position, &entities)?;
                    builder.attach(Markup::Element(el))?;
                }
                Event::End(_) => {
                    let el = builder.open.pop().ok_or_else(|| ParseError::Malformed {
                        position,
                        message: "closing tag without a matching opening tag".to_string(),
                    })?;
                    builder.attach(Markup::Element(el))?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape_with(|name| entities.resolve(name))
                        .map_err(|e| ParseError::Malformed {
                        position,
                        message: e.to_string(),
                    })?;
                    builder.attach(Markup::Text(text.into_owned()))?;
                }
                Event::CData(data) => {
                    builder.attach(Markup::CData(String::from_utf8_lossy(&data).into_owned()))?;
                }
                Event::Comment(body) => {
                    builder.attach(Markup::Comment(String::from_utf8_lossy(&body).into_owned()))?;
                }
                Event::Decl(decl) => {
                    builder.attach(Markup::Declaration(
                        String::from_utf8_lossy(&decl).into_owned(),
                    ))?;
                }
                Event::PI(body) => {
                    builder.attach(Markup::Instruction(
                        String::from_utf8_lossy(&body).into_owned(),
                    ))?;
                }
                Event::DocType(body) => {
                    let body = String::from_utf8_lossy(&body).into_owned();
                    entities = Entities::declared_in(&body);
                    builder.attach(Markup::DocType(body))?;
                }
                Event::Eof => break,
            }
        }

        builder.finish()
    }

    /// Serialize the document back to text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.prolog {
            node.write_to(&mut out);
        }
        self.root.write_to(&mut out);
        for node in &self.epilog {
            node.write_to(&mut out);
        }
        out
    }
}

/// Stack-based assembly of the owned tree from reader events.
#[derive(Default)]
struct TreeBuilder {
    open: Vec<Element>,
    root: Option<Element>,
    prolog: Vec<Markup>,
    epilog: Vec<Markup>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Markup) -> Result<(), ParseError> {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(node);
            return Ok(());
        }

        match node {
            Markup::Element(el) => {
                if self.root.is_some() {
                    return Err(ParseError::MultipleRoots);
                }
                self.root = Some(el);
            }
            Markup::Text(ref text) if !text.trim().is_empty() => {
                return Err(ParseError::TextOutsideRoot);
            }
            Markup::CData(_) => return Err(ParseError::TextOutsideRoot),
            other => {
                if self.root.is_none() {
                    self.prolog.push(other);
                } else {
                    self.epilog.push(other);
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Document, ParseError> {
        if let Some(unclosed) = self.open.pop() {
            return Err(ParseError::Unclosed(unclosed.name));
        }
        let root = self.root.ok_or(ParseError::MissingRoot)?;
        Ok(Document {
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }
}

/// `<!ENTITY name "value">` in a DOCTYPE internal subset. Parameter
/// entities (`<!ENTITY % ...>`) and external entities are not matched.
static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!ENTITY\s+([A-Za-z_:][\w.:-]*)\s+(?:"([^"]*)"|'([^']*)')\s*>"#)
        .expect("valid regex")
});

/// General entities declared by the document, plus the predefined ones.
#[derive(Debug, Default)]
struct Entities(HashMap<String, String>);

impl Entities {
    fn declared_in(doctype: &str) -> Self {
        let declared = ENTITY_DECL
            .captures_iter(doctype)
            .filter_map(|caps| {
                let value = caps.get(2).or_else(|| caps.get(3))?;
                Some((caps[1].to_string(), value.as_str().to_string()))
            })
            .collect();
        Self(declared)
    }

    fn resolve(&self, name: &str) -> Option<&str> {
        resolve_predefined_entity(name).or_else(|| self.0.get(name).map(String::as_str))
    }
}

fn element_from_start(
    start: &BytesStart<'_>,
    position: u64,
    entities: &Entities,
) -> Result<Element, ParseError> {
    let malformed = |message: String| ParseError::Malformed { position, message };

    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| malformed(e.to_string()))?
        .to_string();

    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| malformed(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value_with(|name| entities.resolve(name))
            .map_err(|e| malformed(e.to_string()))?
            .into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}
