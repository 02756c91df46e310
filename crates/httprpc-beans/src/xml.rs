//! Dictionary view over XML documents.

use std::borrow::Cow;

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use crate::adapt::Adapt;
use crate::dictionary::{Dictionary, Elements, Entries, Sequence};
use crate::error::{AdapterError, Result};
use crate::value::Value;

const ATTRIBUTE_PREFIX: char = '@';
const LIST_SUFFIX: char = '*';
const TEXT_KEY: &str = ".";

/// Content of an element, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Parsed XML element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    name: String,
    attributes: IndexMap<String, String>,
    content: Vec<Node>,
}

impl Element {
    /// Parses a document and returns its root element.
    ///
    /// Whitespace-only text is dropped; comments, processing instructions
    /// and the declaration are ignored.
    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);

        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event().map_err(AdapterError::xml)? {
                Event::Start(start) => open.push(Element::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    attach(&mut open, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = open.pop() {
                        attach(&mut open, &mut root, element);
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(AdapterError::xml)?;
                    if text.trim().is_empty() {
                        continue;
                    }
                    if let Some(parent) = open.last_mut() {
                        parent.content.push(Node::Text(text.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = open.last_mut() {
                        let text = String::from_utf8_lossy(&data).into_owned();
                        parent.content.push(Node::Text(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(AdapterError::Xml(format!(
                "element <{}> is never closed",
                unclosed.name
            )));
        }
        let root = root.ok_or_else(|| AdapterError::Xml("document has no root element".into()))?;
        trace!(root = %root.name, "parsed XML document");
        Ok(root)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = IndexMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(AdapterError::xml)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(AdapterError::xml)?.into_owned();
            attributes.insert(key, value);
        }
        Ok(Element {
            name,
            attributes,
            content: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Direct child elements.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.content.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of this element and all its descendants.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.content {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Every descendant element named `name`, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in self.children() {
            if child.name == name {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }
}

fn attach(open: &mut [Element], root: &mut Option<Element>, element: Element) {
    match open.last_mut() {
        Some(parent) => parent.content.push(Node::Element(element)),
        None => {
            root.get_or_insert(element);
        }
    }
}

impl Adapt for Element {
    fn adapt(&self) -> Value<'_> {
        Value::dictionary(ElementAdapter::new(self))
    }
}

/// Read-only [`Dictionary`] over an [`Element`].
///
/// - `@name` resolves to the attribute value.
/// - `name` resolves to the last descendant element with that tag.
/// - `name*` resolves to every descendant element with that tag.
/// - `.` resolves to the element's text content.
///
/// ```
/// use httprpc_beans::{Dictionary, Element, ElementAdapter};
///
/// let root = Element::parse(r#"<order id="7"><item>a</item><item>b</item></order>"#).unwrap();
/// let order = ElementAdapter::new(&root);
/// assert_eq!(order.get("@id").unwrap().as_str(), Some("7"));
/// ```
pub struct ElementAdapter<'a> {
    element: &'a Element,
}

impl<'a> ElementAdapter<'a> {
    pub fn new(element: &'a Element) -> Self {
        ElementAdapter { element }
    }
}

impl Dictionary for ElementAdapter<'_> {
    fn get(&self, key: &str) -> Option<Value<'_>> {
        if key == TEXT_KEY {
            return Some(Value::String(Cow::Owned(self.element.text_content())));
        }
        if let Some(name) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            return self.element.attribute(name).map(Value::from);
        }
        if let Some(tag) = key.strip_suffix(LIST_SUFFIX) {
            return Some(Value::sequence(ElementList {
                elements: self.element.descendants_named(tag),
            }));
        }
        self.element
            .descendants_named(key)
            .into_iter()
            .last()
            .map(Adapt::adapt)
    }

    fn entries(&self) -> Entries<'_> {
        Box::new(self.element.attributes.iter().map(|(name, value)| {
            (
                Cow::Owned(format!("{ATTRIBUTE_PREFIX}{name}")),
                Value::from(value.as_str()),
            )
        }))
    }
}

struct ElementList<'a> {
    elements: Vec<&'a Element>,
}

impl Sequence for ElementList<'_> {
    fn elements(&self) -> Elements<'_> {
        Box::new(self.elements.iter().map(|element| Ok(Adapt::adapt(*element))))
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.elements.is_empty())
    }
}
