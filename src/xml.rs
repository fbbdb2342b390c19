//! Namespace-aware XML element tree.
//!
//! Built on quick-xml's `NsReader`, which never expands external entities.
//! Element names are kept exactly as written (prefix included) so templates
//! serialize back with their namespace declarations as written, while
//! lookups match on the resolved namespace URI and local name.

use crate::error::{IseeError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};

/// SOAP 1.1 envelope namespace.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
/// SOAP 1.2 envelope namespace.
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

/// One step of an absolute element path.
///
/// Matches an element by resolved namespace URI and local name, optionally
/// requiring an attribute value (`Property[@name="..."]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub namespace: Option<&'static str>,
    pub local_name: &'static str,
    pub attribute: Option<(&'static str, &'static str)>,
}

impl Step {
    /// Step matching a namespace-qualified element.
    pub const fn ns(namespace: &'static str, local_name: &'static str) -> Self {
        Self {
            namespace: Some(namespace),
            local_name,
            attribute: None,
        }
    }

    /// Step matching an element in no namespace.
    pub const fn local(local_name: &'static str) -> Self {
        Self {
            namespace: None,
            local_name,
            attribute: None,
        }
    }

    /// Additionally require `name="value"` on the element.
    pub const fn with_attribute(mut self, name: &'static str, value: &'static str) -> Self {
        self.attribute = Some((name, value));
        self
    }

    fn matches(&self, element: &Element) -> bool {
        element.local_name() == self.local_name
            && element.namespace.as_deref() == self.namespace
            && self
                .attribute
                .map_or(true, |(name, value)| element.attribute(name) == Some(value))
    }
}

/// Render a path for error messages.
pub fn describe_path(path: &[Step]) -> String {
    let mut out = String::new();
    for step in path {
        out.push('/');
        out.push_str(step.local_name);
        if let Some((name, value)) = step.attribute {
            out.push_str(&format!("[@{}=\"{}\"]", name, value));
        }
    }
    out
}

impl Element {
    /// Create an element with no namespace and no content.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse a document and return its root element.
    ///
    /// The XML declaration, comments, processing instructions and DOCTYPE are
    /// dropped. Whitespace-only text between elements is discarded; any other
    /// text is kept verbatim, including leading and trailing spaces.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolved, event) = reader
                .read_resolved_event()
                .map_err(|e| IseeError::XmlParse(e.to_string()))?;
            let namespace = match resolved {
                ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
                ResolveResult::Unbound => None,
                ResolveResult::Unknown(prefix) => {
                    return Err(IseeError::XmlParse(format!(
                        "Unknown namespace prefix '{}'",
                        String::from_utf8_lossy(&prefix)
                    )));
                }
            };

            match event {
                Event::Start(ref e) => stack.push(Self::from_start(e, namespace)?),
                Event::Empty(ref e) => {
                    let element = Self::from_start(e, namespace)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| IseeError::XmlParse("Unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(ref e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| IseeError::XmlParse(format!("Invalid text content: {}", e)))?;
                    if !text.trim().is_empty() {
                        push_text(&mut stack, &text);
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8(e.into_inner().into_owned())
                        .map_err(|e| IseeError::XmlParse(format!("Invalid UTF-8 in CDATA: {}", e)))?;
                    push_text(&mut stack, &text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(IseeError::XmlParse("Unexpected end of document".to_string()));
        }
        root.ok_or_else(|| IseeError::XmlParse("Document has no root element".to_string()))
    }

    fn from_start(start: &BytesStart<'_>, namespace: Option<String>) -> Result<Self> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| IseeError::XmlParse(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| IseeError::XmlParse(format!("Invalid attribute on <{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| IseeError::XmlParse(format!("Invalid attribute value on <{}>: {}", name, e)))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            namespace,
            attributes,
            children: Vec::new(),
        })
    }

    /// Qualified name as written, e.g. `SOAP-ENV:Body`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Resolved namespace URI.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element matching `step`.
    pub fn child(&self, step: &Step) -> Option<&Element> {
        self.child_elements().find(|child| step.matches(child))
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Replace all content with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
    }

    /// Append a child element and return a handle to it.
    pub fn append_child(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        match self.children.last_mut() {
            Some(Node::Element(e)) => e,
            _ => unreachable!("just pushed an element"),
        }
    }

    /// Append `<name>text</name>`.
    pub fn append_text_child(&mut self, name: &str, text: &str) -> &mut Element {
        let mut child = Element::new(name);
        child.set_text(text);
        self.append_child(child)
    }

    /// Find the first element matching an absolute path.
    ///
    /// The first step must match `self`, like an XPath rooted at the
    /// document element.
    pub fn find(&self, path: &[Step]) -> Option<&Element> {
        let (first, rest) = path.split_first()?;
        if !first.matches(self) {
            return None;
        }
        find_below(self, rest)
    }

    /// Mutable variant of [`Element::find`].
    pub fn find_mut(&mut self, path: &[Step]) -> Option<&mut Element> {
        let (first, rest) = path.split_first()?;
        if !first.matches(self) {
            return None;
        }
        let mut indices = Vec::with_capacity(rest.len());
        if !locate(self, rest, &mut indices) {
            return None;
        }
        let mut current = self;
        for index in indices {
            current = match current.children.get_mut(index) {
                Some(Node::Element(e)) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Serialize without an XML declaration or added whitespace.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_into(&mut writer)?;
        into_string(writer.into_inner())
    }

    /// Serialize with two-space indentation.
    pub fn to_pretty_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_into(&mut writer)?;
        into_string(writer.into_inner())
    }

    fn write_into<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start)).map_err(write_error)?;
            return Ok(());
        }

        writer.write_event(Event::Start(start)).map_err(write_error)?;
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_into(writer)?,
                Node::Text(t) => writer
                    .write_event(Event::Text(BytesText::new(t)))
                    .map_err(write_error)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(write_error)?;
        Ok(())
    }
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(IseeError::XmlParse("Multiple root elements".to_string())),
    }
}

fn push_text(stack: &mut [Element], text: &str) {
    // Text outside the root element is ignored.
    let Some(parent) = stack.last_mut() else {
        return;
    };
    match parent.children.last_mut() {
        Some(Node::Text(existing)) => existing.push_str(text),
        _ => parent.children.push(Node::Text(text.to_string())),
    }
}

fn find_below<'a>(element: &'a Element, path: &[Step]) -> Option<&'a Element> {
    let Some((step, rest)) = path.split_first() else {
        return Some(element);
    };
    element
        .child_elements()
        .filter(|child| step.matches(child))
        .find_map(|child| find_below(child, rest))
}

fn locate(element: &Element, path: &[Step], indices: &mut Vec<usize>) -> bool {
    let Some((step, rest)) = path.split_first() else {
        return true;
    };
    for (index, node) in element.children.iter().enumerate() {
        if let Node::Element(child) = node {
            if step.matches(child) {
                indices.push(index);
                if locate(child, rest, indices) {
                    return true;
                }
                indices.pop();
            }
        }
    }
    false
}

fn write_error(e: impl std::fmt::Display) -> IseeError {
    IseeError::XmlWrite(e.to_string())
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| IseeError::XmlWrite(format!("Invalid UTF-8 output: {}", e)))
}

/// Extract the fault message if `envelope` is a SOAP 1.1 or 1.2 fault.
pub fn soap_fault(envelope: &Element) -> Option<String> {
    const SOAP_11_FAULT: &[Step] = &[
        Step::ns(SOAP_11_NS, "Envelope"),
        Step::ns(SOAP_11_NS, "Body"),
        Step::ns(SOAP_11_NS, "Fault"),
    ];
    const SOAP_12_REASON: &[Step] = &[
        Step::ns(SOAP_12_NS, "Envelope"),
        Step::ns(SOAP_12_NS, "Body"),
        Step::ns(SOAP_12_NS, "Fault"),
        Step::ns(SOAP_12_NS, "Reason"),
        Step::ns(SOAP_12_NS, "Text"),
    ];

    if let Some(fault) = envelope.find(SOAP_11_FAULT) {
        // faultcode/faultstring are unqualified in SOAP 1.1.
        let message = fault
            .child_elements()
            .find(|e| e.local_name() == "faultstring")
            .map(Element::text)
            .unwrap_or_default();
        let code = fault
            .child_elements()
            .find(|e| e.local_name() == "faultcode")
            .map(Element::text)
            .unwrap_or_default();
        return Some(match (code.is_empty(), message.is_empty()) {
            (true, true) => "SOAP fault without message".to_string(),
            (false, true) => code,
            (true, false) => message,
            (false, false) => format!("{}: {}", code, message),
        });
    }

    envelope.find(SOAP_12_REASON).map(|text| {
        let reason = text.text();
        if reason.is_empty() {
            "SOAP fault without message".to_string()
        } else {
            reason
        }
    })
}
