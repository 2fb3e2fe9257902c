//! An ordered tree of named nodes with attributes and children.
//!
//! [`Document`] is read from XML text with `quick-xml` and written back out
//! without reformatting. Comments, CDATA sections, processing instructions
//! and whitespace are all kept as nodes, along with a leading UTF-8 byte
//! order mark. A document that is parsed and written again without
//! modification comes back out byte-for-byte, apart from attribute quoting,
//! which is normalised to double quotes, and whitespace inside tags, which is
//! normalised to a single space between attributes.

use std::{borrow::Cow, fmt, str::FromStr};

use quick_xml::{
    escape::{escape, unescape},
    events::{BytesStart, Event},
    Reader,
};

use crate::domain::Selector;

/// A single node in a [`Document`] tree.
///
/// Character data is stored in its escaped source form, so entity references
/// survive a round trip untouched. Use [`Element::text`] to read the
/// unescaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data, still escaped.
    Text(String),
    /// The contents of a `<![CDATA[ ... ]]>` section.
    CData(String),
    /// The contents of a `<!-- ... -->` comment.
    Comment(String),
    /// The contents of a `<? ... ?>` processing instruction.
    ProcessingInstruction(String),
    /// The contents of the `<?xml ... ?>` declaration.
    Declaration(String),
    /// The contents of a `<!DOCTYPE ... >` declaration.
    DocType(String),
}

impl Node {
    /// Creates a text node from unescaped text.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(escape(text).into_owned())
    }

    /// Returns the element if this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Returns `true` for text nodes made only of whitespace.
    #[must_use]
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// A named element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    /// Attribute values are stored unescaped.
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
    /// Whether the element was written as `<name/>` in the source.
    self_closing: bool,
}

impl Element {
    /// Creates an empty element.
    ///
    /// An element without children is written in its self-closing form.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// Builder-style variant of [`Element::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style variant of [`Element::push`].
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.push(child);
        self
    }

    /// Appends a single text child holding the given unescaped text.
    #[must_use]
    pub fn with_text(self, text: &str) -> Self {
        self.with_child(Node::text(text))
    }

    /// The qualified name, including any namespace prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name with any namespace prefix removed.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Returns the unescaped value of the named attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over attributes in source order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Sets an attribute, replacing the value in place if it already exists.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    /// All child nodes in order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Appends a child node.
    pub fn push(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
        self.self_closing = false;
    }

    /// Removes and returns the last child node.
    pub fn pop(&mut self) -> Option<Node> {
        self.children.pop()
    }

    /// Iterates over the child elements, skipping text and other nodes.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Returns the first child element with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.elements().find(|element| element.name == name)
    }

    /// Returns the first child element with the given name, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    /// The unescaped concatenation of all direct text and CDATA children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(raw) => Some(unescape(raw).unwrap_or(Cow::Borrowed(raw.as_str()))),
                Node::CData(data) => Some(Cow::Borrowed(data.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Iterates over every element below this one in document order.
    ///
    /// The element itself is not included.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    /// Returns the child indices leading to the first element matching
    /// `selector`, searching in document order.
    fn path_to(&self, selector: &Selector, descend: bool, path: &mut Vec<usize>) -> bool {
        for (index, node) in self.children.iter().enumerate() {
            if let Node::Element(child) = node {
                path.push(index);
                if selector.matches(child) || (descend && child.path_to(selector, descend, path)) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Self> {
        let mut element = self;
        for &index in path {
            element = match element.children.get_mut(index)? {
                Node::Element(child) => child,
                _ => return None,
            };
        }
        Some(element)
    }

    /// Returns the first element below this one that matches `selector`,
    /// mutably.
    pub(crate) fn find_mut(&mut self, selector: &Selector) -> Option<&mut Self> {
        let mut path = Vec::new();
        if self.path_to(selector, selector.scope().is_recursive(), &mut path) {
            self.at_path_mut(&path)
        } else {
            None
        }
    }

    fn from_start(start: &BytesStart<'_>, self_closing: bool) -> Result<Self, ParseError> {
        let name = utf8(start.name().as_ref())?;
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| ParseError::Attribute {
                element: name.clone(),
                message: e.to_string(),
            })?;
            let key = utf8(attribute.key.as_ref())?;
            let value = attribute
                .unescape_value()
                .map_err(|e| ParseError::Attribute {
                    element: name.clone(),
                    message: e.to_string(),
                })?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            self_closing,
        })
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}=\"{}\"", escape(value))?;
        }
        if self.children.is_empty() && self.self_closing {
            return f.write_str("/>");
        }
        f.write_str(">")?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "</{}>", self.name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => write!(f, "{element}"),
            Self::Text(raw) => f.write_str(raw),
            Self::CData(data) => write!(f, "<![CDATA[{data}]]>"),
            Self::Comment(comment) => write!(f, "<!--{comment}-->"),
            Self::ProcessingInstruction(content) | Self::Declaration(content) => {
                write!(f, "<?{content}?>")
            }
            Self::DocType(content) => write!(f, "<!DOCTYPE {content}>"),
        }
    }
}

/// Pre-order iterator over the elements below an [`Element`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(siblings) = self.stack.last_mut() {
            match siblings.next() {
                Some(Node::Element(element)) => {
                    self.stack.push(element.children.iter());
                    return Some(element);
                }
                Some(_) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

/// Errors raised while reading a [`Document`] from XML text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The underlying reader rejected the input.
    #[error("malformed XML at byte {position}: {message}")]
    Syntax {
        /// Byte offset of the error.
        position: u64,
        /// The reader's description of the problem.
        message: String,
    },

    /// An attribute could not be read.
    #[error("invalid attribute on <{element}>: {message}")]
    Attribute {
        /// The element carrying the attribute.
        element: String,
        /// The reader's description of the problem.
        message: String,
    },

    /// The input contained no element at all.
    #[error("document has no root element")]
    NoRoot,

    /// A second top-level element followed the root.
    #[error("document has more than one root element (found <{0}> after the root)")]
    MultipleRoots(String),

    /// The input ended before an element was closed.
    #[error("element <{0}> is never closed")]
    Unclosed(String),

    /// Non-whitespace text or CDATA appeared outside the root element.
    #[error("unexpected content outside the root element")]
    ContentOutsideRoot,

    /// Names or character data were not valid UTF-8.
    #[error("document is not valid UTF-8")]
    Encoding,
}

/// A parsed structured document with a single root element.
///
/// Nodes before the root (the XML declaration, comments, a doctype) and
/// after it are kept separately so they survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Whether the text started with a byte order mark.
    bom: bool,
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
}

impl Document {
    /// Creates a document with the given root and nothing around it.
    #[must_use]
    pub const fn new(root: Element) -> Self {
        Self {
            bom: false,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parses XML text into a document.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the text is not well-formed, has no root
    /// element, or has content outside the root.
    pub fn parse(xml: &str) -> Result<Self, ParseError> {
        let (bom, xml) = xml
            .strip_prefix(BOM)
            .map_or((false, xml), |rest| (true, rest));
        let mut reader = Reader::from_str(xml);
        let mut open: Vec<Element> = Vec::new();
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| ParseError::Syntax {
                position: u64::try_from(reader.error_position()).unwrap_or(u64::MAX),
                message: e.to_string(),
            })?;

            let node = match event {
                Event::Start(start) => {
                    open.push(Element::from_start(&start, false)?);
                    continue;
                }
                Event::Empty(start) => Node::Element(Element::from_start(&start, true)?),
                Event::End(_) => {
                    let element = open.pop().ok_or(ParseError::Syntax {
                        position: u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX),
                        message: "unmatched closing tag".to_owned(),
                    })?;
                    Node::Element(element)
                }
                Event::Text(text) => Node::Text(utf8(&text)?),
                Event::CData(data) => Node::CData(utf8(&data)?),
                Event::Comment(comment) => Node::Comment(utf8(&comment)?),
                Event::PI(instruction) => Node::ProcessingInstruction(utf8(&instruction)?),
                Event::Decl(declaration) => Node::Declaration(utf8(&declaration)?),
                Event::DocType(doctype) => Node::DocType(utf8(&doctype)?),
                Event::Eof => break,
            };

            if let Some(parent) = open.last_mut() {
                parent.children.push(node);
                continue;
            }

            match node {
                Node::Element(element) if root.is_none() => root = Some(element),
                Node::Element(element) => return Err(ParseError::MultipleRoots(element.name)),
                Node::Text(_) | Node::CData(_) if !node.is_whitespace() => {
                    return Err(ParseError::ContentOutsideRoot);
                }
                other if root.is_none() => prolog.push(other),
                other => epilog.push(other),
            }
        }

        if let Some(unclosed) = open.pop() {
            return Err(ParseError::Unclosed(unclosed.name));
        }

        Ok(Self {
            bom,
            prolog,
            root: root.ok_or(ParseError::NoRoot)?,
            epilog,
        })
    }

    /// The root element.
    #[must_use]
    pub const fn root(&self) -> &Element {
        &self.root
    }

    /// The root element, mutably.
    pub const fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Returns the first element matching `selector`, searching from the root
    /// in document order.
    #[must_use]
    pub fn find(&self, selector: &Selector) -> Option<&Element> {
        selector.find(&self.root)
    }

    /// Mutable variant of [`Document::find`].
    pub fn find_mut(&mut self, selector: &Selector) -> Option<&mut Element> {
        self.root.find_mut(selector)
    }
}

impl FromStr for Document {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bom {
            write!(f, "{BOM}")?;
        }
        for node in &self.prolog {
            write!(f, "{node}")?;
        }
        write!(f, "{}", self.root)?;
        for node in &self.epilog {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

const BOM: char = '\u{feff}';

fn utf8(bytes: &[u8]) -> Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(ToOwned::to_owned)
        .map_err(|_| ParseError::Encoding)
}
