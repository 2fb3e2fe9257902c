//! Reading and updating a Maven project descriptor.
//!
//! Only `/project/properties/*` and `/project/dependencies/dependency` are
//! read. New declarations are appended to those containers, which are
//! created when missing, using the indentation already found in the file.

use std::{collections::HashSet, fmt};

use crate::domain::{
    declaration::{DeclarationError, dependencies_in, properties_in},
    Declaration, DeclarationSet, Document, Element, Node, ParseError,
};

const PROJECT: &str = "project";
const PROPERTIES: &str = "properties";
const DEPENDENCIES: &str = "dependencies";

/// One indentation level, used when the file gives no better hint.
const UNIT: &str = "    ";

/// A parsed `pom.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pom {
    document: Document,
}

impl Pom {
    /// Parses a project descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not well-formed or its root is not
    /// `<project>`.
    pub fn parse(xml: &str) -> Result<Self, PomError> {
        let document = Document::parse(xml)?;
        if document.root().local_name() != PROJECT {
            return Err(PomError::NotAProject(document.root().name().to_owned()));
        }
        Ok(Self { document })
    }

    /// The declarations currently in the project.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing property or dependency cannot be read.
    pub fn declarations(&self) -> Result<DeclarationSet, PomError> {
        let project = self.document.root();
        let mut set = DeclarationSet::new();
        if let Some(properties) = project.child(PROPERTIES) {
            set.extend(properties_in(properties)?);
        }
        if let Some(dependencies) = project.child(DEPENDENCIES) {
            set.extend(dependencies_in(dependencies)?);
        }
        Ok(set)
    }

    /// Appends declarations to the project, skipping any whose key is
    /// already present, either in the file or earlier in `declarations`.
    ///
    /// Returns the declarations that were written, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing declarations cannot be read.
    pub fn add(&mut self, declarations: &[Declaration]) -> Result<Vec<Declaration>, PomError> {
        let current = self.declarations()?;
        let mut seen = HashSet::new();
        let written: Vec<Declaration> = declarations
            .iter()
            .filter(|declaration| {
                let key = declaration.key();
                !current.contains(&key) && seen.insert(key)
            })
            .cloned()
            .collect();

        let (properties, dependencies): (Vec<_>, Vec<_>) = written
            .iter()
            .partition(|declaration| matches!(declaration, Declaration::Property(_)));

        let project = self.document.root_mut();
        append_all(project, PROPERTIES, &properties);
        append_all(project, DEPENDENCIES, &dependencies);

        Ok(written)
    }
}

impl fmt::Display for Pom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.document)
    }
}

fn append_all(project: &mut Element, container: &str, declarations: &[&Declaration]) {
    if declarations.is_empty() {
        return;
    }
    let depth = indent_of_children(project).unwrap_or_else(|| format!("\n{UNIT}"));
    let elements = declarations.iter().map(|declaration| declaration.to_element());

    if let Some(existing) = project.child_mut(container) {
        for element in elements {
            append(existing, &element, &depth);
        }
    } else {
        let created = elements.fold(Element::new(container), |created, element| {
            created.with_child(element)
        });
        append(project, &created, "\n");
    }
}

/// Appends `element` as the last child of `parent`, before any trailing
/// whitespace, indented like its siblings. `depth` is the indentation of the
/// parent's own tags.
fn append(parent: &mut Element, element: &Element, depth: &str) {
    let closing = match parent.children().last() {
        Some(node) if node.is_whitespace() => parent.pop(),
        _ => None,
    };
    let indent = indent_of_children(parent).unwrap_or_else(|| format!("{depth}{UNIT}"));

    parent.push(Node::Text(indent.clone()));
    parent.push(layout(element, &indent));
    parent.push(closing.unwrap_or_else(|| Node::Text(depth.to_owned())));
}

/// The whitespace preceding the last child element, from its final line
/// break on.
fn indent_of_children(parent: &Element) -> Option<String> {
    parent
        .children()
        .windows(2)
        .filter_map(|pair| match pair {
            [Node::Text(text), Node::Element(_)] if text.trim().is_empty() => text
                .rfind('\n')
                .map(|newline| text[newline..].to_owned()),
            _ => None,
        })
        .last()
}

/// Rebuilds a freshly created element with one child element per line.
fn layout(element: &Element, depth: &str) -> Element {
    if element.elements().next().is_none() {
        return element.clone();
    }
    let inner = format!("{depth}{UNIT}");
    let shell = element
        .attributes()
        .fold(Element::new(element.name()), |shell, (name, value)| {
            shell.with_attribute(name, value)
        });
    element
        .elements()
        .fold(shell, |shell, child| {
            shell
                .with_child(Node::Text(inner.clone()))
                .with_child(layout(child, &inner))
        })
        .with_child(Node::Text(depth.to_owned()))
}

/// Errors raised while reading or updating a `pom.xml`.
#[derive(Debug, thiserror::Error)]
pub enum PomError {
    /// The file is not well-formed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The root element is not `<project>`.
    #[error("expected a <project> root element, found <{0}>")]
    NotAProject(String),

    /// An existing declaration could not be read.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}
