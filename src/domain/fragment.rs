use crate::domain::{Document, Element, Node, ParseError, Selector};

/// An ordered sequence of nodes bundled as a template, to be merged into a
/// target document at most once.
///
/// A fragment is built against a marker [`Selector`]. Once the fragment has
/// been merged, the marker matches a node in the target, which is how a
/// second merge detects that there is nothing left to do. A fragment that
/// does not itself contain a node matching its marker could never be
/// detected, so it is rejected on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    name: String,
    /// `xmlns:*` declarations the children rely on, as attribute pairs.
    namespaces: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Fragment {
    /// Creates a fragment from an ordered list of nodes.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::Unmarked`] if no node in `children` matches
    /// `marker`.
    pub fn new(
        name: impl Into<String>,
        marker: &Selector,
        children: Vec<Node>,
    ) -> Result<Self, FragmentError> {
        let fragment = Self {
            name: name.into(),
            namespaces: Vec::new(),
            children,
        };
        if fragment.carries(marker) {
            Ok(fragment)
        } else {
            Err(FragmentError::Unmarked {
                name: fragment.name,
                marker: marker.clone(),
            })
        }
    }

    /// Declares a namespace prefix used by the fragment's nodes.
    ///
    /// Merging adds the declaration to the target's root element unless the
    /// root already binds the prefix.
    #[must_use]
    pub fn with_namespace(mut self, prefix: &str, uri: impl Into<String>) -> Self {
        self.namespaces.push((format!("xmlns:{prefix}"), uri.into()));
        self
    }

    /// Parses a template document; the children of its root element become
    /// the fragment.
    ///
    /// The template's root element is only a container. Its name is not
    /// merged, but its prefixed namespace declarations are kept so that the
    /// children stay bound once merged. Line breaks between the root's start
    /// tag and the first child are dropped, keeping only the indentation.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::Malformed`] if the template is not a
    /// well-formed document, or [`FragmentError::Unmarked`] as for
    /// [`Fragment::new`].
    pub fn parse(name: impl Into<String>, marker: &Selector, xml: &str) -> Result<Self, FragmentError> {
        let name = name.into();
        let template = match Document::parse(xml) {
            Ok(template) => template,
            Err(source) => return Err(FragmentError::Malformed { name, source }),
        };
        let root = template.root();

        let mut children = root.children().to_vec();
        if let Some(Node::Text(leading)) = children.first_mut() {
            if let Some(newline) = leading.rfind('\n').filter(|_| leading.trim().is_empty()) {
                leading.replace_range(..=newline, "");
            }
        }

        let fragment = Self::new(name, marker, children)?;
        Ok(namespaces_of(root).fold(fragment, |fragment, (prefix, uri)| {
            fragment.with_namespace(prefix, uri)
        }))
    }

    /// The template name the fragment was loaded from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The nodes to append, in order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Namespace declarations as `(attribute, uri)` pairs, for example
    /// `("xmlns:mvc", "http://www.springframework.org/schema/mvc")`.
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces
            .iter()
            .map(|(attribute, uri)| (attribute.as_str(), uri.as_str()))
    }

    /// Whether appending this fragment under a root would make `marker`
    /// match.
    #[must_use]
    pub fn carries(&self, marker: &Selector) -> bool {
        self.children
            .iter()
            .filter_map(Node::as_element)
            .any(|element| {
                marker.matches(element)
                    || (marker.scope().is_recursive()
                        && element.descendants().any(|nested| marker.matches(nested)))
            })
    }
}

/// The prefixed namespace declarations on an element, as `(prefix, uri)`.
fn namespaces_of(element: &Element) -> impl Iterator<Item = (&str, &str)> {
    element
        .attributes()
        .filter_map(|(name, uri)| Some((name.strip_prefix("xmlns:")?, uri)))
}

/// Errors raised when a bundled fragment cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FragmentError {
    /// The template could not be read as a document.
    #[error("template '{name}' is not a well-formed document")]
    Malformed {
        /// Template name.
        name: String,
        /// The underlying parse failure.
        #[source]
        source: ParseError,
    },

    /// The template has no node matching its marker.
    #[error("template '{name}' contains no node matching its marker {marker}")]
    Unmarked {
        /// Template name.
        name: String,
        /// The marker that could not be found.
        marker: Selector,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Element, Scope};

    fn marker() -> Selector {
        Selector::element("import").with_attribute("resource", "extra.xml")
    }

    #[test]
    fn parse_keeps_root_children_in_order() {
        let fragment = Fragment::parse(
            "additions.xml",
            &marker(),
            r#"<beans xmlns="urn:beans"><bean id="b"/><!-- c --><import resource="extra.xml"/></beans>"#,
        )
        .unwrap();

        assert_eq!(fragment.name(), "additions.xml");
        assert_eq!(
            fragment.children(),
            [
                Node::Element(Element::new("bean").with_attribute("id", "b")),
                Node::Comment(" c ".to_owned()),
                Node::Element(Element::new("import").with_attribute("resource", "extra.xml")),
            ]
        );
    }

    #[test]
    fn parse_keeps_prefixed_namespaces() {
        let fragment = Fragment::parse(
            "additions.xml",
            &marker(),
            r#"<beans xmlns="urn:beans" xmlns:mvc="urn:mvc"><import resource="extra.xml"/></beans>"#,
        )
        .unwrap();
        assert_eq!(fragment.namespaces().collect::<Vec<_>>(), [("xmlns:mvc", "urn:mvc")]);
    }

    #[test]
    fn leading_line_breaks_are_dropped() {
        let fragment = Fragment::parse(
            "additions.xml",
            &marker(),
            "<beans>\n\n    <import resource=\"extra.xml\"/>\n</beans>",
        )
        .unwrap();
        assert_eq!(fragment.children()[0], Node::Text("    ".to_owned()));
        assert_eq!(fragment.children()[2], Node::Text("\n".to_owned()));
    }

    #[test]
    fn unmarked_fragment_is_rejected() {
        let error = Fragment::parse("additions.xml", &marker(), "<beans><bean/></beans>").unwrap_err();
        assert_eq!(
            error,
            FragmentError::Unmarked {
                name: "additions.xml".to_owned(),
                marker: marker(),
            }
        );
    }

    #[test]
    fn nested_marker_needs_recursive_scope() {
        let xml = r#"<beans><bean><import resource="extra.xml"/></bean></beans>"#;
        assert!(Fragment::parse("f", &marker(), xml).is_err());
        assert!(Fragment::parse("f", &marker().within(Scope::Descendants), xml).is_ok());
    }

    #[test]
    fn malformed_template_is_reported() {
        let error = Fragment::parse("f", &marker(), "<beans>").unwrap_err();
        assert!(matches!(error, FragmentError::Malformed { ref name, .. } if name == "f"));
    }
}
