use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::domain::Element;

/// Where a [`Selector`] looks for matching elements, relative to the root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Direct children of the root element only.
    #[default]
    Children,
    /// Any element below the root, at any depth.
    Descendants,
}

impl Scope {
    /// Whether the search descends past the root's direct children.
    #[must_use]
    pub const fn is_recursive(self) -> bool {
        matches!(self, Self::Descendants)
    }
}

/// A typed predicate identifying an element by name and attribute values.
///
/// Selectors identify nodes for merge purposes independently of their
/// position in the tree. The predicate is a conjunction: the element name
/// must match and every listed attribute must be present with exactly the
/// given value.
///
/// ```
/// use bootstrap::{Element, Selector};
///
/// let selector = Selector::element("import").with_attribute("resource", "extra.xml");
/// assert!(selector.matches(&Element::new("import").with_attribute("resource", "extra.xml")));
/// assert!(!selector.matches(&Element::new("import").with_attribute("resource", "other.xml")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Selector {
    /// The qualified element name, including any namespace prefix.
    element: String,

    #[serde(default)]
    scope: Scope,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
}

impl Selector {
    /// Selects direct children of the root with the given element name.
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            element: name.into(),
            scope: Scope::Children,
            attributes: BTreeMap::new(),
        }
    }

    /// Additionally requires the attribute `name` to equal `value`.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Changes the search scope.
    #[must_use]
    pub fn within(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// The search scope.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Tests a single element against the predicate, ignoring scope.
    #[must_use]
    pub fn matches(&self, element: &Element) -> bool {
        element.name() == self.element
            && self
                .attributes
                .iter()
                .all(|(name, value)| element.attribute(name) == Some(value.as_str()))
    }

    /// Returns the first element below `root` matching this selector, in
    /// document order.
    #[must_use]
    pub fn find<'a>(&self, root: &'a Element) -> Option<&'a Element> {
        match self.scope {
            Scope::Children => root.elements().find(|element| self.matches(element)),
            Scope::Descendants => root.descendants().find(|element| self.matches(element)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Children => write!(f, "/*/{}", self.element)?,
            Scope::Descendants => write!(f, "//{}", self.element)?,
        }
        for (name, value) in &self.attributes {
            write!(f, "[@{name}='{value}']")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Document;

    fn document() -> Document {
        Document::parse(
            r#"<beans>
    <bean id="a"><import resource="nested.xml"/></bean>
    <import resource="first.xml"/>
    <import resource="second.xml" extra="yes"/>
</beans>"#,
        )
        .unwrap()
    }

    #[test]
    fn children_scope_ignores_nested_elements() {
        let document = document();
        let selector = Selector::element("import").with_attribute("resource", "nested.xml");
        assert!(document.find(&selector).is_none());

        let recursive = selector.within(Scope::Descendants);
        assert!(document.find(&recursive).is_some());
    }

    #[test]
    fn first_match_in_document_order_wins() {
        let document = document();
        let found = document.find(&Selector::element("import")).unwrap();
        assert_eq!(found.attribute("resource"), Some("first.xml"));

        let nested = document
            .find(&Selector::element("import").within(Scope::Descendants))
            .unwrap();
        assert_eq!(nested.attribute("resource"), Some("nested.xml"));
    }

    #[test]
    fn every_attribute_must_match() {
        let document = document();
        let selector = Selector::element("import")
            .with_attribute("resource", "second.xml")
            .with_attribute("extra", "no");
        assert!(document.find(&selector).is_none());

        let selector = Selector::element("import")
            .with_attribute("resource", "second.xml")
            .with_attribute("extra", "yes");
        assert!(document.find(&selector).is_some());
    }

    #[test]
    fn names_are_compared_with_prefix() {
        let element = Element::new("mvc:resources");
        assert!(Selector::element("mvc:resources").matches(&element));
        assert!(!Selector::element("resources").matches(&element));
    }

    #[test]
    fn find_mut_reaches_nested_elements() {
        let mut document = document();
        let selector = Selector::element("bean")
            .with_attribute("id", "a")
            .within(Scope::Descendants);
        document
            .find_mut(&selector)
            .unwrap()
            .set_attribute("class", "X");
        assert_eq!(document.find(&selector).unwrap().attribute("class"), Some("X"));
    }

    #[test]
    fn display_reads_like_a_path() {
        let selector = Selector::element("import").with_attribute("resource", "extra.xml");
        assert_eq!(selector.to_string(), "/*/import[@resource='extra.xml']");
        assert_eq!(
            selector.within(Scope::Descendants).to_string(),
            "//import[@resource='extra.xml']"
        );
    }

    #[test]
    fn deserializes_from_toml() {
        let selector: Selector = toml::from_str(
            "element = \"import\"\nscope = \"descendants\"\n[attributes]\nresource = \"x.xml\"\n",
        )
        .unwrap();
        assert_eq!(
            selector,
            Selector::element("import")
                .with_attribute("resource", "x.xml")
                .within(Scope::Descendants)
        );
    }
}
