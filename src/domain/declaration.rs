//! Keyed build declarations.
//!
//! A [`Declaration`] is either a [`Dependency`] or a [`Property`]. Each one is
//! identified by a [`DeclarationKey`]; the rest of its content is payload and
//! plays no part in reconciliation.

use std::{collections::BTreeMap, fmt};

use non_empty_string::NonEmptyString;

use crate::domain::Element;

/// The packaging type Maven assumes when a dependency does not name one.
pub const DEFAULT_TYPE: &str = "jar";

/// A build dependency.
///
/// Identity is the group, artifact, type and classifier. Version and scope
/// are payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    group_id: NonEmptyString,
    artifact_id: NonEmptyString,
    version: Option<String>,
    kind: Option<String>,
    classifier: Option<String>,
    scope: Option<String>,
}

impl Dependency {
    /// Creates a dependency with no version, type, classifier or scope.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::Empty`] if either coordinate is empty.
    pub fn new(group_id: &str, artifact_id: &str) -> Result<Self, DeclarationError> {
        Ok(Self {
            group_id: non_empty("dependency", "groupId", group_id)?,
            artifact_id: non_empty("dependency", "artifactId", artifact_id)?,
            version: None,
            kind: None,
            classifier: None,
            scope: None,
        })
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the packaging type.
    #[must_use]
    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// The group coordinate.
    #[must_use]
    pub fn group_id(&self) -> &str {
        self.group_id.as_str()
    }

    /// The artifact coordinate.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        self.artifact_id.as_str()
    }

    /// The version, if declared.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The scope, if declared.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// The composite identity of this dependency.
    #[must_use]
    pub fn key(&self) -> DeclarationKey {
        DeclarationKey::Dependency {
            group_id: self.group_id.to_string(),
            artifact_id: self.artifact_id.to_string(),
            kind: self.kind.clone().unwrap_or_else(|| DEFAULT_TYPE.to_owned()),
            classifier: self.classifier.clone().unwrap_or_default(),
        }
    }

    /// Reads a `<dependency>` element.
    ///
    /// # Errors
    ///
    /// Returns an error if `groupId` or `artifactId` is missing or empty.
    pub fn from_element(element: &Element) -> Result<Self, DeclarationError> {
        let required = |child: &str| {
            element
                .child(child)
                .map(|value| value.text().trim().to_owned())
                .ok_or_else(|| DeclarationError::Missing {
                    element: element.name().to_owned(),
                    child: child.to_owned(),
                })
        };
        let optional = |child: &str| {
            element
                .child(child)
                .map(|value| value.text().trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            group_id: non_empty(element.name(), "groupId", &required("groupId")?)?,
            artifact_id: non_empty(element.name(), "artifactId", &required("artifactId")?)?,
            version: optional("version"),
            kind: optional("type"),
            classifier: optional("classifier"),
            scope: optional("scope"),
        })
    }

    /// Writes the dependency as a `<dependency>` element with one child per
    /// declared field, in the conventional POM order.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let fields = [
            ("groupId", Some(self.group_id.as_str())),
            ("artifactId", Some(self.artifact_id.as_str())),
            ("version", self.version.as_deref()),
            ("type", self.kind.as_deref()),
            ("classifier", self.classifier.as_deref()),
            ("scope", self.scope.as_deref()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| Some(Element::new(name).with_text(value?)))
            .fold(Element::new("dependency"), |dependency, field| {
                dependency.with_child(field)
            })
    }
}

/// A named build property such as a shared version number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: NonEmptyString,
    value: String,
}

impl Property {
    /// Creates a property.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::Empty`] if `name` is empty.
    pub fn new(name: &str, value: impl Into<String>) -> Result<Self, DeclarationError> {
        Ok(Self {
            name: non_empty("properties", "name", name)?,
            value: value.into(),
        })
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The property value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Reads a property element, whose name is the property name and whose
    /// text is the value.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::Empty`] if the element has no name.
    pub fn from_element(element: &Element) -> Result<Self, DeclarationError> {
        Self::new(element.name(), element.text().trim())
    }

    /// Writes the property as `<name>value</name>`.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element::new(self.name.as_str()).with_text(&self.value)
    }
}

/// One reconcilable unit of build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// A build dependency.
    Dependency(Dependency),
    /// A build property.
    Property(Property),
}

impl Declaration {
    /// The composite identity of this declaration.
    #[must_use]
    pub fn key(&self) -> DeclarationKey {
        match self {
            Self::Dependency(dependency) => dependency.key(),
            Self::Property(property) => DeclarationKey::Property {
                name: property.name().to_owned(),
            },
        }
    }

    /// Writes the declaration as an element.
    #[must_use]
    pub fn to_element(&self) -> Element {
        match self {
            Self::Dependency(dependency) => dependency.to_element(),
            Self::Property(property) => property.to_element(),
        }
    }
}

impl From<Dependency> for Declaration {
    fn from(dependency: Dependency) -> Self {
        Self::Dependency(dependency)
    }
}

impl From<Property> for Declaration {
    fn from(property: Property) -> Self {
        Self::Property(property)
    }
}

/// The identity of a [`Declaration`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclarationKey {
    /// Identity of a dependency.
    Dependency {
        /// Group coordinate.
        group_id: String,
        /// Artifact coordinate.
        artifact_id: String,
        /// Packaging type, defaulted to `jar`.
        kind: String,
        /// Classifier, empty when absent.
        classifier: String,
    },
    /// Identity of a property.
    Property {
        /// Property name.
        name: String,
    },
}

impl fmt::Display for DeclarationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependency {
                group_id,
                artifact_id,
                kind,
                classifier,
            } => {
                write!(f, "{group_id}:{artifact_id}")?;
                if kind != DEFAULT_TYPE || !classifier.is_empty() {
                    write!(f, ":{kind}")?;
                }
                if !classifier.is_empty() {
                    write!(f, ":{classifier}")?;
                }
                Ok(())
            }
            Self::Property { name } => write!(f, "property {name}"),
        }
    }
}

/// Declarations indexed by key, built fresh from a project's current state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationSet {
    entries: BTreeMap<DeclarationKey, Declaration>,
}

impl DeclarationSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts a declaration, returning any previous declaration with the
    /// same key.
    pub fn insert(&mut self, declaration: Declaration) -> Option<Declaration> {
        self.entries.insert(declaration.key(), declaration)
    }

    /// Whether a declaration with this key is present.
    #[must_use]
    pub fn contains(&self, key: &DeclarationKey) -> bool {
        self.entries.contains_key(key)
    }

    /// The number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Declaration> for DeclarationSet {
    fn from_iter<I: IntoIterator<Item = Declaration>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Declaration> for DeclarationSet {
    fn extend<I: IntoIterator<Item = Declaration>>(&mut self, iter: I) {
        for declaration in iter {
            self.insert(declaration);
        }
    }
}

/// Reads every `<dependency>` child of a `<dependencies>` container.
///
/// # Errors
///
/// Returns the first dependency that cannot be read.
pub fn dependencies_in(container: &Element) -> Result<Vec<Declaration>, DeclarationError> {
    container
        .elements()
        .filter(|element| element.name() == "dependency")
        .map(|element| Dependency::from_element(element).map(Declaration::from))
        .collect()
}

/// Reads every child element of a `<properties>` container as a property.
///
/// # Errors
///
/// Returns the first property that cannot be read.
pub fn properties_in(container: &Element) -> Result<Vec<Declaration>, DeclarationError> {
    container
        .elements()
        .map(|element| Property::from_element(element).map(Declaration::from))
        .collect()
}

/// Errors raised when an element cannot be read as a declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclarationError {
    /// A required child element is absent.
    #[error("<{element}> is missing required <{child}>")]
    Missing {
        /// The declaration element.
        element: String,
        /// The missing child.
        child: String,
    },

    /// A required field is present but empty.
    #[error("<{element}> has an empty <{child}>")]
    Empty {
        /// The declaration element.
        element: String,
        /// The empty field.
        child: String,
    },
}

fn non_empty(element: &str, child: &str, value: &str) -> Result<NonEmptyString, DeclarationError> {
    NonEmptyString::new(value.to_owned()).map_err(|_| DeclarationError::Empty {
        element: element.to_owned(),
        child: child.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::Document;

    fn element(xml: &str) -> Element {
        Document::parse(xml).unwrap().root().clone()
    }

    #[test]
    fn dependency_from_pom_element() {
        let dependency = Dependency::from_element(&element(
            "<dependency>
                <groupId> org.webjars </groupId>
                <artifactId>bootstrap</artifactId>
                <version>${bootstrap.version}</version>
                <scope></scope>
            </dependency>",
        ))
        .unwrap();

        assert_eq!(dependency.group_id(), "org.webjars");
        assert_eq!(dependency.artifact_id(), "bootstrap");
        assert_eq!(dependency.version(), Some("${bootstrap.version}"));
        assert_eq!(dependency.scope(), None);
    }

    #[test_case("<dependency><artifactId>a</artifactId></dependency>" => DeclarationError::Missing { element: "dependency".to_owned(), child: "groupId".to_owned() }; "missing group")]
    #[test_case("<dependency><groupId>g</groupId><artifactId> </artifactId></dependency>" => DeclarationError::Empty { element: "dependency".to_owned(), child: "artifactId".to_owned() }; "blank artifact")]
    fn invalid_dependency(xml: &str) -> DeclarationError {
        Dependency::from_element(&element(xml)).unwrap_err()
    }

    #[test]
    fn key_ignores_version_and_scope() {
        let a = Dependency::new("g", "a").unwrap().with_version("1.0");
        let b = Dependency::new("g", "a")
            .unwrap()
            .with_version("2.0")
            .with_scope("test");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn key_defaults_type_to_jar() {
        let implicit = Dependency::new("g", "a").unwrap();
        let explicit = Dependency::new("g", "a").unwrap().with_type("jar");
        let classified = Dependency::new("g", "a").unwrap().with_classifier("sources");
        assert_eq!(implicit.key(), explicit.key());
        assert_ne!(implicit.key(), classified.key());
    }

    #[test_case(Dependency::new("g", "a").unwrap().into() => "g:a"; "plain")]
    #[test_case(Dependency::new("g", "a").unwrap().with_type("war").into() => "g:a:war"; "typed")]
    #[test_case(Dependency::new("g", "a").unwrap().with_classifier("sources").into() => "g:a:jar:sources"; "classified")]
    #[test_case(Property::new("bootstrap.version", "3").unwrap().into() => "property bootstrap.version"; "property")]
    fn key_display(declaration: Declaration) -> String {
        declaration.key().to_string()
    }

    #[test]
    fn dependency_element_round_trips() {
        let dependency = Dependency::new("org.webjars", "jquery")
            .unwrap()
            .with_version("1.11.0")
            .with_scope("runtime");
        let element = dependency.to_element();
        assert_eq!(
            element.to_string(),
            "<dependency><groupId>org.webjars</groupId><artifactId>jquery</artifactId>\
             <version>1.11.0</version><scope>runtime</scope></dependency>"
        );
        assert_eq!(Dependency::from_element(&element).unwrap(), dependency);
    }

    #[test]
    fn properties_in_container() {
        let declarations = properties_in(&element(
            "<properties>\n  <java.version>1.7</java.version>\n  <!-- c -->\n  <a.b>x &amp; y</a.b>\n</properties>",
        ))
        .unwrap();
        assert_eq!(
            declarations,
            [
                Property::new("java.version", "1.7").unwrap().into(),
                Property::new("a.b", "x & y").unwrap().into(),
            ]
        );
    }

    #[test]
    fn dependencies_in_skips_other_elements() {
        let declarations = dependencies_in(&element(
            "<dependencies><dependency><groupId>g</groupId><artifactId>a</artifactId></dependency><exclusions/></dependencies>",
        ))
        .unwrap();
        assert_eq!(
            declarations,
            [Declaration::from(Dependency::new("g", "a").unwrap())]
        );
    }

    #[test]
    fn set_is_keyed() {
        let mut set: DeclarationSet = [
            Dependency::new("g", "a").unwrap().with_version("1").into(),
            Property::new("p", "1").unwrap().into(),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);

        let previous = set.insert(Dependency::new("g", "a").unwrap().with_version("2").into());
        assert_eq!(
            previous,
            Some(Dependency::new("g", "a").unwrap().with_version("1").into())
        );
        assert_eq!(set.len(), 2);
        assert!(set.contains(&DeclarationKey::Property { name: "p".to_owned() }));
    }
}
