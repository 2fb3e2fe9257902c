//! Templates bundled into the binary, with optional on-disk overrides.

use std::{
    borrow::Cow,
    io,
    path::{Path, PathBuf},
};

use crate::domain::{
    declaration::{DeclarationError, dependencies_in, properties_in},
    Declaration, Document, Fragment, FragmentError, ParseError, Selector,
};

/// The template holding the desired properties and dependencies.
pub const CONFIGURATION: &str = "configuration.xml";

const BUNDLED: &[(&str, &str)] = &[
    (
        CONFIGURATION,
        include_str!("../../templates/configuration.xml"),
    ),
    (
        "webmvc-config-additions.xml",
        include_str!("../../templates/webmvc-config-additions.xml"),
    ),
    (
        "webmvc-config-bootstrap.xml",
        include_str!("../../templates/webmvc-config-bootstrap.xml"),
    ),
];

/// The section of [`CONFIGURATION`] this tool reads.
const SECTION: &str = "bootstrap";

/// Loads templates by name.
///
/// Files in the override directory, when one is set, shadow the bundled
/// templates of the same name.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    overrides: Option<PathBuf>,
}

impl Templates {
    /// Only the templates compiled into the binary.
    #[must_use]
    pub const fn bundled() -> Self {
        Self { overrides: None }
    }

    /// Bundled templates, shadowed by files in `dir`.
    #[must_use]
    pub const fn with_overrides(dir: PathBuf) -> Self {
        Self {
            overrides: Some(dir),
        }
    }

    /// Returns the named template's contents.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] if neither the override directory
    /// nor the bundle has the template, or [`TemplateError::Io`] if an
    /// override exists but cannot be read.
    pub fn load(&self, name: &str) -> Result<Cow<'static, str>, TemplateError> {
        if let Some(dir) = &self.overrides {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    tracing::debug!("Loaded template override from {}", path.display());
                    return Ok(Cow::Owned(content));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(TemplateError::Io { path, source }),
            }
        }

        BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == name)
            .map(|(_, content)| Cow::Borrowed(*content))
            .ok_or_else(|| TemplateError::NotFound(name.to_owned()))
    }

    /// Loads the named template as a fragment tagged with `marker`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing, malformed, or does not
    /// contain its marker.
    pub fn fragment(&self, name: &str, marker: &Selector) -> Result<Fragment, TemplateError> {
        let content = self.load(name)?;
        Ok(Fragment::parse(name, marker, &content)?)
    }

    /// Loads the desired properties and dependencies from
    /// [`CONFIGURATION`].
    ///
    /// Properties are read from `/configuration/bootstrap/properties/*` and
    /// dependencies from `/configuration/bootstrap/dependencies/dependency`.
    /// Either container may be absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing or malformed, or if a
    /// declaration in it cannot be read.
    pub fn declarations(&self) -> Result<Desired, TemplateError> {
        let content = self.load(CONFIGURATION)?;
        let document = Document::parse(&content).map_err(|source| TemplateError::Malformed {
            name: CONFIGURATION.to_owned(),
            source,
        })?;
        let invalid = |source| TemplateError::Declaration {
            name: CONFIGURATION.to_owned(),
            source,
        };

        let Some(section) = document.root().child(SECTION) else {
            return Ok(Desired::default());
        };
        let properties = match section.child("properties") {
            Some(container) => properties_in(container).map_err(invalid)?,
            None => Vec::new(),
        };
        let dependencies = match section.child("dependencies") {
            Some(container) => dependencies_in(container).map_err(invalid)?,
            None => Vec::new(),
        };

        Ok(Desired {
            properties,
            dependencies,
        })
    }

    /// The override directory, if any.
    #[must_use]
    pub fn overrides(&self) -> Option<&Path> {
        self.overrides.as_deref()
    }
}

/// Declarations a template asks to be present in the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Desired {
    /// Build properties, in template order.
    pub properties: Vec<Declaration>,
    /// Build dependencies, in template order.
    pub dependencies: Vec<Declaration>,
}

/// Errors raised while loading a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No template with this name exists.
    #[error("template '{0}' not found")]
    NotFound(String),

    /// An override file exists but could not be read.
    #[error("failed to read template {}", path.display())]
    Io {
        /// The override file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The template is not a well-formed document.
    #[error("template '{name}' is not a well-formed document")]
    Malformed {
        /// Template name.
        name: String,
        /// The underlying parse failure.
        #[source]
        source: ParseError,
    },

    /// The template could not be used as a fragment.
    #[error(transparent)]
    Fragment(#[from] FragmentError),

    /// A declaration in the template could not be read.
    #[error("template '{name}' has an invalid declaration")]
    Declaration {
        /// Template name.
        name: String,
        /// The underlying failure.
        #[source]
        source: DeclarationError,
    },
}
