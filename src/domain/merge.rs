//! Idempotent fragment merging.
//!
//! [`merge`] decides whether a [`Fragment`] has already been applied to a
//! target [`Document`] and, if not, appends the fragment's nodes under the
//! insertion point. Applying a merge any number of times yields the same
//! document as applying it once.
//!
//! ```
//! use bootstrap::{Document, Fragment, Selector, merge};
//!
//! let marker = Selector::element("import").with_attribute("resource", "extra.xml");
//! let fragment = Fragment::parse(
//!     "additions.xml",
//!     &marker,
//!     r#"<beans><bean/><import resource="extra.xml"/></beans>"#,
//! )?;
//! let target = Document::parse("<beans><bean id=\"existing\"/></beans>")?;
//!
//! let first = merge(target, &marker, &fragment)?;
//! assert!(first.changed);
//!
//! let second = merge(first.document.clone(), &marker, &fragment)?;
//! assert!(!second.changed);
//! assert_eq!(second.document, first.document);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::domain::{Document, Fragment, FragmentError, ParseError, Selector};

/// Where the fragment's nodes are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InsertionPoint {
    /// As the last children of the document root.
    #[default]
    Root,
    /// As the last children of the first element matching the selector.
    Matching(Selector),
}

/// The outcome of a merge: the resulting document and whether it differs
/// from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged<D = Document> {
    /// The document after the merge. Identical to the input when
    /// `changed` is `false`.
    pub document: D,
    /// Whether the fragment was appended.
    pub changed: bool,
}

impl<D> Merged<D> {
    const fn unchanged(document: D) -> Self {
        Self {
            document,
            changed: false,
        }
    }
}

/// Ways in which the target document can be unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    /// The target text could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The insertion point selector matched nothing.
    #[error("no element matching {0} to insert into")]
    NoInsertionPoint(Selector),

    /// The root binds a namespace prefix the fragment needs to another URI.
    #[error("root declares {attribute}=\"{found}\" but the fragment needs \"{expected}\"")]
    NamespaceConflict {
        /// The `xmlns:*` attribute.
        attribute: String,
        /// The URI the fragment's nodes are written against.
        expected: String,
        /// The URI the target root binds instead.
        found: String,
    },
}

/// Errors raised by [`merge`]. Both are fatal: nothing is merged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The target document cannot be parsed or has no insertion point.
    #[error("malformed target document: {0}")]
    MalformedDocument(#[from] Malformed),

    /// The fragment could not be loaded, or could never be detected once
    /// merged.
    #[error(transparent)]
    MissingFragment(#[from] FragmentError),
}

impl From<ParseError> for MergeError {
    fn from(error: ParseError) -> Self {
        Self::MalformedDocument(Malformed::Parse(error))
    }
}

/// Merges `fragment` into `target` under the document root, unless a node
/// matching `marker` is already present.
///
/// # Errors
///
/// See [`merge_at`].
pub fn merge(target: Document, marker: &Selector, fragment: &Fragment) -> Result<Merged, MergeError> {
    merge_at(target, marker, fragment, &InsertionPoint::Root)
}

/// Merges `fragment` into `target` at the given insertion point, unless a
/// node matching `marker` is already present.
///
/// The marker is searched in document order and the first match wins. When
/// it is found the target is returned untouched with `changed == false`.
/// Otherwise every node of the fragment is cloned, in order and with its
/// full subtree, and appended as the last children of the insertion point.
/// Namespace declarations the fragment carries are added to the root element
/// when it lacks them.
///
/// # Errors
///
/// - [`MergeError::MissingFragment`] if the fragment does not carry a node
///   matching `marker`, or would not make `marker` match once appended at
///   this insertion point. Merging it could never be idempotent.
/// - [`MergeError::MalformedDocument`] if the insertion point matches no
///   element, or the root binds one of the fragment's prefixes to a different
///   namespace.
pub fn merge_at(
    mut target: Document,
    marker: &Selector,
    fragment: &Fragment,
    at: &InsertionPoint,
) -> Result<Merged, MergeError> {
    let unmarked = || FragmentError::Unmarked {
        name: fragment.name().to_owned(),
        marker: marker.clone(),
    };

    if !fragment.carries(marker) {
        return Err(unmarked().into());
    }

    if target.find(marker).is_some() {
        return Ok(Merged::unchanged(target));
    }

    let mut missing = Vec::new();
    for (attribute, uri) in fragment.namespaces() {
        match target.root().attribute(attribute) {
            None => missing.push((attribute, uri)),
            Some(found) if found == uri => {}
            Some(found) => {
                return Err(Malformed::NamespaceConflict {
                    attribute: attribute.to_owned(),
                    expected: uri.to_owned(),
                    found: found.to_owned(),
                }
                .into());
            }
        }
    }

    let parent = match at {
        InsertionPoint::Root => target.root_mut(),
        InsertionPoint::Matching(selector) => target
            .find_mut(selector)
            .ok_or_else(|| Malformed::NoInsertionPoint(selector.clone()))?,
    };
    for node in fragment.children() {
        parent.push(node.clone());
    }

    if target.find(marker).is_none() {
        return Err(unmarked().into());
    }

    let root = target.root_mut();
    for (attribute, uri) in missing {
        root.set_attribute(attribute, uri);
    }

    Ok(Merged {
        document: target,
        changed: true,
    })
}

/// Text-level variant of [`merge`].
///
/// When the marker is already present the original text is returned as-is,
/// so callers can compare bodies or skip the write entirely.
///
/// # Errors
///
/// Returns [`MergeError::MalformedDocument`] if `target` cannot be parsed,
/// and otherwise as [`merge_at`].
pub fn merge_str(
    target: &str,
    marker: &Selector,
    fragment: &Fragment,
) -> Result<Merged<String>, MergeError> {
    let document = Document::parse(target)?;
    let merged = merge(document, marker, fragment)?;
    if merged.changed {
        Ok(Merged {
            document: merged.document.to_string(),
            changed: true,
        })
    } else {
        Ok(Merged::unchanged(target.to_owned()))
    }
}
