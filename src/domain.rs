//! Domain models for structured-file merging.
//!
//! This module contains the document model, selectors, fragments and
//! declarations, together with the three pure operations built on them:
//! [`merge`], [`reconcile`] and [`is_applicable`].

/// Availability checks and the conjunctive gate over them.
pub mod availability;
pub use availability::{Availability, Check, ExistenceCheck, Feature, is_applicable};

mod config;
pub use config::{Config, WEBMVC_CONFIG};

/// Keyed build declarations (dependencies and properties).
pub mod declaration;
pub use declaration::{Declaration, DeclarationKey, DeclarationSet, Dependency, Property};

/// The ordered element tree and its XML reader and writer.
pub mod document;
pub use document::{Document, Element, Node, ParseError};

mod fragment;
pub use fragment::{Fragment, FragmentError};

/// Idempotent fragment merging.
pub mod merge;
pub use merge::{InsertionPoint, Malformed, MergeError, Merged, merge, merge_at, merge_str};

mod reconcile;
pub use reconcile::reconcile;

mod selector;
pub use selector::{Scope, Selector};
