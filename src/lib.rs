//! Idempotent installation of Bootstrap support into a generated Spring MVC
//! web project.
//!
//! The [`domain`] module holds the pure merge engine: a structured document
//! model, the fragment merger, the declaration reconciler and the
//! availability predicate. None of it performs I/O. The [`storage`] module is
//! the host side that reads project files, loads bundled templates and
//! persists results only when something actually changed.

pub mod domain;
pub use domain::{
    Availability, Config, Declaration, DeclarationSet, Document, Element, Fragment, Merged,
    Node, Selector, is_applicable, merge, reconcile,
};

/// Project files, bundled templates and the install flow.
pub mod storage;
pub use storage::{Installer, Plan, Project, Templates};
