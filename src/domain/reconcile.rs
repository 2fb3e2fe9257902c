use crate::domain::{Declaration, DeclarationSet};

/// Computes the declarations that must be added so that every key in
/// `desired` is present in `current`.
///
/// Entries are kept in input order and included if and only if their key is
/// absent from `current`. A key that is already present counts as satisfied
/// even when its payload differs, so an existing version is never silently
/// upgraded. Duplicate keys within `desired` are not collapsed; deduplicating
/// on persist is left to the caller.
#[must_use]
pub fn reconcile(current: &DeclarationSet, desired: &[Declaration]) -> Vec<Declaration> {
    desired
        .iter()
        .filter(|declaration| !current.contains(&declaration.key()))
        .cloned()
        .collect()
}
