//! Availability checks and the conjunctive gate over them.
//!
//! The host evaluates every configured [`Check`] against a project, producing
//! one [`ExistenceCheck`] per check. The merge and reconcile flow runs only
//! if [`is_applicable`] holds for the whole list.

use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// A project feature that can be detected on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    /// Spring Web MVC.
    Mvc,
    /// `JavaServer` Faces.
    Jsf,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mvc => f.write_str("mvc"),
            Self::Jsf => f.write_str("jsf"),
        }
    }
}

/// A configured condition on the project, evaluated by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Check {
    /// The feature must be installed.
    FeatureInstalled(Feature),
    /// The feature must not be installed.
    FeatureAbsent(Feature),
    /// The path, relative to the project root, must exist.
    PathExists(PathBuf),
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureInstalled(feature) => write!(f, "feature '{feature}' is installed"),
            Self::FeatureAbsent(feature) => write!(f, "feature '{feature}' is not installed"),
            Self::PathExists(path) => write!(f, "{} exists", path.display()),
        }
    }
}

/// The already-evaluated outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistenceCheck {
    description: String,
    satisfied: bool,
}

impl ExistenceCheck {
    /// Records the outcome of a check.
    pub fn new(description: impl Into<String>, satisfied: bool) -> Self {
        Self {
            description: description.into(),
            satisfied,
        }
    }

    /// A human-readable description of what was checked.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the check passed.
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        self.satisfied
    }
}

/// A pure conjunction over already-evaluated checks.
///
/// Every element is visited, and an empty list is applicable.
#[must_use]
pub fn is_applicable(checks: &[ExistenceCheck]) -> bool {
    checks
        .iter()
        .fold(true, |applicable, check| applicable & check.satisfied)
}

/// The full set of evaluated checks for a project, kept together so that
/// every failure can be reported, not only the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Availability {
    checks: Vec<ExistenceCheck>,
}

impl Availability {
    /// Wraps a list of evaluated checks.
    #[must_use]
    pub const fn new(checks: Vec<ExistenceCheck>) -> Self {
        Self { checks }
    }

    /// Whether the flow may run.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        is_applicable(&self.checks)
    }

    /// All checks in evaluation order.
    #[must_use]
    pub fn checks(&self) -> &[ExistenceCheck] {
        &self.checks
    }

    /// The checks that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &ExistenceCheck> {
        self.checks.iter().filter(|check| !check.satisfied)
    }
}

impl FromIterator<ExistenceCheck> for Availability {
    fn from_iter<I: IntoIterator<Item = ExistenceCheck>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn checks(outcomes: &[bool]) -> Vec<ExistenceCheck> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, &satisfied)| ExistenceCheck::new(format!("check {i}"), satisfied))
            .collect()
    }

    #[test_case(&[true, false, true, true] => false; "one failure gates everything")]
    #[test_case(&[true, true, true, true] => true; "all pass")]
    #[test_case(&[false, false] => false; "all fail")]
    #[test_case(&[] => true; "no checks")]
    fn conjunction(outcomes: &[bool]) -> bool {
        is_applicable(&checks(outcomes))
    }

    #[test]
    fn failures_are_all_reported() {
        let availability: Availability = checks(&[false, true, false]).into_iter().collect();
        let failed: Vec<_> = availability
            .failures()
            .map(ExistenceCheck::description)
            .collect();
        assert_eq!(failed, ["check 0", "check 2"]);
        assert!(!availability.is_applicable());
    }

    #[test]
    fn check_descriptions() {
        assert_eq!(
            Check::FeatureInstalled(Feature::Mvc).to_string(),
            "feature 'mvc' is installed"
        );
        assert_eq!(
            Check::FeatureAbsent(Feature::Jsf).to_string(),
            "feature 'jsf' is not installed"
        );
        assert_eq!(
            Check::PathExists(PathBuf::from("src/main/webapp/WEB-INF/tags")).to_string(),
            "src/main/webapp/WEB-INF/tags exists"
        );
    }
}
