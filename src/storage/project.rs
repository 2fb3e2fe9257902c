//! A project on disk.
//!
//! [`Project`] resolves paths against the project root, detects installed
//! features and evaluates availability checks. It is the only place the
//! install flow touches the filesystem.

use std::{
    io,
    path::{Path, PathBuf},
};

use crate::{
    domain::{Availability, Check, Config, ExistenceCheck, Feature},
    storage::Templates,
};

/// The configuration file, relative to the project root.
pub const CONFIG_FILE: &str = ".mvc-bootstrap.toml";

/// Marks the JSF feature as installed.
const FACES_CONFIG: &str = "src/main/webapp/WEB-INF/faces-config.xml";

/// A project directory and the configuration that applies to it.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens the project at `root`, reading [`CONFIG_FILE`] if it exists.
    ///
    /// Without a configuration file the defaults apply.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration file exists but cannot
    /// be read or parsed.
    pub fn open(root: PathBuf) -> Result<Self, ConfigError> {
        let config = load_config(&root)?;
        Ok(Self { root, config })
    }

    /// Opens the project at `root` with an explicit configuration.
    #[must_use]
    pub const fn with_config(root: PathBuf, config: Config) -> Self {
        Self { root, config }
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Joins a project-relative path onto the root.
    #[must_use]
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Whether a project-relative path exists.
    #[must_use]
    pub fn exists(&self, relative: &Path) -> bool {
        self.resolve(relative).exists()
    }

    /// Whether `feature` is installed in the project.
    #[must_use]
    pub fn is_installed(&self, feature: Feature) -> bool {
        match feature {
            Feature::Mvc => self.exists(self.config.webmvc_config()),
            Feature::Jsf => self.exists(Path::new(FACES_CONFIG)),
        }
    }

    /// Evaluates every check, in order, against the project.
    ///
    /// No check is skipped, even once one has failed.
    #[must_use]
    pub fn evaluate(&self, checks: &[Check]) -> Availability {
        checks
            .iter()
            .map(|check| {
                let satisfied = match check {
                    Check::FeatureInstalled(feature) => self.is_installed(*feature),
                    Check::FeatureAbsent(feature) => !self.is_installed(*feature),
                    Check::PathExists(path) => self.exists(path),
                };
                tracing::debug!(%check, satisfied, "Evaluated availability check");
                ExistenceCheck::new(check.to_string(), satisfied)
            })
            .collect()
    }

    /// Evaluates the configured checks.
    #[must_use]
    pub fn availability(&self) -> Availability {
        self.evaluate(self.config.availability())
    }

    /// The templates for this project, with any configured override
    /// directory resolved against the root.
    #[must_use]
    pub fn templates(&self) -> Templates {
        self.config
            .templates
            .as_deref()
            .map_or_else(Templates::bundled, |dir| {
                Templates::with_overrides(self.resolve(dir))
            })
    }

    /// Reads a project-relative file, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read(&self, relative: &Path) -> io::Result<Option<String>> {
        let path = self.resolve(relative);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!("Read {}", path.display());
                Ok(Some(content))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes a project-relative file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the file cannot be written.
    pub fn write(&self, relative: &Path, contents: &str) -> io::Result<()> {
        let path = self.resolve(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        tracing::info!("Wrote {}", path.display());
        Ok(())
    }
}

fn load_config(root: &Path) -> Result<Config, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(&path).map_err(|message| ConfigError { path, message })
}

/// The project's configuration file is present but unusable.
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration in {}: {message}", path.display())]
pub struct ConfigError {
    /// The configuration file.
    pub path: PathBuf,
    /// What went wrong.
    pub message: String,
}
