use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{Check, Feature, Selector};

/// Configuration for installing into a project.
///
/// This struct holds the availability checks that gate the install, the
/// locations of the project files that are updated, and the fragment and
/// marker used for the web configuration merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Checks that must all pass before anything is merged.
    ///
    /// Evaluated in order; every check is evaluated even after one fails.
    availability: Vec<Check>,

    /// The build manifest, relative to the project root.
    pom: PathBuf,

    /// The web MVC configuration the fragment is merged into, relative to the
    /// project root.
    webmvc_config: PathBuf,

    /// The template name of the fragment to merge.
    fragment: String,

    /// The selector whose presence means the fragment is already merged.
    marker: Selector,

    /// Templates copied next to the web MVC configuration if they do not
    /// already exist there.
    resources: Vec<String>,

    /// A directory whose files take precedence over the bundled templates.
    pub templates: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            availability: default_availability(),
            pom: PathBuf::from("pom.xml"),
            webmvc_config: PathBuf::from(WEBMVC_CONFIG),
            fragment: "webmvc-config-additions.xml".to_owned(),
            marker: Selector::element("import").with_attribute("resource", BOOTSTRAP_RESOURCE),
            resources: vec![BOOTSTRAP_RESOURCE.to_owned()],
            templates: None,
        }
    }
}

/// The conventional location of the web MVC configuration.
pub const WEBMVC_CONFIG: &str = "src/main/webapp/WEB-INF/spring/webmvc-config.xml";

const BOOTSTRAP_RESOURCE: &str = "webmvc-config-bootstrap.xml";

fn default_availability() -> Vec<Check> {
    vec![
        Check::FeatureInstalled(Feature::Mvc),
        Check::FeatureAbsent(Feature::Jsf),
        Check::PathExists(PathBuf::from("src/main/webapp/WEB-INF/tags")),
        Check::PathExists(PathBuf::from("src/main/webapp/WEB-INF/views")),
    ]
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The availability checks, in evaluation order.
    #[must_use]
    pub fn availability(&self) -> &[Check] {
        &self.availability
    }

    /// Replaces the availability checks.
    pub fn set_availability(&mut self, checks: Vec<Check>) {
        self.availability = checks;
    }

    /// The build manifest path, relative to the project root.
    #[must_use]
    pub fn pom(&self) -> &Path {
        &self.pom
    }

    /// The web MVC configuration path, relative to the project root.
    #[must_use]
    pub fn webmvc_config(&self) -> &Path {
        &self.webmvc_config
    }

    /// The fragment template name.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// The marker selector for the fragment.
    #[must_use]
    pub const fn marker(&self) -> &Selector {
        &self.marker
    }

    /// Templates installed alongside the web MVC configuration.
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1", rename_all = "kebab-case")]
    V1 {
        #[serde(default = "default_pom")]
        pom: PathBuf,

        #[serde(default = "default_webmvc_config")]
        webmvc_config: PathBuf,

        #[serde(default = "default_fragment")]
        fragment: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        templates: Option<PathBuf>,

        #[serde(default = "default_resources")]
        resources: Vec<String>,

        /// An empty list is honoured and makes the install always available.
        #[serde(default = "default_availability")]
        availability: Vec<Check>,

        #[serde(default = "default_marker")]
        marker: Selector,
    },
}

fn default_pom() -> PathBuf {
    Config::default().pom
}

fn default_webmvc_config() -> PathBuf {
    Config::default().webmvc_config
}

fn default_fragment() -> String {
    Config::default().fragment
}

fn default_resources() -> Vec<String> {
    Config::default().resources
}

fn default_marker() -> Selector {
    Config::default().marker
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                pom,
                webmvc_config,
                fragment,
                templates,
                resources,
                availability,
                marker,
            } => Self {
                availability,
                pom,
                webmvc_config,
                fragment,
                marker,
                resources,
                templates,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            pom: config.pom,
            webmvc_config: config.webmvc_config,
            fragment: config.fragment,
            templates: config.templates,
            resources: config.resources,
            availability: config.availability,
            marker: config.marker,
        }
    }
}
