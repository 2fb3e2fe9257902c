//! The install flow.
//!
//! [`Installer::plan`] works out every file that has to change without
//! touching the disk; [`Installer::apply`] writes the plan. Planning fails as
//! a whole, so a project is never left half-updated.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use crate::{
    domain::{Declaration, DeclarationKey, Document, MergeError, merge_str, reconcile},
    storage::{
        pom::{Pom, PomError},
        templates::TemplateError,
        Project,
    },
};

/// Why a file is in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReason {
    /// Declarations were appended to the build manifest.
    AddedDeclarations(Vec<DeclarationKey>),
    /// The fragment was merged into the web configuration.
    MergedFragment,
    /// A template was copied into the project.
    CreatedResource,
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddedDeclarations(keys) => {
                write!(f, "add ")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}")?;
                }
                Ok(())
            }
            Self::MergedFragment => write!(f, "merge fragment"),
            Self::CreatedResource => write!(f, "create"),
        }
    }
}

/// A single file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// The file, relative to the project root.
    pub path: PathBuf,
    /// The full new contents.
    pub contents: String,
    /// Why the file changes.
    pub reason: ChangeReason,
}

/// The writes needed to bring a project up to date. Empty when it already is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    changes: Vec<FileChange>,
}

impl Plan {
    /// Whether there is nothing to write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The planned writes, in the order they are applied.
    #[must_use]
    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }
}

/// Installs into a [`Project`].
#[derive(Debug, Clone, Copy)]
pub struct Installer<'a> {
    project: &'a Project,
}

impl<'a> Installer<'a> {
    /// Creates an installer for the given project.
    #[must_use]
    pub const fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// Works out every file that needs to change.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::NotApplicable`] if any availability check
    /// fails, and otherwise an error for the first file or template that
    /// cannot be read or merged.
    #[tracing::instrument(skip(self), fields(root = %self.project.root().display()))]
    pub fn plan(&self) -> Result<Plan, InstallError> {
        let availability = self.project.availability();
        if !availability.is_applicable() {
            return Err(InstallError::NotApplicable(
                availability
                    .failures()
                    .map(|check| check.description().to_owned())
                    .collect(),
            ));
        }

        let mut plan = Plan::default();
        plan.changes.extend(self.plan_pom()?);
        plan.changes.extend(self.plan_webmvc_config()?);
        plan.changes.extend(self.plan_resources()?);

        tracing::debug!(changes = plan.changes.len(), "Planned install");
        Ok(plan)
    }

    /// Writes every change in the plan.
    ///
    /// # Errors
    ///
    /// Returns an error for the first file that cannot be written.
    pub fn apply(&self, plan: &Plan) -> Result<(), InstallError> {
        for change in &plan.changes {
            self.project
                .write(&change.path, &change.contents)
                .map_err(|source| InstallError::Io {
                    path: change.path.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Plans and applies in one step, returning what was written.
    ///
    /// # Errors
    ///
    /// See [`Installer::plan`] and [`Installer::apply`].
    pub fn install(&self) -> Result<Plan, InstallError> {
        let plan = self.plan()?;
        self.apply(&plan)?;
        if plan.is_empty() {
            tracing::info!("Project is already up to date");
        }
        Ok(plan)
    }

    /// Whether the fragment marker is already present in the web
    /// configuration. `false` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn is_merged(&self) -> Result<bool, InstallError> {
        let config = self.project.config();
        let path = config.webmvc_config();
        let Some(text) = self.project.read(path).map_err(|source| InstallError::Io {
            path: path.to_path_buf(),
            source,
        })?
        else {
            return Ok(false);
        };
        let document = Document::parse(&text).map_err(|source| InstallError::Merge {
            path: path.to_path_buf(),
            source: source.into(),
        })?;
        Ok(document.find(config.marker()).is_some())
    }

    fn plan_pom(&self) -> Result<Option<FileChange>, InstallError> {
        let path = self.project.config().pom();
        let desired = self.project.templates().declarations()?;
        let text = self.read(path)?;
        let pom_error = |source| InstallError::Pom {
            path: path.to_path_buf(),
            source,
        };

        let mut pom = Pom::parse(&text).map_err(pom_error)?;
        let current = pom.declarations().map_err(pom_error)?;
        let mut missing = reconcile(&current, &desired.properties);
        missing.extend(reconcile(&current, &desired.dependencies));

        let written = pom.add(&missing).map_err(pom_error)?;
        if written.is_empty() {
            tracing::debug!("{} already declares everything", path.display());
            return Ok(None);
        }

        Ok(Some(FileChange {
            path: path.to_path_buf(),
            contents: pom.to_string(),
            reason: ChangeReason::AddedDeclarations(
                written.iter().map(Declaration::key).collect(),
            ),
        }))
    }

    fn plan_webmvc_config(&self) -> Result<Option<FileChange>, InstallError> {
        let config = self.project.config();
        let path = config.webmvc_config();
        let fragment = self
            .project
            .templates()
            .fragment(config.fragment(), config.marker())?;
        let text = self.read(path)?;

        let merged = merge_str(&text, config.marker(), &fragment).map_err(|source| {
            InstallError::Merge {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if !merged.changed {
            tracing::debug!("{} already contains {}", path.display(), config.marker());
            return Ok(None);
        }

        Ok(Some(FileChange {
            path: path.to_path_buf(),
            contents: merged.document,
            reason: ChangeReason::MergedFragment,
        }))
    }

    fn plan_resources(&self) -> Result<Vec<FileChange>, InstallError> {
        let config = self.project.config();
        let dir = config.webmvc_config().parent().unwrap_or_else(|| Path::new(""));
        let templates = self.project.templates();

        let mut changes = Vec::new();
        for name in config.resources() {
            let path = dir.join(name);
            if self.project.exists(&path) {
                tracing::debug!("{} already exists", path.display());
                continue;
            }
            changes.push(FileChange {
                contents: templates.load(name)?.into_owned(),
                path,
                reason: ChangeReason::CreatedResource,
            });
        }
        Ok(changes)
    }

    fn read(&self, path: &Path) -> Result<String, InstallError> {
        self.project
            .read(path)
            .map_err(|source| InstallError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .ok_or_else(|| InstallError::MissingFile(path.to_path_buf()))
    }
}

/// Errors raised by the install flow.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// One or more availability checks failed. Every failed check is listed.
    #[error("not applicable to this project: {}", .0.join("; "))]
    NotApplicable(Vec<String>),

    /// A project file the install needs does not exist.
    #[error("{} does not exist", .0.display())]
    MissingFile(PathBuf),

    /// A project file could not be read or written.
    #[error("failed to access {}", path.display())]
    Io {
        /// The project-relative path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A template could not be loaded.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The fragment could not be merged into a project file.
    #[error("failed to merge into {}", path.display())]
    Merge {
        /// The project-relative path.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: MergeError,
    },

    /// The build manifest could not be read or updated.
    #[error("failed to update {}", path.display())]
    Pom {
        /// The project-relative path.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: PomError,
    },
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{Config, WEBMVC_CONFIG};

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <properties>
        <java.version>1.7</java.version>
    </properties>
    <dependencies>
        <dependency>
            <groupId>junit</groupId>
            <artifactId>junit</artifactId>
            <version>4.11</version>
        </dependency>
    </dependencies>
</project>
"#;

    const WEBMVC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<beans xmlns="http://www.springframework.org/schema/beans">
    <bean class="org.springframework.web.servlet.view.UrlBasedViewResolver" id="tilesViewResolver"/>
</beans>
"#;

    const COMPANION: &str = "src/main/webapp/WEB-INF/spring/webmvc-config-bootstrap.xml";

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn read(root: &Path, relative: &str) -> String {
        std::fs::read_to_string(root.join(relative)).unwrap()
    }

    fn mvc_project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "pom.xml", POM);
        write(tmp.path(), WEBMVC_CONFIG, WEBMVC);
        std::fs::create_dir_all(tmp.path().join("src/main/webapp/WEB-INF/tags")).unwrap();
        std::fs::create_dir_all(tmp.path().join("src/main/webapp/WEB-INF/views")).unwrap();
        tmp
    }

    #[test]
    fn plans_every_file() {
        let tmp = mvc_project();
        let project = Project::open(tmp.path().to_path_buf()).unwrap();
        let plan = Installer::new(&project).plan().unwrap();

        let paths: Vec<_> = plan.changes().iter().map(|c| c.path.clone()).collect();
        assert_eq!(
            paths,
            [
                PathBuf::from("pom.xml"),
                PathBuf::from(WEBMVC_CONFIG),
                PathBuf::from(COMPANION),
            ]
        );
        assert_eq!(
            plan.changes()[0].reason.to_string(),
            "add property bootstrap.version, property jquery.version, \
             org.webjars:bootstrap, org.webjars:jquery"
        );

        // Planning alone writes nothing.
        assert_eq!(read(tmp.path(), "pom.xml"), POM);
        assert!(!tmp.path().join(COMPANION).exists());
    }

    #[test]
    fn install_is_idempotent() {
        let tmp = mvc_project();
        let project = Project::open(tmp.path().to_path_buf()).unwrap();
        let installer = Installer::new(&project);

        let first = installer.install().unwrap();
        assert_eq!(first.changes().len(), 3);
        assert!(installer.is_merged().unwrap());

        let pom = read(tmp.path(), "pom.xml");
        let webmvc = read(tmp.path(), WEBMVC_CONFIG);
        assert!(pom.contains("<bootstrap.version>3.1.1</bootstrap.version>"));
        assert!(pom.contains("<artifactId>jquery</artifactId>"));
        assert!(webmvc.contains(r#"<import resource="webmvc-config-bootstrap.xml"/>"#));
        assert!(webmvc.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#));

        let second = installer.install().unwrap();
        assert!(second.is_empty());
        assert_eq!(read(tmp.path(), "pom.xml"), pom);
        assert_eq!(read(tmp.path(), WEBMVC_CONFIG), webmvc);
    }

    #[test]
    fn merged_web_config_binds_the_mvc_prefix() {
        let tmp = mvc_project();
        let project = Project::open(tmp.path().to_path_buf()).unwrap();
        Installer::new(&project).install().unwrap();

        assert_eq!(
            read(tmp.path(), WEBMVC_CONFIG),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<beans xmlns="http://www.springframework.org/schema/beans" xmlns:mvc="http://www.springframework.org/schema/mvc">
    <bean class="org.springframework.web.servlet.view.UrlBasedViewResolver" id="tilesViewResolver"/>
    <!-- Bootstrap: serve WebJars (Bootstrap, jQuery) from the classpath -->
    <mvc:resources location="classpath:/META-INF/resources/webjars/" mapping="/webjars/**"/>

    <!-- Bootstrap: theme beans -->
    <import resource="webmvc-config-bootstrap.xml"/>
</beans>
"#
        );
    }

    #[test]
    fn not_applicable_writes_nothing() {
        let tmp = mvc_project();
        write(tmp.path(), "src/main/webapp/WEB-INF/faces-config.xml", "<faces-config/>");
        std::fs::remove_dir(tmp.path().join("src/main/webapp/WEB-INF/tags")).unwrap();
        let project = Project::open(tmp.path().to_path_buf()).unwrap();

        let error = Installer::new(&project).install().unwrap_err();
        let failures = match error {
            InstallError::NotApplicable(failures) => failures,
            other => panic!("expected NotApplicable, got {other:?}"),
        };
        assert_eq!(
            failures,
            [
                "feature 'jsf' is not installed",
                "src/main/webapp/WEB-INF/tags exists",
            ]
        );
        assert_eq!(read(tmp.path(), "pom.xml"), POM);
        assert_eq!(read(tmp.path(), WEBMVC_CONFIG), WEBMVC);
    }

    #[test]
    fn existing_declarations_are_kept() {
        let tmp = mvc_project();
        let pom = POM.replace(
            "<java.version>1.7</java.version>",
            "<java.version>1.7</java.version>\n        <bootstrap.version>2.3.2</bootstrap.version>",
        );
        write(tmp.path(), "pom.xml", &pom);
        let project = Project::open(tmp.path().to_path_buf()).unwrap();

        Installer::new(&project).install().unwrap();

        let updated = read(tmp.path(), "pom.xml");
        assert!(updated.contains("<bootstrap.version>2.3.2</bootstrap.version>"));
        assert!(!updated.contains("3.1.1"));
        assert!(updated.contains("<jquery.version>1.11.0</jquery.version>"));
    }

    #[test]
    fn existing_companion_is_not_overwritten() {
        let tmp = mvc_project();
        write(tmp.path(), COMPANION, "<beans/>");
        let project = Project::open(tmp.path().to_path_buf()).unwrap();

        let plan = Installer::new(&project).plan().unwrap();
        assert!(plan.changes().iter().all(|c| c.path != Path::new(COMPANION)));
    }

    #[test]
    fn malformed_web_config_aborts_everything() {
        let tmp = mvc_project();
        write(tmp.path(), WEBMVC_CONFIG, "<beans><bean></beans>");
        let project = Project::open(tmp.path().to_path_buf()).unwrap();

        let error = Installer::new(&project).install().unwrap_err();
        assert!(matches!(
            error,
            InstallError::Merge {
                source: MergeError::MalformedDocument(_),
                ..
            }
        ));
        assert_eq!(read(tmp.path(), "pom.xml"), POM);
        assert!(!tmp.path().join(COMPANION).exists());
    }

    #[test]
    fn missing_web_config_names_the_path() {
        let tmp = mvc_project();
        let mut config = Config::default();
        config.set_availability(Vec::new());
        std::fs::remove_file(tmp.path().join(WEBMVC_CONFIG)).unwrap();
        let project = Project::with_config(tmp.path().to_path_buf(), config);

        let error = Installer::new(&project).plan().unwrap_err();
        assert!(matches!(&error, InstallError::MissingFile(path) if path == Path::new(WEBMVC_CONFIG)));
        assert_eq!(
            error.to_string(),
            format!("{WEBMVC_CONFIG} does not exist")
        );
    }

    #[test]
    fn missing_pom_is_reported() {
        let tmp = mvc_project();
        std::fs::remove_file(tmp.path().join("pom.xml")).unwrap();
        let project = Project::open(tmp.path().to_path_buf()).unwrap();

        let error = Installer::new(&project).plan().unwrap_err();
        assert!(matches!(error, InstallError::MissingFile(path) if path == Path::new("pom.xml")));
    }

    #[test]
    fn template_overrides_are_used() {
        let tmp = mvc_project();
        write(
            tmp.path(),
            "templates/configuration.xml",
            "<configuration><bootstrap><properties><theme>dark</theme></properties></bootstrap></configuration>",
        );
        let mut config = Config::default();
        config.templates = Some(PathBuf::from("templates"));
        let project = Project::with_config(tmp.path().to_path_buf(), config);

        let plan = Installer::new(&project).plan().unwrap();
        assert_eq!(
            plan.changes()[0].reason,
            ChangeReason::AddedDeclarations(vec![DeclarationKey::Property {
                name: "theme".to_owned()
            }])
        );
    }

    #[test]
    fn not_merged_without_web_config() {
        let tmp = TempDir::new().unwrap();
        let project = Project::open(tmp.path().to_path_buf()).unwrap();
        assert!(!Installer::new(&project).is_merged().unwrap());
    }
}
