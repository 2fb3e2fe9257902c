pub mod installer;
/// Reading and updating a Maven `pom.xml`.
pub mod pom;
pub mod project;
pub mod templates;

pub use installer::{ChangeReason, FileChange, InstallError, Installer, Plan};
pub use pom::{Pom, PomError};
pub use project::{CONFIG_FILE, ConfigError, Project};
pub use templates::{Desired, TemplateError, Templates};
