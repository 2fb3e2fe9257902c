use std::path::{Path, PathBuf};

mod install;
mod status;
mod terminal;

use bootstrap::{Config, storage::CONFIG_FILE};
use clap::ArgAction;
use install::Install;
use status::Status;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the project
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show availability checks and install state (default)
    Status(Status),
    /// Add Bootstrap to the project
    ///
    /// Declares the webjars in the build manifest, merges the resource
    /// mappings into the web MVC configuration and creates the theme
    /// configuration. Running it again changes nothing.
    Install(Install),
    /// Write a default configuration file
    Init,
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Install(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            anyhow::bail!("Project already initialized (found existing {CONFIG_FILE})");
        }

        Config::default()
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_FILE}: {e}"))?;

        println!("Initialized {} in {}", CONFIG_FILE, root.display());
        println!();
        println!("Next steps:");
        println!("  mvc-bootstrap status");
        println!("  mvc-bootstrap install");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn init_writes_default_config() {
        let tmp = TempDir::new().unwrap();
        Init::run(tmp.path()).unwrap();

        let config = Config::load(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "_version = \"1\"\n").unwrap();

        let error = Init::run(tmp.path()).unwrap_err();
        assert!(error.to_string().contains("already initialized"));
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap(),
            "_version = \"1\"\n"
        );
    }

    #[test]
    fn status_is_the_default_command() {
        let cli = Cli::try_parse_from(["mvc-bootstrap", "-vv", "--root", "project"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.root, PathBuf::from("project"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn install_flags_parse() {
        let cli =
            Cli::try_parse_from(["mvc-bootstrap", "install", "--dry-run", "--quiet"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Install(_))));
    }
}
