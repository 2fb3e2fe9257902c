use std::{path::PathBuf, process};

use bootstrap::{
    Installer, Project,
    storage::{InstallError, Plan},
};
use tracing::instrument;

use super::terminal::Colorize;

/// Exit code when `--check` finds work to do.
const EXIT_DRIFT: i32 = 2;

/// Exit code when the project fails an availability check.
const EXIT_NOT_APPLICABLE: i32 = 3;

#[derive(Debug, clap::Parser)]
#[allow(clippy::struct_excessive_bools)]
pub struct Install {
    /// Check whether the project needs changes without making them (exits
    /// with code 2 if it does)
    #[arg(long, conflicts_with = "dry_run")]
    check: bool,

    /// Show what would be changed without making changes
    #[arg(long)]
    dry_run: bool,

    /// Suppress output
    #[arg(long, short)]
    quiet: bool,
}

impl Install {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let project = Project::open(root)?;
        let installer = Installer::new(&project);

        let plan = match installer.plan() {
            Ok(plan) => plan,
            Err(InstallError::NotApplicable(failures)) => {
                if !self.quiet {
                    eprintln!(
                        "{}",
                        "⚠️  Bootstrap cannot be installed in this project:".warning()
                    );
                    for failure in &failures {
                        eprintln!("  • {failure}");
                    }
                }
                process::exit(EXIT_NOT_APPLICABLE);
            }
            Err(e) => return Err(e.into()),
        };

        if plan.is_empty() {
            if !self.quiet {
                println!("{}", "✅ Bootstrap is already installed.".success());
            }
            return Ok(());
        }

        if self.check {
            if !self.quiet {
                println!(
                    "{}",
                    format!("⚠️  {} files need changes", plan.changes().len()).warning()
                );
                list(&plan);
            }
            process::exit(EXIT_DRIFT);
        }

        if self.dry_run {
            if !self.quiet {
                println!("Would change {} files:", plan.changes().len());
                list(&plan);
            }
            return Ok(());
        }

        installer.apply(&plan)?;

        if !self.quiet {
            println!(
                "{}",
                format!("✅ Updated {} files", plan.changes().len()).success()
            );
            list(&plan);
        }
        Ok(())
    }
}

fn list(plan: &Plan) {
    for change in plan.changes() {
        println!(
            "  • {} {}",
            change.path.display(),
            format!("({})", change.reason).dim()
        );
    }
}
