use std::path::PathBuf;

use bootstrap::{Availability, Installer, Project};
use clap::Parser;
use tracing::instrument;

use super::terminal::{Colorize, is_narrow};

#[derive(Debug, Parser, Default)]
#[command(about = "Show availability checks and whether Bootstrap is installed")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let project = Project::open(root)?;
        let availability = project.availability();
        let merged = Installer::new(&project).is_merged()?;

        match self.output {
            OutputFormat::Json => Self::output_json(&availability, merged)?,
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&availability, merged);
                } else {
                    Self::output_table(&availability, merged);
                }
            }
        }

        Ok(())
    }

    fn output_json(availability: &Availability, merged: bool) -> anyhow::Result<()> {
        use serde_json::json;

        let output = json!({
            "applicable": availability.is_applicable(),
            "checks": availability.checks(),
            "merged": merged,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(availability: &Availability, merged: bool) {
        println!(
            "applicable={} failed={} merged={merged}",
            availability.is_applicable(),
            availability.failures().count()
        );
    }

    fn output_table(availability: &Availability, merged: bool) {
        let narrow = is_narrow();

        println!("Availability");
        println!("{}", "────────────".dim());

        for check in availability.checks() {
            let mark = if check.is_satisfied() {
                "✔".success()
            } else {
                "✘".warning()
            };
            if narrow {
                println!("{mark} {}", check.description());
            } else {
                println!("  {mark}  {}", check.description());
            }
        }
        if availability.checks().is_empty() {
            println!("{}", "  (no checks configured)".dim());
        }

        println!();
        let summary = match (availability.is_applicable(), merged) {
            (_, true) => "✅ Bootstrap is installed.".success(),
            (true, false) => "Bootstrap can be installed. Run 'mvc-bootstrap install'.".info(),
            (false, false) => "⚠️  Bootstrap cannot be installed in this project.".warning(),
        };
        println!("{summary}");
    }
}
