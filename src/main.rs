//! `mvc-bootstrap` adds Bootstrap support to a Spring MVC web project.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
