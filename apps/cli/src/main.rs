//! LeadMatrix CLI: grounded lead extraction from the terminal.
//!
//! Describes a target market, runs it through the extraction engine, and
//! prints, saves, or exports the resulting leads.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
