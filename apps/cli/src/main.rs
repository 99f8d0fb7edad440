//! newsdigest CLI: consolidated multilingual news summaries.
//!
//! Reads the intermediate documents written by the news collectors, asks a
//! local Ollama model for one combined summary, and writes it as a
//! timestamped Markdown file.

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
