//! CLI definition, config merging, tracing setup, and the run command.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use newsdigest_core::inference::{InferenceBackend, InferenceResult};
use newsdigest_core::language::supported_languages;
use newsdigest_core::pipeline::{ProgressReporter, RunConfig, RunReport};
use newsdigest_shared::{AppConfig, init_config, load_config, load_config_from};
use tracing::info;

/// Language token that prints the language table instead of running.
const HELP_TOKEN: &str = "help";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// newsdigest: one consolidated summary from many news collectors.
#[derive(Parser)]
#[command(
    name = "newsdigest",
    version,
    about = "Summarize collected news documents with a local model, in any supported language.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Output language (e.g. zh, japanese, es). `help` lists supported languages.
    pub language: Option<String>,

    /// Config file (defaults to ~/.newsdigest/newsdigest.toml).
    #[arg(long, env = "NEWSDIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the collectors' intermediate documents.
    #[arg(long, env = "NEWSDIGEST_INPUT_DIR")]
    pub input_dir: Option<String>,

    /// Directory the summary is written into.
    #[arg(long, env = "NEWSDIGEST_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Base address of the Ollama service.
    #[arg(long, env = "NEWSDIGEST_OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Model identifier.
    #[arg(long, env = "NEWSDIGEST_MODEL")]
    pub model: Option<String>,

    /// Generation timeout in seconds.
    #[arg(long, env = "NEWSDIGEST_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Per-source character budget for the prompt.
    #[arg(long, env = "NEWSDIGEST_MAX_CHARS")]
    pub max_chars: Option<usize>,

    /// Write the default config file and exit.
    #[arg(long, conflicts_with = "show_config")]
    pub init_config: bool,

    /// Print the resolved configuration and exit.
    #[arg(long)]
    pub show_config: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "newsdigest=info",
        1 => "newsdigest=debug",
        _ => "newsdigest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if cli.init_config {
        return cmd_config_init();
    }

    if cli
        .language
        .as_deref()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case(HELP_TOKEN))
    {
        print_languages();
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    apply_overrides(&mut config, &cli);

    if cli.show_config {
        let toml_str = toml::to_string_pretty(&config)?;
        println!("{toml_str}");
        return Ok(());
    }

    cmd_summarize(&config, cli.language).await
}

/// Layer CLI flags and environment variables over the config file.
fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(dir) = &cli.input_dir {
        config.collect.input_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(url) = &cli.ollama_url {
        config.inference.base_url = url.clone();
    }
    if let Some(model) = &cli.model {
        config.inference.model = model.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config.inference.timeout_secs = secs;
    }
    if let Some(chars) = cli.max_chars {
        config.collect.max_chars_per_source = chars;
    }
}

async fn cmd_summarize(config: &AppConfig, language: Option<String>) -> Result<()> {
    let backend = InferenceBackend::from_config(config);
    let run_config = RunConfig::from_app_config(config, language);

    info!(
        input_dir = %run_config.collect.input_dir.display(),
        output_dir = %run_config.output.dir.display(),
        model = backend.model(),
        "starting summary run"
    );

    let reporter = CliProgress::new();

    // The document is written synchronously in the last step, so an
    // interrupt either lands before it or not at all.
    let report = tokio::select! {
        result = newsdigest_core::pipeline::run(&run_config, &backend, &reporter) => {
            result.inspect_err(|_| reporter.abort())?
        }
        _ = tokio::signal::ctrl_c() => {
            reporter.abort();
            return Err(eyre!("interrupted; no summary was written"));
        }
    };

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("  Summary written.");
    println!("  Path:      {}", report.path.display());
    println!(
        "  Language:  {} [{}]",
        report.profile.display_name, report.profile.code
    );
    if let Some(warning) = &report.language_warning {
        println!("  Warning:   {warning}");
    }
    println!(
        "  Sources:   {} included, {} absent, {} corrupt",
        report.counts.included, report.counts.absent, report.counts.corrupt
    );
    match &report.inference {
        InferenceResult::Ok(c) => println!(
            "  Inference: succeeded ({}, {} attempt(s))",
            c.model, c.attempts
        ),
        InferenceResult::Failed(f) => println!("  Inference: {} ({})", f.kind, f.detail),
    }
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn print_languages() {
    println!();
    println!("  Supported languages:");
    println!();
    println!("  {:<8} {:<32} {:<7} Aliases", "Code", "Language", "Native");
    for entry in supported_languages() {
        let profile = &entry.profile;
        println!(
            "  {:<8} {:<32} {:<7} {}",
            profile.code,
            profile.display_name,
            if profile.has_native_headers { "yes" } else { "no" },
            entry.aliases.join(", ")
        );
    }
    println!();
    println!("  Usage: newsdigest [LANGUAGE]   (no argument: English)");
    println!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abort(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_language_and_flags() {
        let cli = Cli::try_parse_from([
            "newsdigest",
            "zh",
            "--model",
            "qwen2.5:7b",
            "--timeout-secs",
            "30",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.language.as_deref(), Some("zh"));
        assert_eq!(cli.verbose, 2);

        let mut config = AppConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.inference.model, "qwen2.5:7b");
        assert_eq!(config.inference.timeout_secs, 30);
        assert_eq!(config.collect.max_chars_per_source, 6_000);
    }

    #[test]
    fn help_token_is_a_language_value() {
        let cli = Cli::try_parse_from(["newsdigest", "help"]).unwrap();
        assert_eq!(cli.language.as_deref(), Some(HELP_TOKEN));
    }

    #[test]
    fn init_and_show_conflict() {
        assert!(Cli::try_parse_from(["newsdigest", "--init-config", "--show-config"]).is_err());
    }
}
