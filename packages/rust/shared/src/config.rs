//! Application configuration for newsdigest.
//!
//! User config lives at `~/.newsdigest/newsdigest.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DigestError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "newsdigest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".newsdigest";

// ---------------------------------------------------------------------------
// Config structs (matching newsdigest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local inference service settings.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Intermediate document discovery settings.
    #[serde(default)]
    pub collect: CollectConfig,

    /// Where and how the final document is written.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[inference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base address of the inference service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every generation request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound for one generation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound for the liveness probe.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Additional attempts after a transient failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed pause between attempts.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3.1:8b".into()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    1_000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}

/// `[collect]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Directory the collectors write their intermediate documents into.
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    /// Per-source character budget for the prompt digest.
    #[serde(default = "default_max_chars")]
    pub max_chars_per_source: usize,

    /// Maximum number of documents parsed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Expected sources, in the order they appear in the corpus.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceSpec>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            max_chars_per_source: default_max_chars(),
            concurrency: default_concurrency(),
            sources: default_sources(),
        }
    }
}

fn default_input_dir() -> String {
    ".".into()
}
fn default_max_chars() -> usize {
    6_000
}
fn default_concurrency() -> u32 {
    4
}

/// `[[collect.sources]]` entry: one collector's naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Stable identifier used in the manifest.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// File name globs (`*` and `?` supported), in priority order.
    pub patterns: Vec<String>,
}

impl SourceSpec {
    /// Convenience constructor used by defaults and tests.
    pub fn new(name: &str, label: &str, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            patterns: patterns.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// The collectors that ship alongside the summarizer.
pub fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new(
            "health",
            "Queensland Health News",
            &["qld_health_news.md", "qld_health_news_demo.md"],
        ),
        SourceSpec::new(
            "parliament",
            "Australian Parliament House News & Events",
            &["parliament_news.md"],
        ),
        SourceSpec::new(
            "newsletter",
            "Brisbane Newsletter",
            &[
                "brisbane_newsletter_summary_*.md",
                "brisbane_newsletter_summary.md",
            ],
        ),
    ]
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the final document is written into.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Fixed file name prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            prefix: default_prefix(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_prefix() -> String {
    "comprehensive_news_summary".into()
}

// ---------------------------------------------------------------------------
// Runtime option structs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime collection options.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Directory searched for intermediate documents.
    pub input_dir: PathBuf,
    /// Maximum number of documents parsed at once.
    pub concurrency: usize,
}

impl From<&AppConfig> for CollectOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            input_dir: PathBuf::from(&config.collect.input_dir),
            concurrency: config.collect.concurrency.max(1) as usize,
        }
    }
}

/// Runtime inference settings.
#[derive(Debug, Clone)]
pub struct InferenceSettings {
    /// Base address of the inference service.
    pub base_url: Url,
    /// Model identifier.
    pub model: String,
    /// Upper bound for one generation call.
    pub timeout: Duration,
    /// Upper bound for the liveness probe.
    pub probe_timeout: Duration,
    /// Additional attempts after a transient failure.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_backoff: Duration,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
}

impl TryFrom<&AppConfig> for InferenceSettings {
    type Error = DigestError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let inference = &config.inference;
        let base_url = Url::parse(&inference.base_url).map_err(|e| {
            DigestError::validation(format!(
                "invalid inference base_url '{}': {e}",
                inference.base_url
            ))
        })?;
        if inference.timeout_secs == 0 {
            return Err(DigestError::validation("inference timeout_secs must be > 0"));
        }

        Ok(Self {
            base_url,
            model: inference.model.clone(),
            timeout: Duration::from_secs(inference.timeout_secs),
            probe_timeout: Duration::from_secs(inference.probe_timeout_secs.max(1)),
            max_retries: inference.max_retries,
            retry_backoff: Duration::from_millis(inference.retry_backoff_ms),
            temperature: inference.temperature,
            top_p: inference.top_p,
        })
    }
}

/// Runtime output options.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Directory the final document is written into.
    pub dir: PathBuf,
    /// Fixed file name prefix.
    pub prefix: String,
}

impl From<&AppConfig> for OutputOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.output.dir),
            prefix: config.output.prefix.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.newsdigest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DigestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.newsdigest/newsdigest.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DigestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DigestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DigestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DigestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DigestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("qld_health_news.md"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.inference.max_retries, 2);
        assert_eq!(parsed.collect.sources.len(), 3);
        assert_eq!(parsed.output.prefix, "comprehensive_news_summary");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[inference]
model = "qwen2.5:7b"

[[collect.sources]]
name = "council"
label = "City Council"
patterns = ["council_*.md"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.inference.model, "qwen2.5:7b");
        assert_eq!(config.inference.base_url, "http://localhost:11434");
        assert_eq!(config.collect.sources.len(), 1);
        assert_eq!(config.collect.sources[0].patterns, vec!["council_*.md"]);
        assert_eq!(config.collect.max_chars_per_source, 6_000);
    }

    #[test]
    fn inference_settings_from_app_config() {
        let app = AppConfig::default();
        let settings = InferenceSettings::try_from(&app).expect("valid defaults");
        assert_eq!(settings.base_url.as_str(), "http://localhost:11434/");
        assert_eq!(settings.timeout, Duration::from_secs(120));
        assert_eq!(settings.max_retries, 2);
    }

    #[test]
    fn inference_settings_reject_bad_url() {
        let mut app = AppConfig::default();
        app.inference.base_url = "not a url".into();
        let err = InferenceSettings::try_from(&app).unwrap_err();
        assert!(err.to_string().contains("invalid inference base_url"));
    }

    #[test]
    fn inference_settings_reject_zero_timeout() {
        let mut app = AppConfig::default();
        app.inference.timeout_secs = 0;
        assert!(InferenceSettings::try_from(&app).is_err());
    }

    #[test]
    fn collect_options_clamp_concurrency() {
        let mut app = AppConfig::default();
        app.collect.concurrency = 0;
        let opts = CollectOptions::from(&app);
        assert_eq!(opts.concurrency, 1);
    }
}
