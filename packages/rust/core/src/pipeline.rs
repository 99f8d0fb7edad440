//! End-to-end summarization run: language → collect → compose → infer →
//! assemble → write.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use newsdigest_shared::{
    AppConfig, CollectOptions, LanguageProfile, ManifestCounts, OutputOptions, Result,
    SourceSpec,
};

use crate::assembler::{self, RunDetails};
use crate::inference::{CompletionTransport, InferenceBackend, InferenceResult};
use crate::language::{self, LanguageUnsupported};
use crate::output;
use crate::prompt;

/// Configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Raw language token from the user, if any.
    pub language: Option<String>,
    /// Expected sources in catalog order.
    pub sources: Vec<SourceSpec>,
    pub collect: CollectOptions,
    /// Per-source character budget for the prompt digest.
    pub max_chars_per_source: usize,
    pub output: OutputOptions,
}

impl RunConfig {
    /// Build from resolved application config.
    pub fn from_app_config(config: &AppConfig, language: Option<String>) -> Self {
        Self {
            language,
            sources: config.collect.sources.clone(),
            collect: CollectOptions::from(config),
            max_chars_per_source: config.collect.max_chars_per_source,
            output: OutputOptions::from(config),
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Path of the written document.
    pub path: PathBuf,
    pub profile: LanguageProfile,
    pub language_warning: Option<LanguageUnsupported>,
    pub counts: ManifestCounts,
    pub inference: InferenceResult,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _report: &RunReport) {}
}

/// Run the full pipeline, stamping the document with the current time.
pub async fn run<T: CompletionTransport>(
    config: &RunConfig,
    backend: &InferenceBackend<T>,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    run_at(config, backend, progress, Utc::now()).await
}

/// Run the full pipeline with an explicit generation timestamp.
///
/// 1. Resolve the language token
/// 2. Collect intermediate documents
/// 3. Compose the prompt
/// 4. Invoke the model
/// 5. Assemble and write the document
///
/// Only a failed write is an error; everything else ends up in the document.
#[instrument(skip_all, fields(language = config.language.as_deref().unwrap_or("")))]
pub async fn run_at<T: CompletionTransport>(
    config: &RunConfig,
    backend: &InferenceBackend<T>,
    progress: &dyn ProgressReporter,
    generated_at: DateTime<Utc>,
) -> Result<RunReport> {
    let start = Instant::now();

    // --- Phase 1: Language ---
    let resolution = language::resolve(config.language.as_deref());
    let profile = resolution.profile;
    let mut notices = Vec::new();
    if let Some(warning) = &resolution.warning {
        warn!(token = %warning.token, "unsupported language token");
        notices.push(warning.to_string());
    }
    info!(code = profile.code, "language resolved");

    // --- Phase 2: Collect ---
    progress.phase("Collecting source documents");
    let corpus = newsdigest_collector::collect(&config.sources, &config.collect).await;
    info!(
        documents = corpus.documents.len(),
        chars = corpus.content_chars(),
        "corpus collected"
    );

    // --- Phase 3: Compose ---
    progress.phase("Composing prompt");
    let prompt = prompt::compose(&corpus, &profile, config.max_chars_per_source);
    info!(
        chars = prompt.text.chars().count(),
        truncated = prompt.truncated.len(),
        "prompt composed"
    );

    // --- Phase 4: Inference ---
    progress.phase("Generating summary");
    let outcome = backend.invoke(&prompt).await;
    notices.extend(outcome.notices);

    // --- Phase 5: Assemble and write ---
    progress.phase("Writing summary");
    let details = RunDetails {
        model: backend.model().to_string(),
        content_chars: prompt.content_chars,
        prompt_fingerprint: prompt.fingerprint(),
        truncated: prompt.truncated,
        notices,
    };
    let document = assembler::assemble(
        &outcome.result,
        &corpus.manifest,
        &profile,
        generated_at,
        &details,
    );
    let path = output::write(&document, &config.output)?;

    let report = RunReport {
        path,
        profile,
        language_warning: resolution.warning,
        counts: document.counts,
        inference: outcome.result,
        elapsed: start.elapsed(),
    };

    info!(
        path = %report.path.display(),
        inference = %report.inference.status_line(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run complete"
    );
    progress.done(&report);

    Ok(report)
}
