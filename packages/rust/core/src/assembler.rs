//! Final document assembly.
//!
//! The header and footer are structural English so every document can be
//! audited the same way; only the body prose follows the language profile.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};

use newsdigest_shared::{
    LanguageProfile, ManifestCounts, ManifestEntry, SourceManifest, SourceStatus,
};

use crate::inference::{FailureKind, InferenceFailure, InferenceResult};
use crate::prompt::TruncatedSource;

/// Run facts that end up in the technical footer.
#[derive(Debug, Clone, Default)]
pub struct RunDetails {
    /// Model identifier the run was configured with.
    pub model: String,
    /// Characters of article text sent to the model.
    pub content_chars: usize,
    pub truncated: Vec<TruncatedSource>,
    /// SHA-256 of the prompt text.
    pub prompt_fingerprint: String,
    /// Non-fatal conditions worth telling the reader about.
    pub notices: Vec<String>,
}

/// A fully rendered document, ready to be written.
#[derive(Debug, Clone)]
pub struct FinalDocument {
    pub generated_at: DateTime<Utc>,
    pub profile: LanguageProfile,
    pub counts: ManifestCounts,
    pub header: String,
    pub body: String,
    pub footer: String,
}

impl FinalDocument {
    /// The complete Markdown text.
    pub fn render(&self) -> String {
        format!("{}\n---\n\n{}\n---\n\n{}", self.header, self.body, self.footer)
    }
}

/// Wrap an inference result into a self-describing document.
///
/// Produces a document for every result: model text on success, a
/// diagnostic body naming the failure and the available sources otherwise.
pub fn assemble(
    result: &InferenceResult,
    manifest: &SourceManifest,
    profile: &LanguageProfile,
    generated_at: DateTime<Utc>,
    details: &RunDetails,
) -> FinalDocument {
    let counts = manifest.counts();

    let body = match result {
        InferenceResult::Ok(completion) => {
            format!("# {}\n\n{}\n", profile.labels.title, completion.text.trim())
        }
        InferenceResult::Failed(failure) => failure_body(failure, manifest, profile),
    };

    FinalDocument {
        generated_at,
        profile: *profile,
        counts,
        header: header(result, counts, profile, generated_at, details),
        body,
        footer: footer(result, manifest, details),
    }
}

fn header(
    result: &InferenceResult,
    counts: ManifestCounts,
    profile: &LanguageProfile,
    generated_at: DateTime<Utc>,
    details: &RunDetails,
) -> String {
    let mut out = String::from("**News Digest Report**\n\n");
    let _ = writeln!(
        out,
        "- **Generated:** {}",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(
        out,
        "- **Language:** {} [{}]",
        profile.display_name, profile.code
    );
    let _ = writeln!(out, "- **Model:** {}", details.model);
    let _ = writeln!(out, "- **Inference:** {}", result.status_line());
    let _ = writeln!(
        out,
        "- **Sources:** {} included, {} absent, {} corrupt ({} expected)",
        counts.included,
        counts.absent,
        counts.corrupt,
        counts.total()
    );
    out
}

fn failure_body(
    failure: &InferenceFailure,
    manifest: &SourceManifest,
    profile: &LanguageProfile,
) -> String {
    let mut out = format!("# {}\n\n", profile.labels.title);
    let _ = writeln!(out, "> **AI summary unavailable: {}.**\n", failure.kind);
    let _ = writeln!(out, "{}\n", explain(failure.kind));
    let _ = writeln!(out, "Detail: `{}`\n", failure.detail.replace('`', "'"));

    out.push_str("## Sources available for this run\n\n");
    let available: Vec<&ManifestEntry> = manifest.included().collect();
    if available.is_empty() {
        out.push_str("There were no sources available for this run.\n");
    } else {
        for entry in available {
            let _ = write!(
                out,
                "- {} (`{}`): {} article(s)",
                entry.label, entry.source, entry.sections
            );
            if let Some(path) = &entry.path {
                let _ = write!(out, " from `{}`", path.display());
            }
            out.push('\n');
        }
        out.push_str("\nThe source documents above are intact and can be summarized by rerunning once the service is available.\n");
    }
    out
}

fn explain(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::ServiceUnreachable => {
            "The local inference service could not be reached. Check that Ollama is running \
             (`ollama serve`) and listening on the configured address."
        }
        FailureKind::Timeout => {
            "The inference service did not answer within the configured timeout. The model may \
             be too slow for this prompt; raise the timeout or choose a smaller model."
        }
        FailureKind::EmptyResponse => "The inference service answered but returned no text.",
        FailureKind::MalformedResponse => {
            "The inference service returned a response that could not be interpreted."
        }
    }
}

fn footer(result: &InferenceResult, manifest: &SourceManifest, details: &RunDetails) -> String {
    let mut out = String::new();

    let corrupt: Vec<(&ManifestEntry, &str)> = manifest
        .entries
        .iter()
        .filter_map(|e| match &e.status {
            SourceStatus::Corrupt { reason } => Some((e, reason.as_str())),
            _ => None,
        })
        .collect();
    if !details.notices.is_empty() || !corrupt.is_empty() {
        out.push_str("## Notices\n\n");
        for notice in &details.notices {
            let _ = writeln!(out, "- {notice}");
        }
        for (entry, reason) in corrupt {
            let _ = writeln!(out, "- Source `{}` was skipped as corrupt: {reason}", entry.source);
        }
        out.push('\n');
    }

    out.push_str("## Source Manifest\n\n");
    out.push_str("| Source | Label | Status | Articles | File |\n");
    out.push_str("|---|---|---|---|---|\n");
    for entry in &manifest.entries {
        let file = entry
            .path
            .as_ref()
            .map(|p| format!("`{}`", p.display()))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            entry.source,
            entry.label,
            entry.status.as_str(),
            entry.sections,
            file
        );
    }
    if manifest.entries.is_empty() {
        out.push_str("| - | - | - | 0 | - |\n");
    }
    out.push('\n');

    out.push_str("## Technical Details\n\n");
    let _ = writeln!(
        out,
        "- **Content analyzed:** {} characters",
        details.content_chars
    );
    let truncated = if details.truncated.is_empty() {
        "none".to_string()
    } else {
        details
            .truncated
            .iter()
            .map(|t| format!("{} ({} of {} articles)", t.source, t.kept, t.total))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let _ = writeln!(out, "- **Truncated sources:** {truncated}");
    let _ = writeln!(out, "- **Model:** {}", details.model);
    let _ = writeln!(out, "- **Attempts:** {}", result.attempts());
    if let InferenceResult::Ok(completion) = result {
        let _ = writeln!(
            out,
            "- **Elapsed:** {}",
            format_elapsed(completion.elapsed)
        );
    }
    let _ = writeln!(
        out,
        "- **Prompt fingerprint (SHA-256):** `{}`",
        details.prompt_fingerprint
    );
    out
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}
