//! Prompt composition.
//!
//! Turns the corpus into a bounded digest and wraps it in a fixed
//! instruction template for the target language. Pure and deterministic:
//! the same corpus and profile always give the same prompt text.

use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};

use newsdigest_shared::{Corpus, LanguageProfile, Section, SourceDocument};

/// Digest text used when the corpus holds no documents.
pub const EMPTY_DIGEST: &str = "(no source documents were available for this run)";

/// A source whose articles did not all fit its character budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncatedSource {
    pub source: String,
    /// Articles kept in the digest.
    pub kept: usize,
    /// Articles in the parsed document.
    pub total: usize,
}

/// The instruction sent to the inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferencePrompt {
    pub profile: LanguageProfile,
    /// Serialized corpus digest.
    pub digest: String,
    /// Full prompt: template plus digest.
    pub text: String,
    /// Sources cut short by the per-source budget, in corpus order.
    pub truncated: Vec<TruncatedSource>,
    /// Characters of article text placed in the digest.
    pub content_chars: usize,
}

impl InferencePrompt {
    /// Hex SHA-256 of the prompt text.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Build the prompt for `corpus` in the language of `profile`.
///
/// Each document keeps whole articles, in order, while they fit within
/// `max_chars_per_source` characters; the first article that would overflow
/// ends the block and the source is flagged as truncated.
pub fn compose(
    corpus: &Corpus,
    profile: &LanguageProfile,
    max_chars_per_source: usize,
) -> InferencePrompt {
    let mut blocks = Vec::with_capacity(corpus.documents.len());
    let mut truncated = Vec::new();
    let mut content_chars = 0;

    for document in &corpus.documents {
        let block = source_block(document, max_chars_per_source);
        content_chars += block.content_chars;
        if block.kept < document.sections.len() {
            truncated.push(TruncatedSource {
                source: document.source.clone(),
                kept: block.kept,
                total: document.sections.len(),
            });
        }
        blocks.push(block.text);
    }

    let digest = if blocks.is_empty() {
        EMPTY_DIGEST.to_string()
    } else {
        blocks.join("\n")
    };

    let text = format!(
        "{instructions}\n\nSOURCE MATERIAL\n===============\n\n{digest}\n",
        instructions = instructions(profile, blocks.len(), !truncated.is_empty()),
    );

    InferencePrompt {
        profile: *profile,
        digest,
        text,
        truncated,
        content_chars,
    }
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

struct SourceBlock {
    text: String,
    kept: usize,
    content_chars: usize,
}

fn source_block(document: &SourceDocument, budget: usize) -> SourceBlock {
    let mut articles = Vec::new();
    let mut used = 0;
    for section in &document.sections {
        let rendered = render_section(section);
        let chars = rendered.chars().count();
        if used + chars > budget {
            break;
        }
        used += chars;
        articles.push(rendered);
    }

    let kept = articles.len();
    let total = document.sections.len();

    let mut text = format!("### SOURCE: {} ({})\n", document.label, document.source);
    let _ = writeln!(text, "Title: {}", document.title);
    if let Some(published) = &document.published {
        let _ = writeln!(text, "Date: {published}");
    }
    if let Some(url) = &document.origin_url {
        let _ = writeln!(text, "Origin: {url}");
    }
    if kept < total {
        let _ = writeln!(
            text,
            "Articles: {kept} of {total} [TRUNCATED: remaining articles omitted]"
        );
    } else {
        let _ = writeln!(text, "Articles: {total}");
    }

    for article in &articles {
        text.push('\n');
        text.push_str(article);
    }

    SourceBlock {
        text,
        kept,
        content_chars: used,
    }
}

fn render_section(section: &Section) -> String {
    let mut out = format!("- {}\n", section.heading);
    if let Some(date) = &section.date {
        let _ = writeln!(out, "  Date: {date}");
    }
    if let Some(kind) = &section.kind {
        let _ = writeln!(out, "  Type: {kind}");
    }
    if let Some(url) = &section.url {
        let _ = writeln!(out, "  Link: {url}");
    }
    if let Some(summary) = &section.summary {
        let _ = writeln!(out, "  Summary: {summary}");
    }
    if !section.body.is_empty() {
        for line in section.body.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "  {line}");
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

fn instructions(profile: &LanguageProfile, sources: usize, any_truncated: bool) -> String {
    let labels = &profile.labels;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are a news analyst preparing one consolidated briefing from {sources} source document(s)."
    );
    let _ = writeln!(
        out,
        "TARGET LANGUAGE: {} (code: {}). Write the entire response in this language.",
        profile.display_name, profile.code
    );
    out.push('\n');
    out.push_str("Structure the response with exactly these level-2 sections, in this order:\n");
    let _ = writeln!(
        out,
        "1. ## {}: the most important developments in a few short paragraphs.",
        labels.executive_summary
    );
    let _ = writeln!(
        out,
        "2. ## {}: bullet points grouped by topic (health, government, community, events).",
        labels.highlights
    );
    let _ = writeln!(
        out,
        "3. ## {}: themes, dates or organisations that appear in more than one source.",
        labels.correlations
    );
    out.push('\n');

    if profile.has_native_headers {
        let _ = writeln!(
            out,
            "Render every section header in native {} script exactly as written above.",
            profile.display_name
        );
    } else {
        out.push_str(
            "Keep the section headers in English exactly as written above; translate only the body text.\n",
        );
    }
    out.push_str("Do not add a document title. Do not invent facts that are not in the source material.\n");
    out.push_str("Cite the source label when a point comes from a single source.\n");
    if sources == 0 {
        out.push_str("No source documents are available: say so briefly in each section.\n");
    }
    if any_truncated {
        out.push_str("Sources marked TRUNCATED contain only their first articles.\n");
    }
    out
}
