//! Intermediate document collection.
//!
//! Each expected source names the file patterns its collector writes. The
//! collector lists the input directory once, matches every source against
//! that listing, and parses the matches on a bounded pool of blocking tasks.
//! A missing file is `absent`, an unparsable one is `corrupt`; neither stops
//! the run. Documents come back in catalog order, whatever order parsing
//! finishes in.

mod dates;
mod parser;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use newsdigest_shared::{
    CollectOptions, Corpus, ManifestEntry, Result, SourceDocument, SourceManifest, SourceSpec,
    SourceStatus,
};

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Locate and parse the intermediate document of every expected source.
///
/// Never fails: an unreadable input directory makes every source absent, and
/// an empty corpus is a valid result.
#[instrument(skip_all, fields(dir = %opts.input_dir.display(), sources = sources.len()))]
pub async fn collect(sources: &[SourceSpec], opts: &CollectOptions) -> Corpus {
    let listing = Arc::new(list_files(&opts.input_dir));
    let semaphore = Arc::new(Semaphore::new(opts.concurrency.max(1)));

    let mut handles = Vec::with_capacity(sources.len());
    for spec in sources {
        let spec = spec.clone();
        let listing = Arc::clone(&listing);
        let input_dir = opts.input_dir.clone();
        let sem = Arc::clone(&semaphore);

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            tokio::task::spawn_blocking(move || collect_one(&spec, &input_dir, &listing)).await
        }));
    }

    let mut documents = Vec::new();
    let mut entries = Vec::with_capacity(sources.len());

    // Await in catalog order so the corpus is deterministic.
    for (handle, spec) in handles.into_iter().zip(sources) {
        let outcome = match handle.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => Outcome::Corrupt {
                path: None,
                reason: format!("parser task failed: {e}"),
            },
            Err(e) => Outcome::Corrupt {
                path: None,
                reason: format!("collector task failed: {e}"),
            },
        };

        let entry = match outcome {
            Outcome::Included(document) => {
                let entry = ManifestEntry {
                    source: spec.name.clone(),
                    label: spec.label.clone(),
                    status: SourceStatus::Included,
                    path: Some(document.path.clone()),
                    sections: document.sections.len(),
                };
                documents.push(document);
                entry
            }
            Outcome::Absent => ManifestEntry {
                source: spec.name.clone(),
                label: spec.label.clone(),
                status: SourceStatus::Absent,
                path: None,
                sections: 0,
            },
            Outcome::Corrupt { path, reason } => ManifestEntry {
                source: spec.name.clone(),
                label: spec.label.clone(),
                status: SourceStatus::Corrupt { reason },
                path,
                sections: 0,
            },
        };
        entries.push(entry);
    }

    let corpus = Corpus {
        documents,
        manifest: SourceManifest { entries },
    };

    let counts = corpus.manifest.counts();
    info!(
        included = counts.included,
        absent = counts.absent,
        corrupt = counts.corrupt,
        "collection complete"
    );

    corpus
}

/// Parse one intermediate document's text on behalf of `spec`.
pub fn parse_document(spec: &SourceSpec, path: &Path, content: &str) -> Result<SourceDocument> {
    let parsed = parser::parse_document(content)?;

    if let Some(declared) = parsed.declared_articles {
        if declared != parsed.sections.len() {
            debug!(
                source = %spec.name,
                declared,
                parsed = parsed.sections.len(),
                "article count differs from declared total"
            );
        }
    }

    Ok(SourceDocument {
        source: spec.name.clone(),
        label: spec.label.clone(),
        title: parsed.title,
        origin_url: parsed.origin_url,
        published: parsed.published,
        declared_articles: parsed.declared_articles,
        sections: parsed.sections,
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Per-source work
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Outcome {
    Included(SourceDocument),
    Absent,
    Corrupt {
        path: Option<PathBuf>,
        reason: String,
    },
}

/// Find, read and parse one source's document.
fn collect_one(spec: &SourceSpec, input_dir: &Path, listing: &[String]) -> Outcome {
    let Some(file_name) = locate(spec, listing) else {
        debug!(source = %spec.name, "no matching file, marking absent");
        return Outcome::Absent;
    };
    let path = input_dir.join(&file_name);

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(source = %spec.name, path = %path.display(), error = %e, "source unreadable");
            return Outcome::Corrupt {
                path: Some(path),
                reason: format!("unreadable: {e}"),
            };
        }
    };

    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            warn!(source = %spec.name, path = %path.display(), "source is not valid UTF-8");
            return Outcome::Corrupt {
                path: Some(path),
                reason: format!("not valid UTF-8: {e}"),
            };
        }
    };

    match parse_document(spec, &path, &content) {
        Ok(document) => {
            debug!(
                source = %spec.name,
                path = %path.display(),
                sections = document.sections.len(),
                "source parsed"
            );
            Outcome::Included(document)
        }
        Err(e) => {
            warn!(source = %spec.name, path = %path.display(), error = %e, "source corrupt, excluding");
            Outcome::Corrupt {
                path: Some(path),
                reason: e.to_string(),
            }
        }
    }
}

/// Pick the file for `spec`.
///
/// Patterns are tried in order; within the first pattern that matches, the
/// greatest name wins (timestamped names sort chronologically).
fn locate(spec: &SourceSpec, listing: &[String]) -> Option<String> {
    spec.patterns
        .iter()
        .filter_map(|p| glob_to_regex(p))
        .find_map(|re| listing.iter().filter(|name| re.is_match(name)).max().cloned())
}

/// Sorted names of regular files in `dir`; empty if the directory cannot be read.
fn list_files(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "input directory unreadable, all sources absent");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

/// Convert a file name glob to an anchored regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).ok()
}
