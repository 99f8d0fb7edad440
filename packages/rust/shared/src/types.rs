//! Core domain types shared by the collector and the summarization pipeline.

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DocumentDate
// ---------------------------------------------------------------------------

/// A date found in an intermediate document.
///
/// Dates that match none of the known formats keep their raw text; a bad date
/// degrades one field, never the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentDate {
    /// Calendar date without a time of day.
    Date { date: NaiveDate },
    /// Date with a time of day.
    DateTime { datetime: NaiveDateTime },
    /// Unrecognized text, kept verbatim.
    Raw { text: String },
}

impl DocumentDate {
    /// Whether the value was understood as a calendar date.
    pub fn is_parsed(&self) -> bool {
        !matches!(self, Self::Raw { .. })
    }
}

impl fmt::Display for DocumentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date { date } => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime { datetime } => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M")),
            Self::Raw { text } => f.write_str(text),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceDocument
// ---------------------------------------------------------------------------

/// One article (second-level block) of an intermediate document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Article heading with any leading enumeration removed.
    pub heading: String,
    /// Value of the `**Date:**` line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DocumentDate>,
    /// Value of the `**Type:**` line (news, media, event).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Target of the `**Source:**` link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Value of the `**Summary:**` line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Body paragraphs separated by blank lines.
    pub body: String,
}

/// A parsed intermediate document from one collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Name of the expected source this document satisfies.
    pub source: String,
    /// Human-readable source label.
    pub label: String,
    /// First-level heading.
    pub title: String,
    /// URL from the `Source:` header line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
    /// Timestamp from the `*Generated on*` / `*Scraped on*` line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DocumentDate>,
    /// Value of the `Total articles:` line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_articles: Option<usize>,
    /// Articles in document order.
    pub sections: Vec<Section>,
    /// File the document was read from.
    pub path: PathBuf,
}

impl SourceDocument {
    /// Total characters of section text (headings, summaries and bodies).
    pub fn content_chars(&self) -> usize {
        self.sections
            .iter()
            .map(|s| {
                s.heading.chars().count()
                    + s.summary.as_deref().map_or(0, |t| t.chars().count())
                    + s.body.chars().count()
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Outcome of looking for one expected source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Parsed and part of the corpus.
    Included,
    /// No file matched the source's naming convention.
    Absent,
    /// A file was found but could not be parsed; excluded from the corpus.
    Corrupt { reason: String },
}

impl SourceStatus {
    /// Short label used in manifest tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Included => "included",
            Self::Absent => "absent",
            Self::Corrupt { .. } => "corrupt",
        }
    }
}

/// Manifest line for one expected source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Source name.
    pub source: String,
    /// Human-readable label.
    pub label: String,
    /// Whether the source made it into the corpus.
    #[serde(flatten)]
    pub status: SourceStatus,
    /// Matched file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Number of parsed articles (0 unless included).
    pub sections: usize,
}

/// Per-run accounting of which expected sources were included, absent, or corrupt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    /// One entry per expected source, in catalog order.
    pub entries: Vec<ManifestEntry>,
}

/// Aggregated manifest counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCounts {
    pub included: usize,
    pub absent: usize,
    pub corrupt: usize,
}

impl ManifestCounts {
    /// Number of expected sources.
    pub fn total(&self) -> usize {
        self.included + self.absent + self.corrupt
    }
}

impl SourceManifest {
    /// Count entries by status.
    pub fn counts(&self) -> ManifestCounts {
        let mut counts = ManifestCounts::default();
        for entry in &self.entries {
            match entry.status {
                SourceStatus::Included => counts.included += 1,
                SourceStatus::Absent => counts.absent += 1,
                SourceStatus::Corrupt { .. } => counts.corrupt += 1,
            }
        }
        counts
    }

    /// Entries whose document is part of the corpus.
    pub fn included(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == SourceStatus::Included)
    }
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// All parsed documents for one run, plus the manifest describing how they were found.
///
/// Rebuilt fresh for each run; documents keep catalog order regardless of
/// the order in which parsing finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    /// Included documents in catalog order.
    pub documents: Vec<SourceDocument>,
    /// Status of every expected source.
    pub manifest: SourceManifest,
}

impl Corpus {
    /// Whether no source made it into the corpus.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Total characters of article text across all documents.
    pub fn content_chars(&self) -> usize {
        self.documents.iter().map(SourceDocument::content_chars).sum()
    }
}

// ---------------------------------------------------------------------------
// LanguageProfile
// ---------------------------------------------------------------------------

/// Header strings rendered in the body of the final document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderLabels {
    pub title: &'static str,
    pub executive_summary: &'static str,
    pub highlights: &'static str,
    pub correlations: &'static str,
}

/// Fixed English labels; used by every profile without native-script headers.
pub const ENGLISH_LABELS: HeaderLabels = HeaderLabels {
    title: "Comprehensive News Summary",
    executive_summary: "Executive Summary",
    highlights: "Categorized Highlights",
    correlations: "Cross-Source Correlations",
};

/// Canonical language identity plus its header rendering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageProfile {
    /// Canonical code, e.g. `zh`.
    pub code: &'static str,
    /// Display name, e.g. `Chinese (中文)`.
    pub display_name: &'static str,
    /// Section labels for the document body.
    pub labels: HeaderLabels,
    /// `false` means English labels with translated body text only.
    pub has_native_headers: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, status: SourceStatus) -> ManifestEntry {
        ManifestEntry {
            source: source.into(),
            label: source.to_uppercase(),
            status,
            path: None,
            sections: 0,
        }
    }

    #[test]
    fn manifest_counts_sum_to_total() {
        let manifest = SourceManifest {
            entries: vec![
                entry("health", SourceStatus::Included),
                entry("parliament", SourceStatus::Absent),
                entry(
                    "newsletter",
                    SourceStatus::Corrupt {
                        reason: "missing title".into(),
                    },
                ),
                entry("council", SourceStatus::Included),
            ],
        };
        let counts = manifest.counts();
        assert_eq!(counts.included, 2);
        assert_eq!(counts.absent, 1);
        assert_eq!(counts.corrupt, 1);
        assert_eq!(counts.total(), manifest.entries.len());
        assert_eq!(manifest.included().count(), 2);
    }

    #[test]
    fn document_date_display() {
        let date = DocumentDate::Date {
            date: NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
        };
        assert_eq!(date.to_string(), "2025-07-14");
        assert!(date.is_parsed());

        let raw = DocumentDate::Raw {
            text: "Last Tuesday-ish".into(),
        };
        assert_eq!(raw.to_string(), "Last Tuesday-ish");
        assert!(!raw.is_parsed());
    }

    #[test]
    fn manifest_entry_serializes_flat_status() {
        let e = entry(
            "parliament",
            SourceStatus::Corrupt {
                reason: "not UTF-8".into(),
            },
        );
        let json = serde_json::to_string(&e).expect("serialize");
        assert!(json.contains(r#""status":"corrupt""#));
        assert!(json.contains(r#""reason":"not UTF-8""#));
    }

    #[test]
    fn content_chars_counts_characters_not_bytes() {
        let doc = SourceDocument {
            source: "s".into(),
            label: "S".into(),
            title: "T".into(),
            origin_url: None,
            published: None,
            declared_articles: None,
            sections: vec![Section {
                heading: "新闻".into(),
                date: None,
                kind: None,
                url: None,
                summary: Some("ab".into()),
                body: "héllo".into(),
            }],
            path: PathBuf::from("s.md"),
        };
        assert_eq!(doc.content_chars(), 2 + 2 + 5);
    }
}
