//! Intermediate document parser.
//!
//! Collectors write Markdown in a common shape:
//! - Line 1: `# Title`
//! - Optional: `*Generated on <stamp>*`, `*Scraped on <stamp>*` or
//!   `*Automatically generated on <stamp>*`
//! - Optional: `Source: <url>` (or `**Source PDF:** <url>`) and
//!   `Total articles: <N>`
//! - One heading block per article, with optional `**Date:**`, `**Type:**`,
//!   `**Source:**` and `**Summary:**` lines, followed by a `### Content` or
//!   `#### Content` body.
//!
//! `Table of Contents` and `Statistics` blocks are navigation, not articles.
//! A heading with nothing of its own before the next heading (such as
//! `## News` grouping `### <article>` entries) is dropped. Once an article
//! has content, deeper headings are part of its body.

use std::sync::LazyLock;

use regex::Regex;

use newsdigest_shared::{DigestError, DocumentDate, Result, Section};

use crate::dates::parse_date;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parsed representation of one intermediate document.
#[derive(Debug, Clone)]
pub(crate) struct ParsedDocument {
    pub title: String,
    pub origin_url: Option<String>,
    pub published: Option<DocumentDate>,
    pub declared_articles: Option<usize>,
    pub sections: Vec<Section>,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `# Title`.
static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("H1 regex"));

/// Matches `##` through `######` headings.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{2,6})\s+(.+)$").expect("heading regex"));

/// Matches `*Generated on 2025-07-14 09:30*`, `*Scraped on ...*` and
/// `*Automatically generated on ...*`.
static STAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\*(?:[a-z]+\s+)?(?:generated|scraped)\s+on:?\s+(.+?)\*$")
        .expect("stamp regex")
});

/// Matches `Source: https://...` and `**Source PDF:** https://...` in the
/// document header.
static ORIGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*)?Source(?: PDF)?:(?:\*\*)?\s*(\S+)$").expect("origin regex")
});

/// Matches `Total articles: 12`.
static TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Total articles:\s*(\d+)$").expect("total regex"));

/// Matches `**Date:** ...`, `**Type:** ...`, `**Source:** ...`, `**Summary:** ...`.
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\*(Date|Type|Source|Summary):\*\*\s*(.*)$").expect("field regex")
});

/// Matches the target of a Markdown link.
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)").expect("link regex"));

/// Matches a leading `3. ` or `3) ` enumeration.
static ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").expect("enumeration regex"));

/// Level-2 blocks that are navigation rather than articles.
const STRUCTURAL_HEADINGS: &[&str] = &["table of contents", "contents", "statistics"];

// ---------------------------------------------------------------------------
// Section builder
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SectionBuilder {
    heading: String,
    level: usize,
    date: Option<DocumentDate>,
    kind: Option<String>,
    url: Option<String>,
    summary: Option<String>,
    body: Vec<String>,
    in_body: bool,
}

impl SectionBuilder {
    fn new(heading: &str, level: usize) -> Self {
        Self {
            heading: ENUM_RE.replace(heading.trim(), "").into_owned(),
            level,
            date: None,
            kind: None,
            url: None,
            summary: None,
            body: Vec::new(),
            in_body: false,
        }
    }

    fn has_content(&self) -> bool {
        self.date.is_some()
            || self.kind.is_some()
            || self.url.is_some()
            || self.summary.is_some()
            || self.body.iter().any(|l| !l.trim().is_empty())
    }

    fn set_field(&mut self, name: &str, value: &str) {
        let value = value.trim();
        match name {
            "Date" => self.date = parse_date(value),
            "Type" if !value.is_empty() => self.kind = Some(value.to_string()),
            "Source" => {
                self.url = LINK_RE
                    .captures(value)
                    .map(|caps| caps[1].to_string())
                    .or_else(|| (!value.is_empty()).then(|| value.to_string()));
            }
            "Summary" if !value.is_empty() => self.summary = Some(value.to_string()),
            _ => {}
        }
    }

    fn finish(self) -> Section {
        Section {
            heading: self.heading,
            date: self.date,
            kind: self.kind,
            url: self.url,
            summary: self.summary,
            body: join_paragraphs(&self.body),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an intermediate document.
///
/// Fails only when the document has no content or does not open with a
/// first-level heading; missing optional fields are fine.
pub(crate) fn parse_document(content: &str) -> Result<ParsedDocument> {
    let mut lines = content.lines();

    // --- Extract H1 title ---
    let title = loop {
        match lines.next() {
            Some(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Some(caps) = H1_RE.captures(trimmed) {
                    break caps[1].trim().to_string();
                }
                return Err(DigestError::parse(
                    "document must start with a first-level heading (# Title)",
                ));
            }
            None => return Err(DigestError::parse("document is empty")),
        }
    };

    let mut origin_url = None;
    let mut published = None;
    let mut declared_articles = None;
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<SectionBuilder> = None;
    let mut skip_level: Option<usize> = None;

    for line in lines {
        let trimmed = line.trim();

        if let Some(caps) = HEADING_RE.captures(trimmed) {
            let level = caps[1].len();
            let text = caps[2].trim();

            // Body marker or sub-heading inside an article
            if let Some(section) = current.as_mut() {
                if level > section.level {
                    if text.eq_ignore_ascii_case("content") {
                        section.in_body = true;
                        continue;
                    }
                    if section.in_body || section.has_content() {
                        section.body.push(trimmed.to_string());
                        continue;
                    }
                }
            }

            // Still inside a navigation block?
            if let Some(lvl) = skip_level {
                if level > lvl {
                    continue;
                }
                skip_level = None;
            }

            flush(&mut current, &mut sections);

            let normalized = ENUM_RE.replace(text, "").to_lowercase();
            if STRUCTURAL_HEADINGS.contains(&normalized.as_str()) {
                skip_level = Some(level);
                continue;
            }

            current = Some(SectionBuilder::new(text, level));
            continue;
        }

        if skip_level.is_some() || trimmed == "---" {
            continue;
        }

        match current.as_mut() {
            Some(section) => {
                if !section.in_body {
                    if let Some(caps) = FIELD_RE.captures(trimmed) {
                        section.set_field(&caps[1], &caps[2]);
                        continue;
                    }
                }
                section.body.push(trimmed.to_string());
            }
            None => {
                // Document header lines
                if let Some(caps) = STAMP_RE.captures(trimmed) {
                    published = parse_date(&caps[1]);
                } else if let Some(caps) = ORIGIN_RE.captures(trimmed) {
                    origin_url = Some(caps[1].to_string());
                } else if let Some(caps) = TOTAL_RE.captures(trimmed) {
                    declared_articles = caps[1].parse().ok();
                }
            }
        }
    }

    flush(&mut current, &mut sections);

    Ok(ParsedDocument {
        title,
        origin_url,
        published,
        declared_articles,
        sections,
    })
}

/// Push the open section if it has anything of its own.
fn flush(current: &mut Option<SectionBuilder>, sections: &mut Vec<Section>) {
    if let Some(section) = current.take() {
        if section.has_content() {
            sections.push(section.finish());
        }
    }
}

/// Join trimmed lines into paragraphs separated by one blank line.
fn join_paragraphs(lines: &[String]) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_health_fixture() {
        let content = std::fs::read_to_string("../../../fixtures/intermediate/qld_health_news.md")
            .expect("read fixture");
        let parsed = parse_document(&content).unwrap();

        assert_eq!(parsed.title, "Queensland Health News");
        assert_eq!(
            parsed.origin_url.as_deref(),
            Some("https://www.health.qld.gov.au/newsroom")
        );
        assert!(parsed.published.as_ref().is_some_and(DocumentDate::is_parsed));
        assert_eq!(parsed.declared_articles, Some(2));
        assert_eq!(parsed.sections.len(), 2);

        let first = &parsed.sections[0];
        assert_eq!(first.heading, "New cancer screening program launched");
        assert!(first.date.as_ref().is_some_and(DocumentDate::is_parsed));
        assert_eq!(
            first.url.as_deref(),
            Some("https://www.health.qld.gov.au/newsroom/cancer-screening")
        );
        assert!(first.summary.is_some());
        assert!(first.body.contains("free bowel cancer screening"));
        assert!(first.body.contains("\n\n"));
    }

    #[test]
    fn parse_grouped_parliament_fixture() {
        let content = std::fs::read_to_string("../../../fixtures/intermediate/parliament_news.md")
            .expect("read fixture");
        let parsed = parse_document(&content).unwrap();

        assert_eq!(parsed.title, "Australian Parliament House News & Events");
        // Statistics / Table of Contents skipped, "## News" group dropped.
        let headings: Vec<_> = parsed.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(
            headings,
            vec![
                "Senate passes housing bill",
                "Committee report on water security",
                "Open day at Parliament House",
            ]
        );
        assert_eq!(parsed.sections[0].kind.as_deref(), Some("News"));
        assert_eq!(parsed.sections[2].kind.as_deref(), Some("Event"));
    }

    #[test]
    fn sub_headings_stay_in_article_body() {
        let content = "# Feed\n\n## 1. Budget announced\n\n### Content\n\n\
                       The budget was released.\n\n### Background\n\n\
                       Last year the deficit grew.\n\n## 2. Second story\n\nMore text.\n";
        let parsed = parse_document(content).unwrap();

        let headings: Vec<_> = parsed.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Budget announced", "Second story"]);
        assert_eq!(
            parsed.sections[0].body,
            "The budget was released.\n\n### Background\n\nLast year the deficit grew."
        );
    }

    #[test]
    fn sub_heading_after_plain_body_text() {
        let content = "# Newsletter\n\n## Council News\n\nBikeway approved.\n\n\
                       ### Green Bridges\n\nOpens in August.\n\n## Events\n\nRiverfire.\n";
        let parsed = parse_document(content).unwrap();

        assert_eq!(parsed.sections.len(), 2);
        assert!(parsed.sections[0].body.contains("Opens in August."));
        assert_eq!(parsed.sections[1].heading, "Events");
    }

    #[test]
    fn parse_improved_newsletter_fixture() {
        let content = std::fs::read_to_string(
            "../../../fixtures/intermediate/brisbane_newsletter_summary_20250714_0915.md",
        )
        .expect("read fixture");
        let parsed = parse_document(&content).unwrap();

        assert_eq!(parsed.title, "Brisbane Newsletter Summary");
        assert!(parsed.published.as_ref().is_some_and(DocumentDate::is_parsed));
        assert_eq!(
            parsed.origin_url.as_deref(),
            Some("https://www.brisbane.qld.gov.au/newsletter-july.pdf")
        );
        let headings: Vec<_> = parsed.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Council News", "Community Events"]);
        assert!(parsed.sections[0].body.contains("green bridge"));
    }

    #[test]
    fn unparsable_header_stamp_is_kept_raw() {
        let content = "# Newsletter\n*Generated on Winter edition, early July*\n\n## News\n\nText.\n";
        let parsed = parse_document(content).unwrap();
        assert_eq!(
            parsed.published,
            Some(DocumentDate::Raw {
                text: "Winter edition, early July".into()
            })
        );
    }

    #[test]
    fn unparsable_date_is_kept_raw() {
        let content = "# Feed\n\n## 1. Story\n\n**Date:** the other day\n\n### Content\n\nText.\n";
        let parsed = parse_document(content).unwrap();
        assert_eq!(
            parsed.sections[0].date,
            Some(DocumentDate::Raw {
                text: "the other day".into()
            })
        );
    }

    #[test]
    fn missing_optional_fields() {
        let content = "# Minimal\n\n## Only heading and body\n\nJust a paragraph.\n";
        let parsed = parse_document(content).unwrap();
        assert!(parsed.published.is_none());
        assert!(parsed.origin_url.is_none());
        assert_eq!(parsed.sections.len(), 1);
        let section = &parsed.sections[0];
        assert!(section.date.is_none());
        assert!(section.summary.is_none());
        assert_eq!(section.body, "Just a paragraph.");
    }

    #[test]
    fn field_lines_inside_body_are_text() {
        let content = "# Feed\n\n## Story\n\n### Content\n\n**Summary:** quoted verbatim\n";
        let parsed = parse_document(content).unwrap();
        assert!(parsed.sections[0].summary.is_none());
        assert_eq!(parsed.sections[0].body, "**Summary:** quoted verbatim");
    }

    #[test]
    fn source_without_link_syntax() {
        let content = "# Feed\n\n## Story\n\n**Source:** https://example.org/a\n";
        let parsed = parse_document(content).unwrap();
        assert_eq!(
            parsed.sections[0].url.as_deref(),
            Some("https://example.org/a")
        );
    }

    #[test]
    fn title_only_document_has_no_sections() {
        let parsed = parse_document("# Placeholder output\n\nTotal articles: 0\n").unwrap();
        assert_eq!(parsed.declared_articles, Some(0));
        assert!(parsed.sections.is_empty());
    }

    #[test]
    fn parse_empty_fails() {
        assert!(parse_document("").is_err());
        assert!(parse_document("\n  \n").is_err());
    }

    #[test]
    fn parse_no_h1_fails() {
        let result = parse_document("## Not a title\nSome text.");
        assert!(result.is_err());
    }

    #[test]
    fn join_paragraphs_collapses_blank_runs() {
        let lines: Vec<String> = ["a", "b", "", "", "c", ""]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        assert_eq!(join_paragraphs(&lines), "a\nb\n\nc");
    }
}
