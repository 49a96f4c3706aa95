//! Markdown codec for topic files and the index.
//!
//! Topic files are a `# Label` header followed by bullet lines of the form
//! `- <summary> _(<source>, <date>, conf: <c>)_`, with two-space indented
//! continuation lines carrying multi-line detail. This module parses headed
//! sections, extracts clean bullet summaries, and formats insight lines.

use crate::bridge::types::Insight;

/// One `## `-headed section of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub content: String,
}

/// Split a document into `## `-headed sections.
///
/// Content before the first `## ` heading is ignored; the empty document
/// yields an empty vec. Each section's content runs until the next heading
/// (or EOF) and is trimmed of surrounding whitespace.
pub fn parse_markdown_entries(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some((h, body)) = current.take() {
                sections.push(Section {
                    heading: h,
                    content: body.join("\n").trim().to_string(),
                });
            }
            current = Some((heading.trim().to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((h, body)) = current {
        sections.push(Section {
            heading: h,
            content: body.join("\n").trim().to_string(),
        });
    }

    sections
}

/// Extract clean bullet summaries from a document.
///
/// Selects `- ` bullet lines, drops `See `-plus-backticked-filename
/// cross-references, and strips the trailing ` _(...)_` metadata annotation.
pub fn extract_summaries(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("- "))
        .filter(|rest| !rest.is_empty() && !is_cross_reference(rest))
        .map(strip_metadata_annotation)
        .collect()
}

/// A cross-reference bullet points at another file: `See `, then a
/// backticked filename.
fn is_cross_reference(bullet_text: &str) -> bool {
    bullet_text
        .strip_prefix("See ")
        .is_some_and(|rest| rest.starts_with('`'))
}

/// Format an insight as a topic-file bullet.
///
/// The primary line carries source, date, and confidence in an italic
/// suffix. A multi-line `detail` follows as two-space indented continuation
/// lines; single-line details live only in the store and are not emitted.
pub fn format_insight_line(insight: &Insight) -> String {
    let date = chrono::Utc::now().format("%Y-%m-%d");
    let mut line = format!(
        "- {} _({}, {}, conf: {:.2})_",
        insight.summary, insight.source, date, insight.confidence
    );

    if let Some(detail) = &insight.detail {
        if detail.contains('\n') {
            for detail_line in detail.lines() {
                line.push_str("\n  ");
                line.push_str(detail_line);
            }
        }
    }

    line
}

/// Strip a trailing ` _(...)_` metadata annotation from a summary.
pub fn strip_metadata_annotation(summary: &str) -> String {
    if summary.ends_with(")_") {
        if let Some(start) = summary.rfind(" _(") {
            return summary[..start].to_string();
        }
    }
    summary.to_string()
}
