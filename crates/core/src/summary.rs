//! Digest Model
//!
//! The structured summary produced by the generation engine, the
//! configuration that steers it, and the date-window descriptors passed in
//! by the digest workflow. The summary is an in-memory value object; HTML
//! rendering and persistence live outside this workspace core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which generation strategy the engine runs.
///
/// The two strategies differ in how conservatively they flag breaking
/// changes; the choice is product policy, so it is a configuration switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Single agentic investigation loop per chunk.
    Agentic,
    /// Five-phase breaking-change pipeline per chunk.
    Phased,
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::Agentic
    }
}

/// Options steering a digest generation run. All fields are optional;
/// absence means no bias is applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryConfiguration {
    /// Free-text steering directive appended to every prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    /// Comma-separated keywords that bias categorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interesting_keywords: Option<String>,
    /// Named subsystems to emphasize, in priority order.
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Additional bot senders excluded upstream of this engine. Carried
    /// here so prompts can mention the exclusion.
    #[serde(default)]
    pub ignored_bot_emails: Vec<String>,
    /// Provider name ("anthropic", "openai"). Unknown names fail at engine
    /// construction, not at first use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
    /// Strategy selection, defaults to the agentic loop.
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Criteria text the model applies when flagging breaking changes.
    /// The engine never classifies breaking-ness itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking_change_criteria: Option<String>,
}

impl SummaryConfiguration {
    /// The keyword list split out of the comma-separated field.
    pub fn keyword_list(&self) -> Vec<&str> {
        self.interesting_keywords
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One bullet point inside a digest category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Display text; may embed lightweight markup directives.
    pub text: String,
    /// Commit hashes this point was derived from. Never empty in a valid
    /// summary.
    pub commits: Vec<String>,
    /// Set when the model judged the point to describe a breaking change.
    #[serde(default)]
    pub breaking: bool,
}

/// A titled group of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
    pub points: Vec<Point>,
}

/// The engine's single output type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSummary {
    pub title: String,
    pub overview: String,
    pub categories: Vec<Category>,
}

impl StructuredSummary {
    /// All commit hashes cited anywhere in the summary, in document order.
    pub fn cited_shas(&self) -> Vec<&str> {
        self.categories
            .iter()
            .flat_map(|c| c.points.iter())
            .flat_map(|p| p.commits.iter())
            .map(String::as_str)
            .collect()
    }

    /// Parse model output into a summary.
    ///
    /// Tolerates markdown code fences and prose around the JSON object, but
    /// is strict about the object itself: missing fields or a point without
    /// citations are rejected.
    pub fn from_llm_text(text: &str) -> Result<Self, SummaryParseError> {
        let block = extract_json_object(text).ok_or(SummaryParseError::MissingJson)?;
        let summary: StructuredSummary = serde_json::from_str(block)?;
        for category in &summary.categories {
            for point in &category.points {
                if point.commits.is_empty() {
                    return Err(SummaryParseError::Shape(format!(
                        "point \"{}\" cites no commits",
                        truncate(&point.text, 60)
                    )));
                }
            }
        }
        Ok(summary)
    }
}

/// Errors from parsing model output into a [`StructuredSummary`].
#[derive(Debug, Error)]
pub enum SummaryParseError {
    #[error("no JSON object found in model output")]
    MissingJson,
    #[error("invalid summary JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("summary shape invalid: {0}")]
    Shape(String),
}

/// Slice out the outermost `{...}` object, skipping code fences and prose.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// One prior daily digest, as fed into the weekly rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDigest {
    /// Date label of the day this digest covers, e.g. "2025-06-01".
    pub date_label: String,
    pub summary: StructuredSummary,
}

/// Context for a daily generation run: which day and branch, plus batch
/// statistics quoted back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestWindow {
    pub date_label: String,
    pub branch: String,
    /// Commits observed on the day before any filtering.
    pub total_count: usize,
    /// Commits remaining after upstream bot filtering.
    pub relevant_count: usize,
    /// First commit hash of the day, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_sha: Option<String>,
    /// Last commit hash of the day, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sha: Option<String>,
}

/// Context for a weekly rollup run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub start_date: String,
    pub end_date: String,
    pub year: i32,
    pub week_number: u32,
}
