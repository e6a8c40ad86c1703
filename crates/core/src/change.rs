//! Commit Domain Model
//!
//! Value objects describing one unit of history from the mirrored repository
//! and its lazily-fetched detail view. Records are immutable once fetched;
//! details exist only for the duration of a tool round and are never stored
//! alongside the base record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author or committer identity attached to a change record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeAuthor {
    pub name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

/// One atomic unit of history from the mirrored repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Full commit hash.
    pub sha: String,
    pub author: ChangeAuthor,
    pub committer: ChangeAuthor,
    /// Full commit message, first line is the title.
    pub message: String,
    /// Affected file paths. The upstream fetcher caps this list, so it is
    /// safe to embed wholesale in prompts.
    pub files: Vec<String>,
    /// Parent commit hashes (empty for the root commit).
    #[serde(default)]
    pub parents: Vec<String>,
    /// Tree hash, when the mirror exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<String>,
}

impl ChangeRecord {
    /// First line of the commit message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Abbreviated hash for display contexts.
    pub fn short_sha(&self) -> &str {
        let end = self.sha.len().min(12);
        &self.sha[..end]
    }
}

/// Per-file change within a [`ChangeDetail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDelta {
    pub path: String,
    /// Host-reported status: "added", "modified", "removed", "renamed".
    pub status: String,
    pub additions: usize,
    pub deletions: usize,
    /// Unified-diff patch text. Large or binary files come back without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

/// Enriched, on-demand view of a [`ChangeRecord`].
///
/// Fetched only when the model asks for it through the detail tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetail {
    pub sha: String,
    pub files: Vec<FileDelta>,
    /// Aggregate added lines across all files.
    pub additions: usize,
    /// Aggregate deleted lines across all files.
    pub deletions: usize,
}
