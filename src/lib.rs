//! Repo Pulse
//!
//! Generates daily and weekly digests of a mirrored repository's commit
//! activity by driving an agentic, tool-calling conversation with an LLM
//! backend. This crate holds the orchestration strategy; foundational types
//! live in `repo-pulse-core`, the provider abstraction in `repo-pulse-llm`,
//! and the tool bridge in `repo-pulse-tools`.
//!
//! Fetching the commit list, rendering HTML, and persisting digests are the
//! surrounding workflow's responsibility; this crate consumes change
//! records and produces [`StructuredSummary`] values.

pub mod services;

pub use services::summary::{verify_citations, SummaryEngine};

// Re-export the value objects callers exchange with the engine.
pub use repo_pulse_core::{
    ChangeDetail, ChangeRecord, DailyDigest, DigestWindow, StructuredSummary,
    SummaryConfiguration, WeekWindow,
};
