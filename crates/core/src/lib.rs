//! Repo Pulse Core
//!
//! Foundational types for the Repo Pulse workspace: the commit domain model,
//! the structured digest model, and the unified stream-event types shared by
//! the LLM providers. This crate has zero dependencies on application-level
//! code (HTTP clients, LLM providers, tool execution).
//!
//! ## Module Organization
//!
//! - `change` - Commit domain model (`ChangeRecord`, `ChangeDetail`, `FileDelta`)
//! - `summary` - Digest model (`StructuredSummary`, `SummaryConfiguration`, windows)
//! - `streaming` - Unified stream event types and adapter trait
//!
//! ## Design Principles
//!
//! 1. **Minimal dependencies (serde/chrono/thiserror)** - keeps build times low
//! 2. **Value objects** - everything here is plain data, cheap to clone and test
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod change;
pub mod streaming;
pub mod summary;

// ── Commit Domain Model ────────────────────────────────────────────────
pub use change::{ChangeAuthor, ChangeDetail, ChangeRecord, FileDelta};

// ── Digest Model ───────────────────────────────────────────────────────
pub use summary::{
    Category, DailyDigest, DigestWindow, Point, StrategyKind, StructuredSummary,
    SummaryConfiguration, SummaryParseError, WeekWindow,
};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
