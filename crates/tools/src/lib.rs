//! Repo Pulse Tools
//!
//! The bridge between the model's tool invocations and the commit mirror.
//! One tool exists: fetching extended detail for a batch of commits. The
//! executor turns each invocation into a formatted text block; fetch
//! failures become inline error strings the model reads on the next turn,
//! never engine errors.

pub mod definitions;
pub mod executor;
pub mod fetcher;

pub use definitions::{fetch_details_tool, tool_definitions, FETCH_DETAILS_TOOL, MAX_IDS_PER_CALL};
pub use executor::{ToolExecutor, ToolResult};
pub use fetcher::{DetailFetcher, FetchError, FetchResult, GitHubDetailFetcher};
