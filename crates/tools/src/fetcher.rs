//! Detail Fetcher
//!
//! Retrieves extended change detail (per-file diffs and stats) for a batch
//! of commit hashes. Fetches run in bounded-concurrency batches with a
//! settle delay between batches to respect the mirror's own rate limits. A
//! failed lookup for one hash never fails the batch; it simply yields no
//! detail for that hash.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use thiserror::Error;

use repo_pulse_core::change::{ChangeDetail, FileDelta};

/// Concurrent lookups per batch.
const FETCH_CONCURRENCY: usize = 5;

/// Pause between batches.
const BATCH_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Per-request timeout for detail lookups.
const DETAIL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the detail fetch boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("commit lookup failed (HTTP {status}): {message}")]
    Http { status: u16, message: String },
    #[error("unexpected response shape: {0}")]
    Parse(String),
}

/// Result type for detail fetching.
pub type FetchResult<T> = Result<T, FetchError>;

/// Boundary trait for fetching commit detail.
///
/// Implementations return one slot per requested hash, in request order;
/// `None` marks a hash whose lookup failed or returned nothing.
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch_details(&self, shas: &[String]) -> FetchResult<Vec<Option<ChangeDetail>>>;
}

/// Detail fetcher backed by the GitHub commits REST endpoint.
pub struct GitHubDetailFetcher {
    client: reqwest::Client,
    base_url: String,
    /// "owner/name" of the mirrored repository.
    repo: String,
    token: Option<String>,
}

impl GitHubDetailFetcher {
    pub fn new(repo: impl Into<String>, token: Option<String>) -> Self {
        Self::with_base_url("https://api.github.com", repo, token)
    }

    /// Point at a different API host, used against GHES mirrors and tests.
    pub fn with_base_url(
        base_url: impl Into<String>,
        repo: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DETAIL_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            repo: repo.into(),
            token,
        }
    }

    async fn fetch_one(&self, sha: &str) -> FetchResult<ChangeDetail> {
        let url = format!("{}/repos/{}/commits/{}", self.base_url, self.repo, sha);
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "repo-pulse");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Http { status, message });
        }

        let commit: CommitResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(ChangeDetail {
            sha: commit.sha,
            additions: commit.stats.as_ref().map_or(0, |s| s.additions),
            deletions: commit.stats.as_ref().map_or(0, |s| s.deletions),
            files: commit
                .files
                .into_iter()
                .map(|f| FileDelta {
                    path: f.filename,
                    status: f.status,
                    additions: f.additions,
                    deletions: f.deletions,
                    patch: f.patch,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl DetailFetcher for GitHubDetailFetcher {
    async fn fetch_details(&self, shas: &[String]) -> FetchResult<Vec<Option<ChangeDetail>>> {
        let mut details = Vec::with_capacity(shas.len());
        let batch_count = shas.chunks(FETCH_CONCURRENCY).count();

        for (i, batch) in shas.chunks(FETCH_CONCURRENCY).enumerate() {
            let lookups = batch.iter().map(|sha| self.fetch_one(sha));
            for (sha, result) in batch.iter().zip(join_all(lookups).await) {
                match result {
                    Ok(detail) => details.push(Some(detail)),
                    Err(e) => {
                        tracing::warn!(sha = %sha, error = %e, "commit detail lookup failed");
                        details.push(None);
                    }
                }
            }
            if i + 1 < batch_count {
                tokio::time::sleep(BATCH_SETTLE_DELAY).await;
            }
        }

        Ok(details)
    }
}

/// GitHub commit endpoint response format
#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    #[serde(default)]
    stats: Option<CommitStats>,
    #[serde(default)]
    files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
struct CommitStats {
    additions: usize,
    deletions: usize,
}

#[derive(Debug, Deserialize)]
struct CommitFile {
    filename: String,
    status: String,
    #[serde(default)]
    additions: usize,
    #[serde(default)]
    deletions: usize,
    #[serde(default)]
    patch: Option<String>,
}
