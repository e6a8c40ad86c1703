//! HTTP Client Factory
//!
//! Provides a factory function for building reqwest clients with the hard
//! per-attempt timeout applied.

use std::time::Duration;

/// Build a `reqwest::Client` with a total-request timeout.
///
/// The timeout covers the whole exchange including the response body, so a
/// stalled stream is bounded by the same wall clock as a slow first byte.
/// Hitting it surfaces as a retryable network error in the caller.
pub fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("failed to build reqwest client")
}
