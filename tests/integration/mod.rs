//! Integration Tests Module
//!
//! End-to-end tests for the digest engine, driven through scripted fake
//! providers and fetchers so every conversation shape is deterministic.

// Scripted provider, recording fetcher, and record builders
mod fakes;

// Daily generation flow: chunking, tool rounds, fallback, final JSON
mod summary_flow_test;

// Phased breaking-change pipeline
mod phased_test;

// Weekly rollup flow
mod weekly_test;
