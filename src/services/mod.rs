//! Services
//!
//! Business logic for the digest engine. The summary service owns the full
//! generation flow from change records to structured digest.

pub mod summary;
