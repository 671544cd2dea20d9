//! Collaborator traits.
//!
//! The pipeline only depends on these; the in-memory implementations stand in
//! for a real semantic search service and a real identity directory.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::pipeline::types::{Document, UserProfile};

/// Maximum number of candidates a search returns.
pub const MAX_SEARCH_RESULTS: usize = 3;

/// Searchable document catalogue.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Best matches for `query`, at most `MAX_SEARCH_RESULTS`, best first.
    async fn search(&self, query: &str) -> Result<Vec<Document>, StoreError>;
}

/// Identity → profile lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Profile for `identity`, or `UserProfile::unknown()` when not found.
    async fn lookup(&self, identity: &str) -> Result<UserProfile, StoreError>;
}
