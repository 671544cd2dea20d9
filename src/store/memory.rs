//! In-memory collaborators seeded with the demo catalogue and staff.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::traits::{DocumentStore, MAX_SEARCH_RESULTS, UserDirectory};
use crate::error::StoreError;
use crate::pipeline::types::{ClearanceLevel, Document, Sensitivity, UserProfile};

/// Keyword-matching document store.
///
/// A document matches when the lowercased query is a substring of its name or
/// description.
pub struct InMemoryDocumentStore {
    documents: Vec<Document>,
}

impl InMemoryDocumentStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Store holding the four demo documents.
    pub fn seeded() -> Self {
        Self::new(seed_documents())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn search(&self, query: &str) -> Result<Vec<Document>, StoreError> {
        let needle = query.to_lowercase();
        let matches: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| {
                d.name.to_lowercase().contains(&needle)
                    || d.description.to_lowercase().contains(&needle)
            })
            .take(MAX_SEARCH_RESULTS)
            .cloned()
            .collect();
        debug!(query, matches = matches.len(), "In-memory document search");
        Ok(matches)
    }
}

/// Exact-match user directory keyed by email address.
pub struct InMemoryUserDirectory {
    users: HashMap<String, UserProfile>,
}

impl InMemoryUserDirectory {
    pub fn new(users: HashMap<String, UserProfile>) -> Self {
        Self { users }
    }

    /// Directory holding the three demo users.
    pub fn seeded() -> Self {
        Self::new(seed_users().into_iter().collect())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn lookup(&self, identity: &str) -> Result<UserProfile, StoreError> {
        Ok(self
            .users
            .get(identity)
            .cloned()
            .unwrap_or_else(UserProfile::unknown))
    }
}

fn doc(
    id: &str,
    name: &str,
    url: &str,
    description: &str,
    sensitivity: Sensitivity,
    required_clearance: ClearanceLevel,
) -> Document {
    Document {
        id: id.into(),
        name: name.into(),
        url: url.into(),
        description: description.into(),
        sensitivity,
        required_clearance,
    }
}

/// The demo document catalogue.
pub fn seed_documents() -> Vec<Document> {
    vec![
        doc(
            "doc_001",
            "Q4 2024 Financial Report",
            "https://docs.google.com/document/d/abc123",
            "Quarterly financial performance, revenue breakdown, and projections",
            Sensitivity::Confidential,
            ClearanceLevel::Executive,
        ),
        doc(
            "doc_002",
            "API Documentation v2.1",
            "https://docs.google.com/document/d/def456",
            "REST API endpoints, authentication, and usage examples for internal services",
            Sensitivity::Internal,
            ClearanceLevel::Standard,
        ),
        doc(
            "doc_003",
            "New Hire Onboarding Guide",
            "https://docs.google.com/document/d/ghi789",
            "Complete onboarding process, benefits info, and company policies",
            Sensitivity::Public,
            ClearanceLevel::Limited,
        ),
        doc(
            "doc_004",
            "Engineering Playbook",
            "https://docs.google.com/document/d/jkl012",
            "Best practices, code review guidelines, and deployment procedures",
            Sensitivity::Internal,
            ClearanceLevel::Standard,
        ),
    ]
}

/// The demo staff, keyed by email address.
pub fn seed_users() -> Vec<(String, UserProfile)> {
    let user = |name: &str, role: &str, department: &str, clearance, tenure_months| UserProfile {
        name: name.into(),
        role: role.into(),
        department: department.into(),
        clearance,
        tenure_months,
    };
    vec![
        (
            "john.doe@company.com".into(),
            user("John Doe", "Senior Engineer", "Engineering", ClearanceLevel::Standard, 24),
        ),
        (
            "intern@company.com".into(),
            user("Jane Intern", "Software Intern", "Engineering", ClearanceLevel::Limited, 1),
        ),
        (
            "cfo@company.com".into(),
            user("Alice CFO", "Chief Financial Officer", "Finance", ClearanceLevel::Executive, 60),
        ),
    ]
}
