//! Collaborators the pipeline reads from: document search and user lookup.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryDocumentStore, InMemoryUserDirectory};
pub use traits::{DocumentStore, UserDirectory};
