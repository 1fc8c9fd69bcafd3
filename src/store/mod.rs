//! Persistent document store port.
//!
//! The services only see four logical collections of JSON documents and a
//! small capability set: point get/set, auto-keyed insert, single field
//! update, equality queries, and a read-modify-write transaction scoped to
//! one document. Adapters live in the submodules.

use serde_json::Value;
use std::fmt::Display;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Movies,
    Reviews,
    Ratings,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Movies => "movies",
            Collection::Reviews => "reviews",
            Collection::Ratings => "ratings",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document together with its key
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub body: Value,
}

/// Equality condition on a top-level document field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: &'static str,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn matches(&self, body: &Value) -> bool {
        body.get(self.field) == Some(&self.value)
    }
}

/// Computes the new document from the current one (`None` when absent)
pub type Mutation = Box<dyn FnOnce(Option<Value>) -> AppResult<Value> + Send>;

/// Storage port used by every service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point lookup by key
    async fn get(&self, collection: Collection, key: &str) -> AppResult<Option<Value>>;

    /// Creates or replaces the document at `key`
    async fn set(&self, collection: Collection, key: &str, document: Value) -> AppResult<()>;

    /// Inserts a document under a generated key and returns the key
    async fn add(&self, collection: Collection, document: Value) -> AppResult<String>;

    /// Overwrites one top-level field of an existing document
    ///
    /// Fails with `NotFound` when the document does not exist.
    async fn update_field(
        &self,
        collection: Collection,
        key: &str,
        field: &str,
        value: Value,
    ) -> AppResult<()>;

    /// Returns every document matching all filters, oldest first
    async fn query(&self, collection: Collection, filters: &[Filter]) -> AppResult<Vec<Document>>;

    /// Atomically reads the document, applies `mutation` and writes the
    /// result back. Concurrent transactions on the same document are
    /// serialized; an error from `mutation` aborts without writing.
    async fn run_transaction(
        &self,
        collection: Collection,
        key: &str,
        mutation: Mutation,
    ) -> AppResult<()>;
}
