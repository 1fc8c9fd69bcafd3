use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Collection, Document, DocumentStore, Filter, Mutation};
use crate::error::{AppError, AppResult};

struct Entry {
    seq: u64,
    body: Value,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<Collection, HashMap<String, Entry>>,
    next_seq: u64,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn put(&mut self, collection: Collection, key: &str, body: Value) {
        let seq = self.bump();
        let docs = self.collections.entry(collection).or_default();
        match docs.get_mut(key) {
            // Replacing keeps the original creation order
            Some(entry) => entry.body = body,
            None => {
                docs.insert(key.to_string(), Entry { seq, body });
            }
        }
    }
}

/// Process-local document store
///
/// Backs the `memory` store backend and every service test. A single lock
/// guards all collections, so transactions are trivially serialized.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection
    pub async fn len(&self, collection: Collection) -> usize {
        let inner = self.inner.read().await;
        inner.collections.get(&collection).map_or(0, |docs| docs.len())
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: Collection, key: &str) -> AppResult<Option<Value>> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(key))
            .map(|entry| entry.body.clone()))
    }

    async fn set(&self, collection: Collection, key: &str, document: Value) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.put(collection, key, document);
        Ok(())
    }

    async fn add(&self, collection: Collection, document: Value) -> AppResult<String> {
        let mut inner = self.inner.write().await;
        let key = format!("{}-{:08}", collection, inner.next_seq + 1);
        inner.put(collection, &key, document);
        Ok(key)
    }

    async fn update_field(
        &self,
        collection: Collection,
        key: &str,
        field: &str,
        value: Value,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(key))
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", collection, key)))?;

        match entry.body.as_object_mut() {
            Some(object) => {
                object.insert(field.to_string(), value);
                Ok(())
            }
            None => Err(AppError::Storage(format!(
                "{}/{} is not an object document",
                collection, key
            ))),
        }
    }

    async fn query(&self, collection: Collection, filters: &[Filter]) -> AppResult<Vec<Document>> {
        let inner = self.inner.read().await;
        let Some(docs) = inner.collections.get(&collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<(u64, Document)> = docs
            .iter()
            .filter(|(_, entry)| filters.iter().all(|filter| filter.matches(&entry.body)))
            .map(|(key, entry)| {
                (
                    entry.seq,
                    Document {
                        key: key.clone(),
                        body: entry.body.clone(),
                    },
                )
            })
            .collect();
        matches.sort_by_key(|(seq, _)| *seq);

        Ok(matches.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn run_transaction(
        &self,
        collection: Collection,
        key: &str,
        mutation: Mutation,
    ) -> AppResult<()> {
        // Holding the write lock across read, compute and write serializes
        // every transaction
        let mut inner = self.inner.write().await;
        let current = inner
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(key))
            .map(|entry| entry.body.clone());

        let updated = mutation(current)?;
        inner.put(collection, key, updated);
        Ok(())
    }
}
