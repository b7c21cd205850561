//! [`DocumentStore`]: thread-safe in-memory map of repository documents.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::patch::{self, PatchError};

/// Whether a `put` created a new document or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Replaced,
}

/// JSON documents keyed by resource path (relative to the service prefix).
///
/// Wraps an `Arc<RwLock<HashMap<..>>>` so that many request handlers can read
/// concurrently while writers take a short exclusive lock.
#[derive(Clone, Debug, Default)]
pub struct DocumentStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: &str, doc: Value) -> PutOutcome {
        match self.inner.write().await.insert(key.to_owned(), doc) {
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Created,
        }
    }

    /// Apply `patch_doc` to the stored document.
    ///
    /// Returns `Ok(false)` if no document exists under `key`. The stored
    /// document is left untouched when the patch fails.
    pub async fn patch(&self, key: &str, patch_doc: &Value) -> Result<bool, PatchError> {
        let mut lock = self.inner.write().await;
        let Some(doc) = lock.get_mut(key) else {
            return Ok(false);
        };
        let mut updated = doc.clone();
        patch::apply(&mut updated, patch_doc)?;
        *doc = updated;
        Ok(true)
    }

    /// Remove a document; returns whether one existed.
    pub async fn remove(&self, key: &str) -> bool {
        self.inner.write().await.remove(key).is_some()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
