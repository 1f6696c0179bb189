use std::sync::Arc;

use shared::domain::{Document, DocumentId};
use storage::{keys, PersistedStore};
use tracing::{debug, warn};

use crate::{error::ClientError, ClientResult};

/// Upsert-only mirror of remote documents, serialized as one JSON array
/// under [`keys::DOCUMENTS`].
///
/// Every write is a full read-modify-write of that array. Two overlapping
/// writers race and the later one wins; there is no merge.
#[derive(Clone)]
pub struct DocumentCache {
    store: Arc<dyn PersistedStore>,
}

impl DocumentCache {
    pub fn new(store: Arc<dyn PersistedStore>) -> Self {
        Self { store }
    }

    /// Cached documents in display order. Missing, unreadable and malformed
    /// entries all read as empty.
    pub async fn read_all(&self) -> Vec<Document> {
        let raw = match self.store.get(keys::DOCUMENTS).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                warn!(%error, "cache: failed to read cached documents");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Document>>(&raw) {
            Ok(documents) => documents,
            Err(error) => {
                warn!(%error, "cache: discarding unparseable document cache");
                Vec::new()
            }
        }
    }

    pub async fn find(&self, document_id: &DocumentId) -> Option<Document> {
        self.read_all()
            .await
            .into_iter()
            .find(|document| &document.id == document_id)
    }

    /// Replaces the entry with the same id in place, or prepends a new one.
    pub async fn upsert(&self, document: Document) -> ClientResult<()> {
        let mut documents = self.read_all().await;
        match documents.iter_mut().find(|existing| existing.id == document.id) {
            Some(existing) => {
                debug!(document_id = %document.id, "cache: replacing entry in place");
                *existing = document;
            }
            None => {
                debug!(document_id = %document.id, "cache: prepending new entry");
                documents.insert(0, document);
            }
        }
        self.persist(&documents).await
    }

    pub async fn replace_all(&self, documents: &[Document]) -> ClientResult<()> {
        debug!(count = documents.len(), "cache: replacing all entries");
        self.persist(documents).await
    }

    async fn persist(&self, documents: &[Document]) -> ClientResult<()> {
        let raw = serde_json::to_string(documents)
            .map_err(|e| ClientError::Persistence(e.into()))?;
        self.store
            .set(keys::DOCUMENTS, &raw)
            .await
            .map_err(ClientError::Persistence)
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
