use std::sync::Arc;

use shared::domain::{ApprovalStepSummary, Document, DocumentId, StepDecision, StepId, UserId};
use tracing::{debug, info, warn};

use crate::{
    cache::DocumentCache,
    error::ClientError,
    remote::RemoteClient,
    view::{Screen, View},
    ClientResult,
};

pub const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOutcome {
    pub documents: Vec<Document>,
    /// False when the refresh failed and the cached list stayed on screen.
    pub fresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Cached(Document),
    Fetched(Document),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub decision: StepDecision,
    pub document: Option<Document>,
    pub step: Option<ApprovalStepSummary>,
}

/// Renders from the local cache first, then reconciles with the backend.
///
/// Document status is only ever taken from a backend response; nothing here
/// changes a status ahead of the server.
pub struct SyncCoordinator {
    remote: Arc<dyn RemoteClient>,
    cache: DocumentCache,
    view: Arc<dyn View>,
}

impl SyncCoordinator {
    pub fn new(remote: Arc<dyn RemoteClient>, cache: DocumentCache, view: Arc<dyn View>) -> Self {
        Self {
            remote,
            cache,
            view,
        }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub async fn show_document_list(&self) -> ListOutcome {
        let cached = self.cache.read_all().await;
        self.view.render(Screen::Dashboard {
            documents: cached.clone(),
            loading: true,
        });

        match self.remote.list_documents().await {
            Ok(documents) => {
                if let Err(error) = self.cache.replace_all(&documents).await {
                    warn!(%error, "sync: failed to store refreshed document list");
                }
                info!(count = documents.len(), "sync: document list refreshed");
                self.view.render(Screen::Dashboard {
                    documents: documents.clone(),
                    loading: false,
                });
                ListOutcome {
                    documents,
                    fresh: true,
                }
            }
            Err(error) => {
                warn!(%error, "sync: document list refresh failed; keeping cached list");
                self.view.render(Screen::Dashboard {
                    documents: cached.clone(),
                    loading: false,
                });
                ListOutcome {
                    documents: cached,
                    fresh: false,
                }
            }
        }
    }

    /// A cache hit is final; only a miss goes to the backend, once.
    pub async fn show_document(&self, document_id: &DocumentId) -> DetailOutcome {
        self.view.render(Screen::DocumentLoading);

        if let Some(document) = self.cache.find(document_id).await {
            debug!(%document_id, "sync: document served from cache");
            self.view.render(Screen::DocumentDetail(document.clone()));
            return DetailOutcome::Cached(document);
        }

        match self.remote.get_document(document_id).await {
            Ok(document) => {
                if let Err(error) = self.cache.upsert(document.clone()).await {
                    warn!(%document_id, %error, "sync: failed to cache fetched document");
                }
                self.view.render(Screen::DocumentDetail(document.clone()));
                DetailOutcome::Fetched(document)
            }
            Err(error) => {
                warn!(%document_id, %error, "sync: document unavailable");
                self.view.render(Screen::NotFound);
                DetailOutcome::NotFound
            }
        }
    }

    pub async fn create_document(&self, title: &str) -> ClientResult<Document> {
        let title = validate_title(title)?;
        let document = self.remote.create_document(title).await?;
        info!(document_id = %document.id, "sync: document created");
        if let Err(error) = self.cache.upsert(document.clone()).await {
            warn!(document_id = %document.id, %error, "sync: failed to cache created document");
        }
        Ok(document)
    }

    pub async fn approve_step(
        &self,
        document_id: &DocumentId,
        step_id: &StepId,
        approver_id: &UserId,
    ) -> ClientResult<MutationOutcome> {
        self.decide_step(document_id, step_id, StepDecision::Approve, approver_id)
            .await
    }

    pub async fn reject_step(
        &self,
        document_id: &DocumentId,
        step_id: &StepId,
        approver_id: &UserId,
    ) -> ClientResult<MutationOutcome> {
        self.decide_step(document_id, step_id, StepDecision::Reject, approver_id)
            .await
    }

    async fn decide_step(
        &self,
        document_id: &DocumentId,
        step_id: &StepId,
        decision: StepDecision,
        approver_id: &UserId,
    ) -> ClientResult<MutationOutcome> {
        let response = self
            .remote
            .decide_step(document_id, step_id, decision, approver_id)
            .await?;

        if let Some(document) = &response.document {
            info!(
                document_id = %document.id,
                %step_id,
                %decision,
                status = %document.status,
                "sync: step decision applied"
            );
            if let Err(error) = self.cache.upsert(document.clone()).await {
                warn!(document_id = %document.id, %error, "sync: failed to cache decided document");
            }
        }

        Ok(MutationOutcome {
            decision,
            document: response.document,
            step: response.step,
        })
    }
}

fn validate_title(title: &str) -> ClientResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ClientError::Validation(
            "Please enter a document title".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ClientError::Validation(format!(
            "document title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title)
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
