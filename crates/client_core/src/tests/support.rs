//! In-memory fakes shared by the unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{
        ApprovalStepStatus, ApprovalStepSummary, Document, DocumentId, DocumentStatus,
        StepDecision, StepId, UserId,
    },
    protocol::{ApprovalResponse, DevUserResponse, HealthResponse, LoginRequest, TokenResponse},
};
use storage::{MemoryStore, PersistedStore};
use tokio::sync::Mutex;

use crate::{
    error::ClientError,
    remote::RemoteClient,
    view::{Screen, View},
    ClientResult,
};

pub(crate) fn document(id: &str, title: &str, status: DocumentStatus) -> Document {
    Document {
        id: DocumentId::from(id),
        title: title.to_string(),
        status,
        created_at: Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub(crate) fn memory_store() -> Arc<dyn PersistedStore> {
    Arc::new(MemoryStore::new())
}

#[derive(Default)]
pub(crate) struct RecordingView {
    screens: std::sync::Mutex<Vec<Screen>>,
}

impl RecordingView {
    pub(crate) fn screens(&self) -> Vec<Screen> {
        self.screens.lock().expect("screens").clone()
    }

    pub(crate) fn last(&self) -> Option<Screen> {
        self.screens.lock().expect("screens").last().cloned()
    }
}

impl View for RecordingView {
    fn render(&self, screen: Screen) {
        self.screens.lock().expect("screens").push(screen);
    }
}

/// Backend double holding its own authoritative document list.
pub(crate) struct FakeRemote {
    pub(crate) documents: Mutex<Vec<Document>>,
    pub(crate) fail_with_status: Mutex<Option<u16>>,
    pub(crate) include_document_in_decision: bool,
    pub(crate) password: String,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    decide_calls: AtomicUsize,
}

impl FakeRemote {
    pub(crate) fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: Mutex::new(documents),
            fail_with_status: Mutex::new(None),
            include_document_in_decision: true,
            password: "password123".to_string(),
            next_id: AtomicUsize::new(1),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            decide_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(status: u16) -> Self {
        let remote = Self::new(Vec::new());
        *remote.fail_with_status.try_lock().expect("fresh lock") = Some(status);
        remote
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn decide_calls(&self) -> usize {
        self.decide_calls.load(Ordering::SeqCst)
    }

    async fn check_failure(&self) -> ClientResult<()> {
        match *self.fail_with_status.lock().await {
            Some(status) => Err(ClientError::Transport {
                status,
                detail: Some(format!("forced failure {status}")),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn login(&self, request: &LoginRequest) -> ClientResult<TokenResponse> {
        self.check_failure().await?;
        if request.password != self.password {
            return Err(ClientError::Transport {
                status: 401,
                detail: Some("Invalid credentials.".to_string()),
            });
        }
        Ok(TokenResponse {
            access_token: format!("token-for-{}", request.email),
            token_type: "bearer".to_string(),
        })
    }

    async fn create_document(&self, title: &str) -> ClientResult<Document> {
        self.check_failure().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = document(&format!("new-{id}"), title, DocumentStatus::Pending);
        self.documents.lock().await.insert(0, created.clone());
        Ok(created)
    }

    async fn list_documents(&self) -> ClientResult<Vec<Document>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;
        Ok(self.documents.lock().await.clone())
    }

    async fn get_document(&self, document_id: &DocumentId) -> ClientResult<Document> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;
        self.documents
            .lock()
            .await
            .iter()
            .find(|document| &document.id == document_id)
            .cloned()
            .ok_or(ClientError::Transport {
                status: 404,
                detail: Some("Document not found.".to_string()),
            })
    }

    async fn decide_step(
        &self,
        document_id: &DocumentId,
        step_id: &StepId,
        decision: StepDecision,
        approver_id: &UserId,
    ) -> ClientResult<ApprovalResponse> {
        self.decide_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure().await?;
        let mut documents = self.documents.lock().await;
        let document = documents
            .iter_mut()
            .find(|document| &document.id == document_id)
            .ok_or(ClientError::Transport {
                status: 404,
                detail: Some("Document not found.".to_string()),
            })?;
        if document.status.is_terminal() {
            return Err(ClientError::Transport {
                status: 409,
                detail: Some("Document is already finalized.".to_string()),
            });
        }
        let (status, step_status) = match decision {
            StepDecision::Approve => (DocumentStatus::Approved, ApprovalStepStatus::Approved),
            StepDecision::Reject => (DocumentStatus::Rejected, ApprovalStepStatus::Rejected),
        };
        document.status = status;
        Ok(ApprovalResponse {
            document: self.include_document_in_decision.then(|| document.clone()),
            step: Some(ApprovalStepSummary {
                id: step_id.clone(),
                document_id: document_id.clone(),
                approver_id: approver_id.clone(),
                step_order: 1,
                status: step_status,
            }),
        })
    }

    async fn create_test_user(
        &self,
        email: &str,
        _password: &str,
    ) -> ClientResult<DevUserResponse> {
        self.check_failure().await?;
        Ok(DevUserResponse {
            id: Some("user-1".to_string()),
            email: Some(email.to_string()),
        })
    }

    async fn health(&self) -> ClientResult<HealthResponse> {
        self.check_failure().await?;
        Ok(HealthResponse::default())
    }
}
