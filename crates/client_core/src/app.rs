use std::sync::{Arc, Weak};

use async_trait::async_trait;
use shared::{
    domain::{Document, DocumentId, StepId, UserId},
    protocol::{DevUserResponse, HealthResponse},
};
use storage::PersistedStore;
use tracing::{info, warn};

use crate::{
    cache::DocumentCache,
    error::ClientError,
    remote::{HttpRemoteClient, RemoteClient},
    router::{GuardResult, NavigationGuard, RouteParams, Router},
    session::Session,
    sync::{MutationOutcome, SyncCoordinator},
    view::{Screen, View},
    ClientResult,
};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
pub const CREATE_PATH: &str = "/create";
pub const DOCUMENT_PATTERN: &str = "/document/:id";

pub fn document_path(document_id: &DocumentId) -> String {
    format!("/document/{document_id}")
}

/// Sends unauthenticated users to the login page; the login page itself is
/// always reachable.
pub struct AuthGuard {
    session: Session,
}

impl AuthGuard {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl NavigationGuard for AuthGuard {
    async fn check(&self, path: &str) -> GuardResult {
        if path == LOGIN_PATH {
            return GuardResult::Proceed;
        }
        if !self.session.is_authenticated().await {
            return GuardResult::RedirectTo(LOGIN_PATH.to_string());
        }
        GuardResult::Proceed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevUserOutcome {
    Created(DevUserResponse),
    /// The backend answered 500, which in practice means the email is taken.
    MaybeExists,
}

/// The assembled client: router, session, cache and sync wired to one view.
pub struct DocEngineClient {
    router: Arc<Router>,
    session: Session,
    remote: Arc<dyn RemoteClient>,
    sync: Arc<SyncCoordinator>,
    view: Arc<dyn View>,
}

impl DocEngineClient {
    pub fn new(
        router: Arc<Router>,
        store: Arc<dyn PersistedStore>,
        remote: Arc<dyn RemoteClient>,
        view: Arc<dyn View>,
    ) -> Self {
        let session = Session::new(Arc::clone(&store));
        let cache = DocumentCache::new(store);
        let sync = Arc::new(SyncCoordinator::new(
            Arc::clone(&remote),
            cache,
            Arc::clone(&view),
        ));
        Self {
            router,
            session,
            remote,
            sync,
            view,
        }
    }

    /// Builds the client against a live backend at `server_url`.
    pub fn connect(
        server_url: &str,
        router: Arc<Router>,
        store: Arc<dyn PersistedStore>,
        view: Arc<dyn View>,
    ) -> ClientResult<Self> {
        let remote = HttpRemoteClient::new(server_url, Session::new(Arc::clone(&store)))?;
        Ok(Self::new(router, store, Arc::new(remote), view))
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sync(&self) -> &Arc<SyncCoordinator> {
        &self.sync
    }

    /// Registers the route table and the auth guard.
    pub async fn install_routes(&self) {
        let router = Arc::downgrade(&self.router);
        let session = self.session.clone();
        let view = Arc::clone(&self.view);
        self.router
            .register(LOGIN_PATH, move |_params: RouteParams| {
                let router = Weak::clone(&router);
                let session = session.clone();
                let view = Arc::clone(&view);
                async move {
                    if session.is_authenticated().await {
                        if let Some(router) = router.upgrade() {
                            router.navigate(HOME_PATH, true).await;
                        }
                        return;
                    }
                    view.render(Screen::Login);
                }
            })
            .await;

        let sync = Arc::clone(&self.sync);
        self.router
            .register(HOME_PATH, move |_params: RouteParams| {
                let sync = Arc::clone(&sync);
                async move {
                    sync.show_document_list().await;
                }
            })
            .await;

        let view = Arc::clone(&self.view);
        self.router
            .register(CREATE_PATH, move |_params: RouteParams| {
                let view = Arc::clone(&view);
                async move {
                    view.render(Screen::CreateDocument);
                }
            })
            .await;

        let sync = Arc::clone(&self.sync);
        self.router
            .register(DOCUMENT_PATTERN, move |params: RouteParams| {
                let sync = Arc::clone(&sync);
                async move {
                    let document_id =
                        DocumentId::new(params.get("id").cloned().unwrap_or_default());
                    sync.show_document(&document_id).await;
                }
            })
            .await;

        self.router
            .set_guard(AuthGuard::new(self.session.clone()))
            .await;
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<()> {
        self.session
            .login(self.remote.as_ref(), email, password)
            .await?;
        self.router.navigate(HOME_PATH, false).await;
        Ok(())
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.session.logout().await?;
        self.router.navigate(LOGIN_PATH, false).await;
        Ok(())
    }

    pub async fn create_document(&self, title: &str) -> ClientResult<Document> {
        let document = self.sync.create_document(title).await?;
        self.router
            .navigate(document_path(&document.id), false)
            .await;
        Ok(document)
    }

    pub async fn approve_step(
        &self,
        document_id: &DocumentId,
        step_id: &StepId,
        approver_id: &UserId,
    ) -> ClientResult<MutationOutcome> {
        self.sync
            .approve_step(document_id, step_id, approver_id)
            .await
    }

    pub async fn reject_step(
        &self,
        document_id: &DocumentId,
        step_id: &StepId,
        approver_id: &UserId,
    ) -> ClientResult<MutationOutcome> {
        self.sync
            .reject_step(document_id, step_id, approver_id)
            .await
    }

    pub async fn create_test_user(
        &self,
        email: &str,
        password: &str,
    ) -> ClientResult<DevUserOutcome> {
        match self.remote.create_test_user(email, password).await {
            Ok(response) => {
                info!(%email, "dev: test user created");
                Ok(DevUserOutcome::Created(response))
            }
            Err(ClientError::Transport { status: 500, .. }) => {
                warn!(%email, "dev: test user creation failed; user may already exist");
                Ok(DevUserOutcome::MaybeExists)
            }
            Err(error) => Err(error),
        }
    }

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        self.remote.health().await
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
