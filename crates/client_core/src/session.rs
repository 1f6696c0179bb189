use std::sync::Arc;

use shared::protocol::{LoginRequest, TokenResponse};
use storage::{keys, PersistedStore};
use tracing::{info, warn};

use crate::{error::ClientError, remote::RemoteClient, ClientResult};

/// Bearer token and display email, kept in the persisted store so a restart
/// keeps the user signed in.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn PersistedStore>,
}

impl Session {
    pub fn new(store: Arc<dyn PersistedStore>) -> Self {
        Self { store }
    }

    pub async fn token(&self) -> Option<String> {
        match self.store.get(keys::AUTH_TOKEN).await {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(error) => {
                warn!(%error, "session: failed to read auth token");
                None
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token().await.is_some()
    }

    pub async fn user_email(&self) -> Option<String> {
        self.store.get(keys::USER_EMAIL).await.ok().flatten()
    }

    pub async fn login(
        &self,
        remote: &dyn RemoteClient,
        email: &str,
        password: &str,
    ) -> ClientResult<TokenResponse> {
        let response = remote
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;

        self.store
            .set(keys::AUTH_TOKEN, &response.access_token)
            .await
            .map_err(ClientError::Persistence)?;
        self.store
            .set(keys::USER_EMAIL, email)
            .await
            .map_err(ClientError::Persistence)?;
        info!(%email, "session: signed in");
        Ok(response)
    }

    /// Drops the token, the display email and the cached documents.
    pub async fn logout(&self) -> ClientResult<()> {
        for key in [keys::AUTH_TOKEN, keys::USER_EMAIL, keys::DOCUMENTS] {
            self.store
                .remove(key)
                .await
                .map_err(ClientError::Persistence)?;
        }
        info!("session: signed out");
        Ok(())
    }
}
