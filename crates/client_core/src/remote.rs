use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Document, DocumentId, StepDecision, StepId, UserId},
    error::ErrorBody,
    protocol::{
        ApprovalDecisionRequest, ApprovalResponse, CreateDocumentRequest, DevUserResponse,
        HealthResponse, LoginRequest, TokenResponse,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{error::ClientError, session::Session, ClientResult};

/// The authoritative backend. Every method is a single request; nothing here
/// retries or times out.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ClientResult<TokenResponse>;
    async fn create_document(&self, title: &str) -> ClientResult<Document>;
    async fn list_documents(&self) -> ClientResult<Vec<Document>>;
    async fn get_document(&self, document_id: &DocumentId) -> ClientResult<Document>;
    async fn decide_step(
        &self,
        document_id: &DocumentId,
        step_id: &StepId,
        decision: StepDecision,
        approver_id: &UserId,
    ) -> ClientResult<ApprovalResponse>;
    async fn create_test_user(&self, email: &str, password: &str)
        -> ClientResult<DevUserResponse>;
    async fn health(&self) -> ClientResult<HealthResponse>;
}

pub struct HttpRemoteClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl HttpRemoteClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> ClientResult<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .map_err(|e| ClientError::Config(format!("invalid server url '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "server url must start with http:// or https://, got '{base_url}'"
            )));
        }
        Ok(Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{endpoint}", self.base_url));
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = if is_json(&response) {
            response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail_text())
        } else {
            None
        };
        warn!(status = status.as_u16(), ?detail, "remote: request failed");
        Err(ClientError::Transport {
            status: status.as_u16(),
            detail,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// For endpoints whose success body is informational only: anything that
    /// is not JSON decodes to the default value.
    async fn send_optional_json<T: DeserializeOwned + Default>(
        &self,
        builder: RequestBuilder,
    ) -> ClientResult<T> {
        let response = self.send(builder).await?;
        if !is_json(&response) {
            return Ok(T::default());
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"))
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn login(&self, request: &LoginRequest) -> ClientResult<TokenResponse> {
        debug!(email = %request.email, "remote: login");
        let builder = self.request(Method::POST, "/auth/login").await.json(request);
        self.send_json(builder).await
    }

    async fn create_document(&self, title: &str) -> ClientResult<Document> {
        let builder = self
            .request(Method::POST, "/documents")
            .await
            .json(&CreateDocumentRequest {
                title: title.to_string(),
            });
        self.send_json(builder).await
    }

    async fn list_documents(&self) -> ClientResult<Vec<Document>> {
        let builder = self.request(Method::GET, "/documents").await;
        self.send_json(builder).await
    }

    async fn get_document(&self, document_id: &DocumentId) -> ClientResult<Document> {
        let builder = self
            .request(Method::GET, &format!("/documents/{document_id}"))
            .await;
        self.send_json(builder).await
    }

    async fn decide_step(
        &self,
        document_id: &DocumentId,
        step_id: &StepId,
        decision: StepDecision,
        approver_id: &UserId,
    ) -> ClientResult<ApprovalResponse> {
        let endpoint = format!(
            "/documents/{document_id}/steps/{step_id}/{}",
            decision.path_segment()
        );
        let builder = self
            .request(Method::POST, &endpoint)
            .await
            .json(&ApprovalDecisionRequest {
                approver_id: approver_id.clone(),
            });
        self.send_optional_json(builder).await
    }

    async fn create_test_user(
        &self,
        email: &str,
        password: &str,
    ) -> ClientResult<DevUserResponse> {
        let builder = self
            .request(Method::POST, "/dev/create-user")
            .await
            .query(&[("email", email), ("password", password)]);
        self.send_optional_json(builder).await
    }

    async fn health(&self) -> ClientResult<HealthResponse> {
        let builder = self.request(Method::GET, "/health").await;
        self.send_optional_json(builder).await
    }
}
