use std::{
    collections::HashSet,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router as HttpRouter,
};
use chrono::Utc;
use client_core::{
    ClientError, DetailOutcome, DevUserOutcome, DocEngineClient, HttpRemoteClient, RemoteClient,
    Router, Screen, Session, View,
};
use serde::Deserialize;
use serde_json::json;
use shared::{
    domain::{
        ApprovalStepStatus, ApprovalStepSummary, Document, DocumentId, DocumentStatus, StepId,
        UserId,
    },
    protocol::{ApprovalDecisionRequest, ApprovalResponse, CreateDocumentRequest, LoginRequest},
};
use storage::{keys, MemoryStore, PersistedStore, SqliteStore};
use tokio::{net::TcpListener, sync::Mutex};

const TOKEN: &str = "stub-token";
const PASSWORD: &str = "password123";

#[derive(Default)]
struct Backend {
    documents: Vec<Document>,
    users: HashSet<String>,
    get_calls: usize,
}

type Shared = Arc<Mutex<Backend>>;

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

async fn login(Json(request): Json<LoginRequest>) -> Response {
    if request.password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials.");
    }
    Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
}

async fn create_document(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<CreateDocumentRequest>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    let document = Document {
        id: DocumentId::new(uuid::Uuid::new_v4().to_string()),
        title: request.title,
        status: DocumentStatus::Pending,
        created_at: Utc::now(),
    };
    state.lock().await.documents.push(document.clone());
    (StatusCode::CREATED, Json(document)).into_response()
}

async fn list_documents(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    Json(state.lock().await.documents.clone()).into_response()
}

async fn get_document(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    let mut backend = state.lock().await;
    backend.get_calls += 1;
    match backend
        .documents
        .iter()
        .find(|document| document.id.as_str() == document_id)
    {
        Some(document) => Json(document.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Document not found."),
    }
}

async fn decide_step(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((document_id, step_id, action)): Path<(String, String, String)>,
    Json(request): Json<ApprovalDecisionRequest>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    let (status, step_status) = match action.as_str() {
        "approve" => (DocumentStatus::Approved, ApprovalStepStatus::Approved),
        "reject" => (DocumentStatus::Rejected, ApprovalStepStatus::Rejected),
        _ => return error(StatusCode::NOT_FOUND, "Not Found"),
    };
    let mut backend = state.lock().await;
    let Some(document) = backend
        .documents
        .iter_mut()
        .find(|document| document.id.as_str() == document_id)
    else {
        return error(StatusCode::NOT_FOUND, "Document not found.");
    };
    if document.status.is_terminal() {
        return error(StatusCode::CONFLICT, "Document is already finalized.");
    }
    document.status = status;
    Json(ApprovalResponse {
        document: Some(document.clone()),
        step: Some(ApprovalStepSummary {
            id: StepId::new(step_id),
            document_id: document.id.clone(),
            approver_id: request.approver_id,
            step_order: 1,
            status: step_status,
        }),
    })
    .into_response()
}

#[derive(Deserialize)]
struct DevUserQuery {
    email: String,
    password: String,
}

async fn create_user(State(state): State<Shared>, Query(query): Query<DevUserQuery>) -> Response {
    if query.password.is_empty() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "password: field required");
    }
    let mut backend = state.lock().await;
    if !backend.users.insert(query.email.clone()) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }
    Json(json!({ "id": "user-1", "email": query.email })).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn spawn_backend() -> (String, Shared) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state: Shared = Arc::new(Mutex::new(Backend::default()));
    let app = HttpRouter::new()
        .route("/api/auth/login", post(login))
        .route("/api/documents", post(create_document).get(list_documents))
        .route("/api/documents/:document_id", get(get_document))
        .route(
            "/api/documents/:document_id/steps/:step_id/:action",
            post(decide_step),
        )
        .route("/api/dev/create-user", post(create_user))
        .route("/api/health", get(health))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api"), state)
}

#[derive(Default)]
struct RecordingView {
    screens: StdMutex<Vec<Screen>>,
}

impl RecordingView {
    fn screens(&self) -> Vec<Screen> {
        self.screens.lock().expect("screens").clone()
    }
}

impl View for RecordingView {
    fn render(&self, screen: Screen) {
        self.screens.lock().expect("screens").push(screen);
    }
}

async fn connected_client(
    server_url: &str,
) -> (DocEngineClient, Arc<dyn PersistedStore>, Arc<RecordingView>) {
    let store: Arc<dyn PersistedStore> =
        Arc::new(SqliteStore::new("sqlite::memory:").await.expect("store"));
    let view = Arc::new(RecordingView::default());
    let client = DocEngineClient::connect(server_url, Router::new(), store.clone(), view.clone())
        .expect("client");
    client.install_routes().await;
    (client, store, view)
}

#[tokio::test]
async fn document_lifecycle_against_http_backend() {
    let (server_url, backend) = spawn_backend().await;
    let (client, store, view) = connected_client(&server_url).await;
    let dispatcher = client.router().spawn_dispatch_loop();

    client.login("test@docengine.com", PASSWORD).await.expect("login");
    assert_eq!(
        store.get(keys::AUTH_TOKEN).await.expect("token").as_deref(),
        Some(TOKEN)
    );

    let other = client.create_document("Travel policy").await.expect("first");
    let budget = client.create_document("Q1 Budget").await.expect("second");
    assert_eq!(budget.status, DocumentStatus::Pending);
    let cached = client.sync().cache().read_all().await;
    assert_eq!(cached[0], budget);
    assert_eq!(cached[1], other);

    let outcome = client
        .approve_step(&budget.id, &StepId::from("step-1"), &UserId::from("approver-1"))
        .await
        .expect("approve");
    assert_eq!(
        outcome.step.as_ref().map(|step| step.approver_id.as_str()),
        Some("approver-1")
    );

    let cached = client.sync().cache().read_all().await;
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[0].id, budget.id);
    assert_eq!(cached[0].status, DocumentStatus::Approved);
    assert_eq!(cached[1], other);

    let second = client
        .reject_step(&budget.id, &StepId::from("step-1"), &UserId::from("approver-1"))
        .await
        .expect_err("already approved");
    assert_eq!(second.status(), Some(409));
    assert_eq!(
        client.sync().cache().read_all().await[0].status,
        DocumentStatus::Approved
    );

    let list = client.sync().show_document_list().await;
    assert!(list.fresh);
    assert_eq!(list.documents.len(), 2);

    let before = backend.lock().await.get_calls;
    let missing = client
        .sync()
        .show_document(&DocumentId::from("does-not-exist"))
        .await;
    assert_eq!(missing, DetailOutcome::NotFound);
    assert_eq!(backend.lock().await.get_calls, before + 1);
    let not_found = view
        .screens()
        .into_iter()
        .filter(|screen| *screen == Screen::NotFound)
        .count();
    assert_eq!(not_found, 1);

    dispatcher.abort();
}

#[tokio::test]
async fn detail_fetch_fills_cache_from_backend() {
    let (server_url, backend) = spawn_backend().await;
    let seeded = Document {
        id: DocumentId::from("seeded"),
        title: "Seeded".to_string(),
        status: DocumentStatus::Rejected,
        created_at: Utc::now(),
    };
    backend.lock().await.documents.push(seeded.clone());
    let (client, store, _view) = connected_client(&server_url).await;
    store.set(keys::AUTH_TOKEN, TOKEN).await.expect("token");

    let outcome = client.sync().show_document(&seeded.id).await;

    assert_eq!(outcome, DetailOutcome::Fetched(seeded.clone()));
    assert_eq!(client.sync().cache().read_all().await, vec![seeded]);
}

#[tokio::test]
async fn rejected_request_carries_status_and_detail() {
    let (server_url, _backend) = spawn_backend().await;
    let store: Arc<dyn PersistedStore> = Arc::new(MemoryStore::new());
    let remote = HttpRemoteClient::new(&server_url, Session::new(store)).expect("remote");

    let error = remote
        .create_document("No token")
        .await
        .expect_err("unauthenticated");
    match error {
        ClientError::Transport { status, detail } => {
            assert_eq!(status, 401);
            assert_eq!(detail.as_deref(), Some("Not authenticated"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let error = remote
        .login(&LoginRequest {
            email: "test@docengine.com".into(),
            password: "nope".into(),
        })
        .await
        .expect_err("bad password");
    assert_eq!(error.to_string(), "Invalid credentials.");
}

#[tokio::test]
async fn dev_user_creation_tolerates_existing_user() {
    let (server_url, _backend) = spawn_backend().await;
    let (client, _store, _view) = connected_client(&server_url).await;

    let first = client
        .create_test_user("test+dev@docengine.com", PASSWORD)
        .await
        .expect("first");
    assert!(matches!(
        first,
        DevUserOutcome::Created(ref user) if user.email.as_deref() == Some("test+dev@docengine.com")
    ));

    let second = client
        .create_test_user("test+dev@docengine.com", PASSWORD)
        .await
        .expect("second");
    assert_eq!(second, DevUserOutcome::MaybeExists);
}

#[tokio::test]
async fn plain_text_failure_has_no_detail() {
    let (server_url, _backend) = spawn_backend().await;
    let remote = HttpRemoteClient::new(&server_url, Session::new(Arc::new(MemoryStore::new())))
        .expect("remote");
    remote
        .create_test_user("dup@docengine.com", PASSWORD)
        .await
        .expect("first");

    let error = remote
        .create_test_user("dup@docengine.com", PASSWORD)
        .await
        .expect_err("duplicate");
    assert_eq!(error.status(), Some(500));
    assert_eq!(error.detail(), None);
}

#[tokio::test]
async fn health_endpoint_answers() {
    let (server_url, _backend) = spawn_backend().await;
    let (client, _store, _view) = connected_client(&server_url).await;
    let health = client.health().await.expect("health");
    assert_eq!(health.0["status"], "ok");
}

#[tokio::test]
async fn closed_port_is_reported_as_unreachable() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let remote = HttpRemoteClient::new(
        format!("http://{addr}/api"),
        Session::new(Arc::new(MemoryStore::new())),
    )
    .expect("remote");

    let error = tokio::time::timeout(Duration::from_secs(5), remote.list_documents())
        .await
        .expect("connection refused promptly")
        .expect_err("nothing listening");
    assert!(matches!(error, ClientError::Unreachable(_)));
}

#[test]
fn non_http_server_url_is_rejected() {
    let session = Session::new(Arc::new(MemoryStore::new()));
    let error = HttpRemoteClient::new("ftp://example.com/api", session.clone())
        .err()
        .expect("scheme rejected");
    assert!(matches!(error, ClientError::Config(_)));
    assert!(HttpRemoteClient::new("not a url", session).is_err());
}
