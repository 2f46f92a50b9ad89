//! Shared fixtures: in-process mock connectors and a mock provider HTTP API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use liftoff_deploy::{
    DeployError, Deployment, GitDeployOptions, Hosting, LocalRepo, RepoRef, Snapshot,
    SourceControl,
};
use serde_json::{Value, json};
use tempdir::TempDir;
use tokio::sync::Notify;

/// Ordered log of connector calls, shared by the mocks of one test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Lets a test hold a mocked call open until it decides to release it.
#[derive(Debug, Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Debug, Clone)]
pub struct MockSourceControl {
    pub log: CallLog,
    pub ready: bool,
    pub create_error: Option<DeployError>,
    pub push_error: Option<DeployError>,
    pub clone_error: Option<DeployError>,
    pub owner: String,
}

impl MockSourceControl {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ready: true,
            create_error: None,
            push_error: None,
            clone_error: None,
            owner: "alice".to_string(),
        }
    }
}

impl SourceControl for MockSourceControl {
    fn clone_ready(&self) -> bool {
        self.ready
    }

    async fn create_repo(&self, name: &str) -> Result<RepoRef, DeployError> {
        self.log.record(format!("create_repo:{name}"));
        match &self.create_error {
            Some(err) => Err(err.clone()),
            None => Ok(RepoRef::new(&self.owner, name)),
        }
    }

    async fn push(&self, snapshot: &Snapshot, target: &RepoRef) -> Result<(), DeployError> {
        self.log
            .record(format!("push:{}:{}", target.full_name(), snapshot.len()));
        match &self.push_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn clone_repo(&self, reference: &str) -> Result<LocalRepo, DeployError> {
        self.log.record(format!("clone:{reference}"));
        match &self.clone_error {
            Some(err) => Err(err.clone()),
            None => Ok(LocalRepo::new(TempDir::new("liftoff-mock-clone").unwrap())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockHosting {
    pub log: CallLog,
    pub response: Result<Deployment, DeployError>,
    pub gate: Option<Arc<Gate>>,
}

impl MockHosting {
    pub fn returning(log: CallLog, url: &str) -> Self {
        Self {
            log,
            response: Ok(Deployment::new(url)),
            gate: None,
        }
    }

    pub fn failing(log: CallLog, err: DeployError) -> Self {
        Self {
            log,
            response: Err(err),
            gate: None,
        }
    }
}

impl Hosting for MockHosting {
    async fn deploy_files(
        &self,
        snapshot: &Snapshot,
        name: &str,
    ) -> Result<Deployment, DeployError> {
        self.log
            .record(format!("deploy_files:{name}:{}", snapshot.len()));
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.response.clone()
    }

    async fn deploy_from_source_control(
        &self,
        name: &str,
        repo: &RepoRef,
        options: &GitDeployOptions,
    ) -> Result<Deployment, DeployError> {
        self.log.record(format!(
            "deploy_git:{name}:{}@{}",
            repo.full_name(),
            options.git_ref
        ));
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.response.clone()
    }
}

/// A small project snapshot.
pub fn project() -> Snapshot {
    [
        ("index.html", "<h1>demo</h1>"),
        ("src/main.js", "console.log('demo')"),
    ]
    .into_iter()
    .collect()
}

/// Requests received by the mock provider API, in order.
#[derive(Debug, Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<RecordedRequest>>>);

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: &'static str,
    pub token: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Value,
}

impl Recorded {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    fn push(&self, request: RecordedRequest) {
        self.0.lock().unwrap().push(request);
    }
}

/// Tokens understood by the mock provider API.
pub const ALICE_TOKEN: &str = "ghp_alice";
pub const BOB_TOKEN: &str = "ghp_bob";
pub const VERCEL_TOKEN: &str = "vercel_ok";
pub const VERCEL_NAMELESS_TOKEN: &str = "vercel_nameless";
pub const VERCEL_NO_URL_TOKEN: &str = "vercel_no_url";

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Bad credentials" })),
    )
        .into_response()
}

async fn github_user(State(recorded): State<Recorded>, headers: HeaderMap) -> Response {
    let token = bearer(&headers);
    recorded.push(RecordedRequest {
        path: "/user",
        token: token.clone(),
        query: HashMap::new(),
        body: Value::Null,
    });

    match token.as_deref() {
        Some(ALICE_TOKEN) => Json(json!({ "login": "alice", "id": 1 })).into_response(),
        Some(BOB_TOKEN) => Json(json!({ "login": "bob", "id": 2 })).into_response(),
        _ => unauthorized(),
    }
}

async fn github_create_repo(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let token = bearer(&headers);
    recorded.push(RecordedRequest {
        path: "/user/repos",
        token: token.clone(),
        query: HashMap::new(),
        body: body.clone(),
    });

    if token.as_deref() != Some(ALICE_TOKEN) {
        return unauthorized();
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    if name == "taken" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Repository creation failed." })),
        )
            .into_response();
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "name": name,
            "full_name": format!("alice/{name}"),
            "owner": { "login": "alice" },
        })),
    )
        .into_response()
}

async fn vercel_user(State(recorded): State<Recorded>, headers: HeaderMap) -> Response {
    let token = bearer(&headers);
    recorded.push(RecordedRequest {
        path: "/v2/user",
        token: token.clone(),
        query: HashMap::new(),
        body: Value::Null,
    });

    match token.as_deref() {
        Some(VERCEL_TOKEN) | Some(VERCEL_NO_URL_TOKEN) => {
            Json(json!({ "user": { "username": "vercel-user" } })).into_response()
        }
        Some(VERCEL_NAMELESS_TOKEN) => Json(json!({ "user": { "username": "" } })).into_response(),
        _ => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": "forbidden" } })),
        )
            .into_response(),
    }
}

async fn vercel_deploy(
    State(recorded): State<Recorded>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let token = bearer(&headers);
    recorded.push(RecordedRequest {
        path: "/v13/deployments",
        token: token.clone(),
        query,
        body: body.clone(),
    });

    match token.as_deref() {
        Some(VERCEL_TOKEN) => {
            let name = body["name"].as_str().unwrap_or_default();
            Json(json!({ "id": "dpl_123", "url": format!("{name}-abc.vercel.app") }))
                .into_response()
        }
        Some(VERCEL_NO_URL_TOKEN) => Json(json!({ "id": "dpl_456" })).into_response(),
        _ => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": "forbidden" } })),
        )
            .into_response(),
    }
}

/// A running mock of both provider APIs.
pub struct MockApi {
    pub url: String,
    pub recorded: Recorded,
}

/// Serve GitHub- and Vercel-shaped endpoints on a random local port.
pub async fn spawn_mock_api() -> MockApi {
    let recorded = Recorded::default();
    let router = Router::new()
        .route("/user", get(github_user))
        .route("/user/repos", post(github_create_repo))
        .route("/v2/user", get(vercel_user))
        .route("/v13/deployments", post(vercel_deploy))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockApi {
        url: format!("http://{addr}"),
        recorded,
    }
}

/// A local URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
