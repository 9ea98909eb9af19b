//! Fakes and fixtures for unit tests across the crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tempfile::TempDir;
use tokio::sync::Notify;

use crate::api::{ApiError, ApiRequest, RawResponse, RefreshedCredentials, TokenRefresher, Transport};
use crate::config::{ApiConfig, Config, SessionConfig};
use crate::storage::models::Account;
use crate::storage::Database;

/// Session database in a scratch directory. Keep the `TempDir` alive for
/// as long as the database is used.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// Config pointing at a local API that is never contacted.
pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            no_proxy: true,
            request_timeout_seconds: 5,
            refresh_timeout_seconds: 5,
        },
        session: SessionConfig {
            data_dir: "/tmp/test".to_string(),
            signin_path: "/signin".to_string(),
        },
    }
}

/// Create an `Account` with the given id.
pub fn make_account(id: i64) -> Account {
    Account {
        birthday: "1990-04-02".to_string(),
        email: format!("reader{id}@example.com"),
        full_name: format!("Reader {id}"),
        id,
        is_google_user: None,
        phone: "0123456789".to_string(),
    }
}

pub fn json_response(status: StatusCode, body: serde_json::Value) -> RawResponse {
    RawResponse {
        body: serde_json::to_vec(&body).unwrap(),
        status,
    }
}

// ============================================================================
// Fake transport
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
    pub method: reqwest::Method,
    pub path: String,
    pub query: Vec<(String, String)>,
}

/// In-memory API.
///
/// Paths under `/error/<code>` answer with that status. Every other path
/// answers 200 when the bearer matches the accepted token and 401
/// otherwise. Canned bodies can be registered per path.
pub struct FakeBackend {
    accepted_token: Option<String>,
    canned: Mutex<Vec<(String, RawResponse)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeBackend {
    pub fn new(accepted_token: &str) -> Arc<Self> {
        Arc::new(Self {
            accepted_token: Some(accepted_token.to_string()),
            canned: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Rejects every authenticated call
    pub fn rejecting_all() -> Arc<Self> {
        Arc::new(Self {
            accepted_token: None,
            canned: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer `path` with `response` regardless of credentials
    pub fn respond(&self, path: &str, response: RawResponse) {
        self.canned
            .lock()
            .unwrap()
            .push((path.to_string(), response));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, ApiError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            bearer: bearer.map(str::to_string),
            body: request.body.clone(),
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
        });

        if let Some((_, response)) = self
            .canned
            .lock()
            .unwrap()
            .iter()
            .find(|(path, _)| *path == request.path)
        {
            return Ok(response.clone());
        }

        if let Some(code) = request.path.strip_prefix("/error/") {
            let status = StatusCode::from_u16(code.parse().unwrap()).unwrap();
            return Ok(json_response(
                status,
                serde_json::json!({"message": "boom", "status": status.as_u16()}),
            ));
        }

        let authorized = match (&self.accepted_token, bearer) {
            (Some(accepted), Some(sent)) => accepted == sent,
            _ => false,
        };
        if authorized {
            Ok(json_response(
                StatusCode::OK,
                serde_json::json!({"message": "ok", "status": 200, "data": {"path": request.path}}),
            ))
        } else {
            Ok(json_response(
                StatusCode::UNAUTHORIZED,
                serde_json::json!({"message": "Token expired", "status": 401}),
            ))
        }
    }
}

// ============================================================================
// Fake refresher
// ============================================================================

enum RefreshOutcome {
    Hang,
    Reject,
    Renew(String),
}

/// Scripted `TokenRefresher`. When gated, each refresh waits for
/// [`FakeRefresher::release`] before answering.
pub struct FakeRefresher {
    calls: AtomicUsize,
    gate: Notify,
    gated: AtomicBool,
    outcome: RefreshOutcome,
}

impl FakeRefresher {
    fn with_outcome(outcome: RefreshOutcome) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
            gated: AtomicBool::new(false),
            outcome,
        })
    }

    pub fn renewing(token: &str) -> Arc<Self> {
        Self::with_outcome(RefreshOutcome::Renew(token.to_string()))
    }

    /// Fails with a 401 from the refresh endpoint
    pub fn rejecting() -> Arc<Self> {
        Self::with_outcome(RefreshOutcome::Reject)
    }

    /// Never answers
    pub fn hanging() -> Arc<Self> {
        Self::with_outcome(RefreshOutcome::Hang)
    }

    pub fn gated(self: Arc<Self>) -> Arc<Self> {
        self.gated.store(true, Ordering::SeqCst);
        self
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for FakeRefresher {
    async fn refresh(&self) -> Result<RefreshedCredentials, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }

        match &self.outcome {
            RefreshOutcome::Renew(token) => Ok(RefreshedCredentials {
                access: token.clone(),
                account: make_account(1),
            }),
            RefreshOutcome::Reject => Err(ApiError::from_response(
                StatusCode::UNAUTHORIZED,
                br#"{"message":"Refresh token expired","status":401}"#,
            )),
            RefreshOutcome::Hang => std::future::pending().await,
        }
    }
}
