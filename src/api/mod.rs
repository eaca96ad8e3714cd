//! REST client for the time-tracking backend.
//!
//! Every call goes through [ApiClient::send]. It attaches the bearer token from the
//! [AuthStore], and when the server answers 401 it refreshes the session once and replays the
//! request once. Concurrent calls that hit 401 with the same stale token share one refresh.

pub mod activities;
pub mod auth;
pub mod entities;
pub mod tags;
pub mod time_entries;
pub mod transport;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::session::AuthStore;

use transport::{HttpRequest, HttpResponse, Transport};

pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session expired. Run `timeflow login` again")]
    Unauthorized,
    #[error("{message} ({status})")]
    Status { status: u16, message: String },
    #[error("Network request failed: {0}")]
    Network(String),
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Couldn't update local session: {0}")]
    Session(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        ApiError::Network(value.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Shapes of error bodies the backend is known to return.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message", alias = "error")]
    detail: serde_json::Value,
}

fn error_message(response: &HttpResponse) -> String {
    match serde_json::from_str::<ErrorBody>(&response.body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !response.body.trim().is_empty() => response.body.trim().to_string(),
        Err(_) => format!("Request failed with status {}", response.status),
    }
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            status: response.status,
            message: error_message(&response),
        })
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    // 204 and empty bodies decode as JSON null so `()` and `Option<_>` work.
    let body = if response.body.trim().is_empty() {
        "null"
    } else {
        &response.body
    };
    Ok(serde_json::from_str(body)?)
}

pub struct ApiClient {
    transport: Box<dyn Transport>,
    auth: Arc<AuthStore>,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>, auth: Arc<AuthStore>) -> Self {
        Self {
            transport,
            auth,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn auth(&self) -> &Arc<AuthStore> {
        &self.auth
    }

    /// Sends `request` and decodes the JSON body of a 2xx response into `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let response = self.send_raw(request).await?;
        decode(&response)
    }

    /// Like [ApiClient::send], for endpoints whose body is irrelevant.
    pub async fn send_empty(&self, request: HttpRequest) -> Result<(), ApiError> {
        self.send_raw(request).await.map(|_| ())
    }

    /// Performs the request with refresh-and-retry and fails on non-2xx statuses.
    pub async fn send_raw(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.execute_authorized(request).await?;
        check_status(response)
    }

    async fn execute_authorized(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let token = match &request.bearer {
            Some(explicit) => Some(explicit.clone()),
            None => self.auth.access_token(),
        };
        let response = self
            .transport
            .execute(request.clone().with_bearer(token.clone()))
            .await?;
        if response.status != 401 || request.is_auth_endpoint() {
            return Ok(response);
        }

        debug!("Got 401 for {}, refreshing session", request.path);
        let fresh = self.refresh_after(token).await?;

        let retried = self
            .transport
            .execute(request.with_bearer(Some(fresh)))
            .await?;
        if retried.status == 401 {
            warn!("Request still unauthorized after refresh");
            self.drop_session().await;
            return Err(ApiError::Unauthorized);
        }
        Ok(retried)
    }

    /// Makes sure the access token is newer than `stale` and returns it. Only the first caller
    /// holding a given stale token performs the refresh; the rest wait on the lock and reuse its
    /// result.
    async fn refresh_after(&self, stale: Option<String>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.auth.access_token();
        if current != stale {
            return match current {
                Some(token) => Ok(token),
                // The refresh this call waited on failed and cleared the session.
                None => Err(ApiError::Unauthorized),
            };
        }

        match self.refresh_session().await {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!("Refresh failed {e}");
                self.drop_session().await;
                Err(ApiError::Unauthorized)
            }
        }
    }

    /// Exchanges the refresh cookie for a new access token and stores it.
    async fn refresh_session(&self) -> Result<String, ApiError> {
        let Some(refresh_token) = self.auth.refresh_token() else {
            return Err(ApiError::Unauthorized);
        };
        let response = self
            .transport
            .execute(
                HttpRequest::post("/auth/refresh")
                    .with_cookie(Some(format!("{REFRESH_COOKIE}={refresh_token}"))),
            )
            .await?;
        let response = check_status(response)?;
        let tokens: entities::TokenResponse = decode(&response)?;

        self.auth
            .update_tokens(tokens.access_token.clone(), response.cookie(REFRESH_COOKIE))
            .await
            .map_err(|e| ApiError::Session(e.to_string()))?;
        if let Some(user) = tokens.user {
            self.auth
                .set_user(user)
                .await
                .map_err(|e| ApiError::Session(e.to_string()))?;
        }
        info!("Session refreshed");
        Ok(tokens.access_token)
    }

    async fn drop_session(&self) {
        if let Err(e) = self.auth.clear().await {
            warn!("Failed to clear session {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use mockall::predicate::function;
    use uuid::Uuid;

    use super::{
        transport::{HttpRequest, HttpResponse, MockTransport, Transport},
        ApiClient, ApiError,
    };
    use crate::{api::entities::User, session::AuthStore, utils::logging::TEST_LOGGING};

    async fn signed_in_store(access: &str) -> Arc<AuthStore> {
        let store = AuthStore::in_memory();
        store
            .sign_in(
                User {
                    id: Uuid::nil(),
                    email: "ada@example.com".into(),
                    name: None,
                },
                access.into(),
                Some("cookie-1".into()),
            )
            .await
            .unwrap();
        Arc::new(store)
    }

    fn refresh_ok(token: &str) -> HttpResponse {
        let mut response = HttpResponse::new(200, format!(r#"{{"access_token":"{token}"}}"#));
        response.set_cookies = vec!["refresh_token=cookie-2; HttpOnly".into()];
        response
    }

    #[tokio::test]
    async fn attaches_bearer_token() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| {
                r.bearer.as_deref() == Some("a1") && r.path == "/activities"
            }))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "[]")));
        let client = ApiClient::new(Box::new(transport), signed_in_store("a1").await);

        let list: Vec<serde_json::Value> = client.send(HttpRequest::get("/activities")).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn refreshes_once_and_retries_once() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| r.bearer.as_deref() == Some("a1")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::new(401, r#"{"detail":"expired"}"#)));
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| {
                r.path == "/auth/refresh" && r.cookie.as_deref() == Some("refresh_token=cookie-1")
            }))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(refresh_ok("a2")));
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| r.bearer.as_deref() == Some("a2")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::new(200, "[]")));

        let store = signed_in_store("a1").await;
        let client = ApiClient::new(Box::new(transport), store.clone());
        client
            .send_empty(HttpRequest::get("/activities"))
            .await
            .unwrap();

        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("cookie-2"));
    }

    #[tokio::test]
    async fn second_unauthorized_clears_session() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| r.path == "/auth/refresh"))
            .times(1)
            .returning(|_| Ok(refresh_ok("a2")));
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| r.path == "/activities"))
            .times(2)
            .returning(|_| Ok(HttpResponse::new(401, "")));

        let store = signed_in_store("a1").await;
        let client = ApiClient::new(Box::new(transport), store.clone());
        let result = client.send_empty(HttpRequest::get("/activities")).await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert!(!store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn failed_refresh_clears_session_without_retry() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| r.path == "/activities"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(401, "")));
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| r.path == "/auth/refresh"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(401, r#"{"detail":"refresh revoked"}"#)));

        let store = signed_in_store("a1").await;
        let client = ApiClient::new(Box::new(transport), store.clone());
        let result = client.send_empty(HttpRequest::get("/activities")).await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(store.refresh_token(), None);
    }

    #[tokio::test]
    async fn login_unauthorized_is_not_refreshed() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(401, r#"{"detail":"Invalid credentials"}"#)));

        let client = ApiClient::new(Box::new(transport), Arc::new(AuthStore::in_memory()));
        let result = client.send_empty(HttpRequest::post("/auth/login")).await;

        match result {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_carries_server_message() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(422, r#"{"message":"name taken"}"#)));
        let client = ApiClient::new(Box::new(transport), signed_in_store("a1").await);

        let error = client
            .send_empty(HttpRequest::post("/activities"))
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(422));
        assert_eq!(error.to_string(), "name taken (422)");
    }

    #[tokio::test]
    async fn plain_text_error_body_is_kept() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(404, "no such activity")));
        let client = ApiClient::new(Box::new(transport), signed_in_store("a1").await);

        let error = client
            .send_empty(HttpRequest::delete("/activities/x"))
            .await
            .unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "no such activity (404)");
    }

    /// Rejects stale tokens and yields on every call so concurrent requests interleave.
    struct RotatingBackend {
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl Transport for RotatingBackend {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            tokio::task::yield_now().await;
            if request.path == "/auth/refresh" {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                return Ok(refresh_ok("fresh"));
            }
            match request.bearer.as_deref() {
                Some("fresh") => Ok(HttpResponse::new(200, "null")),
                _ => Ok(HttpResponse::new(401, "")),
            }
        }
    }

    #[tokio::test]
    async fn concurrent_unauthorized_requests_share_one_refresh() {
        *TEST_LOGGING;
        let backend = Arc::new(RotatingBackend {
            refreshes: AtomicUsize::new(0),
        });

        struct Shared(Arc<RotatingBackend>);
        #[async_trait]
        impl Transport for Shared {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
                self.0.execute(request).await
            }
        }

        let client = ApiClient::new(
            Box::new(Shared(backend.clone())),
            signed_in_store("stale").await,
        );

        let (a, b, c) = tokio::join!(
            client.send_empty(HttpRequest::get("/activities")),
            client.send_empty(HttpRequest::get("/tags")),
            client.send_empty(HttpRequest::get("/time-entries/active")),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        assert_eq!(backend.refreshes.load(Ordering::SeqCst), 1);
    }
}
