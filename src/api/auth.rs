use tracing::info;

use super::{
    entities::{Credentials, Registration, TokenResponse, User},
    transport::HttpRequest,
    ApiClient, ApiError, REFRESH_COOKIE,
};

impl ApiClient {
    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        self.send(HttpRequest::post("/auth/register").json(registration)?)
            .await
    }

    /// Logs in and stores the session. The refresh token arrives as a cookie.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let response = self
            .send_raw(HttpRequest::post("/auth/login").json(credentials)?)
            .await?;
        let tokens: TokenResponse = serde_json::from_str(&response.body)?;
        let refresh_token = response.cookie(REFRESH_COOKIE);

        // Some deployments only return the token, the profile then comes from /auth/me.
        let user = match tokens.user {
            Some(user) => user,
            None => {
                self.send(
                    HttpRequest::get("/auth/me").with_bearer(Some(tokens.access_token.clone())),
                )
                .await?
            }
        };
        self.auth()
            .sign_in(user.clone(), tokens.access_token, refresh_token)
            .await
            .map_err(|e| ApiError::Session(e.to_string()))?;
        Ok(user)
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let user: User = self.send(HttpRequest::get("/auth/me")).await?;
        self.auth()
            .set_user(user.clone())
            .await
            .map_err(|e| ApiError::Session(e.to_string()))?;
        Ok(user)
    }

    /// Tells the server to revoke the refresh cookie and forgets the local session. The local
    /// session is dropped even if the server can't be reached.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let refresh_token = self.auth().refresh_token();
        let result = self
            .send_empty(
                HttpRequest::post("/auth/logout")
                    .with_cookie(refresh_token.map(|t| format!("{REFRESH_COOKIE}={t}"))),
            )
            .await;
        self.auth()
            .clear()
            .await
            .map_err(|e| ApiError::Session(e.to_string()))?;
        info!("Logged out");
        match result {
            Err(ApiError::Unauthorized) => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::predicate::function;

    use crate::{
        api::{
            entities::Credentials,
            transport::{HttpRequest, HttpResponse, MockTransport},
            ApiClient,
        },
        session::AuthStore,
    };

    const USER: &str =
        r#"{"id":"00000000-0000-0000-0000-000000000001","email":"ada@example.com"}"#;

    #[tokio::test]
    async fn login_stores_tokens_and_cookie() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| r.path == "/auth/login"))
            .returning(|_| {
                let mut response = HttpResponse::new(
                    200,
                    format!(r#"{{"access_token":"a1","user":{USER}}}"#),
                );
                response.set_cookies = vec!["refresh_token=r1; HttpOnly".into()];
                Ok(response)
            });
        let store = Arc::new(AuthStore::in_memory());
        let client = ApiClient::new(Box::new(transport), store.clone());

        let user = client
            .login(&Credentials {
                email: "ada@example.com".into(),
                password: "correct horse".into(),
            })
            .await
            .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn login_without_user_fetches_profile() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| r.path == "/auth/login"))
            .returning(|_| Ok(HttpResponse::new(200, r#"{"access_token":"a1"}"#)));
        transport
            .expect_execute()
            .with(function(|r: &HttpRequest| {
                r.path == "/auth/me" && r.bearer.as_deref() == Some("a1")
            }))
            .returning(|_| Ok(HttpResponse::new(200, USER)));
        let store = Arc::new(AuthStore::in_memory());
        let client = ApiClient::new(Box::new(transport), store.clone());

        client
            .login(&Credentials {
                email: "ada@example.com".into(),
                password: "correct horse".into(),
            })
            .await
            .unwrap();
        assert!(store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn logout_clears_session_even_when_server_fails() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(500, "boom")));
        let store = Arc::new(AuthStore::in_memory());
        let client = ApiClient::new(Box::new(transport), store.clone());

        assert!(client.logout().await.is_err());
        assert!(!store.snapshot().is_authenticated());
    }
}
