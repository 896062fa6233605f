use reqwest::Method;
use serde_json::json;
use std::sync::Arc;

use super::policy::{Operation, recover};
use crate::cache::QueryCache;
use crate::error::{ApiError, ApiResult};
use crate::fallback::{mock_user, provisional_id};
use crate::models::{AuthResponse, User};
use crate::session::SessionStore;
use crate::transport::Transport;

pub struct AuthApi {
    transport: Arc<Transport>,
    session: Arc<SessionStore>,
    cache: Arc<QueryCache>,
}

// Offline sessions get a token the backend would never issue
fn offline_auth(user: User) -> AuthResponse {
    AuthResponse {
        token: provisional_id("mock-token"),
        user,
    }
}

fn offline_user(name: &str, email: &str) -> User {
    let name = if name.trim().is_empty() {
        email.split('@').next().unwrap_or(email).to_string()
    } else {
        name.to_string()
    };
    User {
        id: provisional_id("user"),
        name,
        email: email.to_string(),
        avatar: None,
    }
}

impl AuthApi {
    pub fn new(transport: Arc<Transport>, session: Arc<SessionStore>, cache: Arc<QueryCache>) -> Self {
        Self {
            transport,
            session,
            cache,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let body = json!({ "email": email, "password": password });
        let result = self
            .transport
            .send_json(Method::POST, "/auth/login", Some(&body))
            .await;
        let auth = recover(Operation::Login, result, |_| {
            Ok(offline_auth(offline_user("", email)))
        })?;
        self.establish(auth)
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> ApiResult<User> {
        let body = json!({ "name": name, "email": email, "password": password });
        let result = self
            .transport
            .send_json(Method::POST, "/auth/signup", Some(&body))
            .await;
        let auth = recover(Operation::Signup, result, |_| {
            Ok(offline_auth(offline_user(name, email)))
        })?;
        self.establish(auth)
    }

    /// Exchange a Google identity token for a session. With no token the
    /// backend decides whether it can complete the flow itself.
    pub async fn google(&self, id_token: Option<&str>) -> ApiResult<User> {
        let body = json!({ "token": id_token });
        let result = self
            .transport
            .send_json(Method::POST, "/auth/google", Some(&body))
            .await;
        let auth = recover(Operation::GoogleAuth, result, |_| Ok(offline_auth(mock_user())))?;
        self.establish(auth)
    }

    /// Sign out locally. Nothing is sent to the backend.
    pub fn logout(&self) -> anyhow::Result<()> {
        self.cache.clear();
        self.session.logout()
    }

    fn establish(&self, auth: AuthResponse) -> ApiResult<User> {
        // A previous user's query results must not leak into this session
        self.cache.clear();
        self.session
            .set_auth(auth.user.clone(), auth.token)
            .map_err(|e| ApiError::local("failed to persist session", e))?;
        Ok(auth.user)
    }
}

#[cfg(test)]
mod tests {
    use crate::context::tests::test_context;
    use crate::store::{AUTH_TOKEN_KEY, AUTH_USER_KEY};
    use crate::transport::tests::unreachable_base_url;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_login_stores_backend_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({ "email": "ada@example.com", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "jwt-1",
                "user": { "id": 7, "name": "Ada", "email": "ada@example.com" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/auth");
        let user = t.ctx.auth.login("ada@example.com", "pw").await.unwrap();

        assert_eq!(user.id, "7");
        assert_eq!(t.ctx.session.token().as_deref(), Some("jwt-1"));
        assert_eq!(t.ctx.store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("jwt-1"));
        assert!(t.ctx.store.get(AUTH_USER_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejected_credentials_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "detail": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let t = test_context(&format!("{}/api", server.uri()), "/auth");
        let err = t.ctx.auth.login("ada@example.com", "wrong").await.unwrap_err();

        assert_eq!(err.status, 400);
        assert_eq!(err.message, "Invalid credentials");
        assert!(!t.ctx.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_misconfigured_base_url_does_not_sign_in_offline() {
        let t = test_context("not a url", "/auth");

        let err = t.ctx.auth.login("ada@example.com", "pw").await.unwrap_err();
        assert!(err.is_local());
        assert!(!t.ctx.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_offline_signup_creates_mock_session() {
        let t = test_context(&unreachable_base_url(), "/auth");
        let user = t.ctx.auth.signup("Grace", "grace@example.com", "pw").await.unwrap();

        assert_eq!(user.name, "Grace");
        assert_eq!(user.email, "grace@example.com");
        let token = t.ctx.session.token().unwrap();
        assert!(token.starts_with("mock-token-"));
    }

    #[tokio::test]
    async fn test_offline_google_uses_mock_user() {
        let t = test_context(&unreachable_base_url(), "/auth");
        let user = t.ctx.auth.google(None).await.unwrap();
        assert_eq!(user, crate::fallback::mock_user());
        assert!(t.ctx.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_queries() {
        let t = test_context(&unreachable_base_url(), "/");
        t.ctx.auth.login("ada@example.com", "pw").await.unwrap();
        t.ctx.cache.set(crate::cache::APPLICATIONS_KEY, &Vec::<u32>::new());

        t.ctx.auth.logout().unwrap();

        assert!(!t.ctx.session.is_authenticated());
        assert!(t.ctx.cache.is_empty());
        assert_eq!(t.ctx.store.get(AUTH_TOKEN_KEY).unwrap(), None);
    }
}
