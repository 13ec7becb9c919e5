//! # auth — Session boundary
//!
//! Sign-in, sign-up, sign-out and session lookup are delegated to Supabase
//! GoTrue.  Two situations switch to a local mock user instead:
//!
//! - Supabase is not configured at all (local development without a project);
//! - a GoTrue call fails at the network level in a `development` build.
//!
//! The mock user is kept under the fixed key [`MOCK_USER_KEY`], which doubles
//! as its access token.  Production builds never fall back; they surface the
//! upstream failure.
//!
//! ## Middleware
//! [`require_session`] resolves `Authorization: Bearer <token>` (or
//! `?access_token=` for WebSocket upgrades, which can't set headers) into a
//! [`Session`] and stores it in the request extensions.  Public paths are
//! listed in [`PUBLIC_PATHS`].
//!
//! ```bash
//! curl -H "Authorization: Bearer $TOKEN" http://localhost:3000/api/strategies
//! ```

use axum::{
    body::Body,
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Environment, SupabaseConfig};
use crate::error::AppError;
use crate::state::SharedState;

/// Storage key (and access token) of the development mock user.
pub const MOCK_USER_KEY: &str = "mockUser";

const MOCK_USER_ID: Uuid = Uuid::from_u128(0x6d6f_636b_5573_4572_8000_0000_0000_0001);
const MOCK_USER_EMAIL: &str = "demo@stratflow.local";

/// Paths reachable without a session.
pub const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/api/auth/signin",
    "/api/auth/signup",
    "/api/auth/register",
];

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id:    Uuid,
    #[serde(default)]
    pub email: String,
}

/// A signed-in user plus the token that proves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub access_token: String,
    pub user:         AuthUser,
    /// `true` when this is the local mock user.
    pub mock:         bool,
}

impl Session {
    pub fn for_user(id: Uuid, email: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user:         AuthUser { id, email: email.into() },
            mock:         false,
        }
    }

    pub fn mock() -> Self {
        Self::mock_for(MOCK_USER_EMAIL)
    }

    fn mock_for(email: &str) -> Self {
        Self {
            access_token: MOCK_USER_KEY.to_string(),
            user:         AuthUser { id: MOCK_USER_ID, email: email.to_string() },
            mock:         true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email:    String,
    pub password: String,
}

/// GoTrue `/token` and `/signup` response.  `access_token` is absent when
/// sign-up still needs e-mail confirmation.
#[derive(Debug, Deserialize)]
struct GoTrueSession {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user:         Option<AuthUser>,
    // `/signup` with confirmation pending returns the bare user
    #[serde(default)]
    id:           Option<Uuid>,
    #[serde(default)]
    email:        Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    SignedIn { session: Session },
    ConfirmationSent { user: AuthUser },
}

// ─── AuthClient ───────────────────────────────────────────────────────────────

pub struct AuthClient {
    http:        Client,
    supabase:    Option<SupabaseConfig>,
    environment: Environment,
    /// The mock user currently signed in, if any.
    mock_user:   RwLock<Option<Session>>,
}

impl AuthClient {
    pub fn new(http: Client, supabase: Option<SupabaseConfig>, environment: Environment) -> Self {
        if supabase.is_none() {
            warn!("⚠️ Supabase not configured — auth runs against the local mock user");
        }
        Self { http, supabase, environment, mock_user: RwLock::new(None) }
    }

    pub fn is_mock(&self) -> bool {
        self.supabase.is_none()
    }

    pub async fn sign_in(&self, creds: &Credentials) -> Result<Session, AppError> {
        let Some(sb) = &self.supabase else {
            return Ok(self.sign_in_mock(&creds.email).await);
        };

        let url = format!("{}/auth/v1/token?grant_type=password", sb.url);
        let body = json!({ "email": creds.email, "password": creds.password });
        let resp = match self.http.post(url).header("apikey", &sb.anon_key).json(&body).send().await {
            Ok(resp) => resp,
            Err(err) => return self.network_fallback(&creds.email, err).await,
        };

        let parsed: GoTrueSession = read_json(resp, "sign-in").await?;
        match (parsed.access_token, parsed.user) {
            (Some(token), Some(user)) => {
                info!(user_id = %user.id, "🔑 signed in");
                Ok(Session { access_token: token, user, mock: false })
            }
            _ => Err(AppError::Upstream("sign-in response had no session".into())),
        }
    }

    pub async fn sign_up(&self, creds: &Credentials) -> Result<SignUpOutcome, AppError> {
        let Some(sb) = &self.supabase else {
            let session = self.sign_in_mock(&creds.email).await;
            return Ok(SignUpOutcome::SignedIn { session });
        };

        let url = format!("{}/auth/v1/signup", sb.url);
        let body = json!({ "email": creds.email, "password": creds.password });
        let resp = match self.http.post(url).header("apikey", &sb.anon_key).json(&body).send().await {
            Ok(resp) => resp,
            Err(err) => {
                let session = self.network_fallback(&creds.email, err).await?;
                return Ok(SignUpOutcome::SignedIn { session });
            }
        };

        let parsed: GoTrueSession = read_json(resp, "sign-up").await?;
        let user = match (parsed.user, parsed.id) {
            (Some(user), _) => user,
            (None, Some(id)) => AuthUser { id, email: parsed.email.unwrap_or_default() },
            (None, None) => return Err(AppError::Upstream("sign-up response had no user".into())),
        };
        info!(user_id = %user.id, "🆕 signed up");

        Ok(match parsed.access_token {
            Some(access_token) => SignUpOutcome::SignedIn {
                session: Session { access_token, user, mock: false },
            },
            None => SignUpOutcome::ConfirmationSent { user },
        })
    }

    pub async fn sign_out(&self, session: &Session) -> Result<(), AppError> {
        if session.mock {
            *self.mock_user.write().await = None;
            info!("👋 mock user signed out");
            return Ok(());
        }
        let Some(sb) = &self.supabase else {
            return Ok(());
        };

        let resp = self
            .http
            .post(format!("{}/auth/v1/logout", sb.url))
            .header("apikey", &sb.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("sign-out failed: {e}")))?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "sign-out rejected upstream");
        }
        info!(user_id = %session.user.id, "👋 signed out");
        Ok(())
    }

    /// Resolve a bearer token.  `Ok(None)` for unknown or expired tokens.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, AppError> {
        if token == MOCK_USER_KEY {
            return Ok(self.mock_user.read().await.clone());
        }
        let Some(sb) = &self.supabase else {
            return Ok(None);
        };

        let resp = self
            .http
            .get(format!("{}/auth/v1/user", sb.url))
            .header("apikey", &sb.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("session lookup failed: {e}")))?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED || resp.status() == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        let user: AuthUser = read_json(resp, "session lookup").await?;
        Ok(Some(Session { access_token: token.to_string(), user, mock: false }))
    }

    async fn sign_in_mock(&self, email: &str) -> Session {
        let email = if email.trim().is_empty() { MOCK_USER_EMAIL } else { email.trim() };
        let session = Session::mock_for(email);
        *self.mock_user.write().await = Some(session.clone());
        info!(email, "🧪 signed in as mock user");
        session
    }

    async fn network_fallback(&self, email: &str, err: reqwest::Error) -> Result<Session, AppError> {
        if self.environment.is_development() {
            warn!(error = %err, "⚠️ GoTrue unreachable — falling back to mock user");
            Ok(self.sign_in_mock(email).await)
        } else {
            Err(AppError::Upstream(format!("auth service unreachable: {err}")))
        }
    }
}

/// Decode a 2xx body or turn GoTrue's error body into an [`AppError`].
async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T, AppError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("{what}: malformed response: {e}")));
    }

    let body: Value = resp.json().await.unwrap_or(Value::Null);
    let message = upstream_message(&body).unwrap_or_else(|| format!("{what} failed ({status})"));
    if status.is_client_error() {
        Err(AppError::Unauthorized(message))
    } else {
        Err(AppError::Upstream(message))
    }
}

/// GoTrue uses `error_description`, `msg` or `message` depending on endpoint.
fn upstream_message(body: &Value) -> Option<String> {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

// ─── Middleware ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string());

    header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(q)| q.access_token)
    })
}

/// Axum middleware: resolve the caller's [`Session`] once per request.
pub async fn require_session(
    State(state): State<SharedState>,
    mut request:  Request<Body>,
    next:         Next,
) -> Response {
    let path = request.uri().path().to_string();
    if PUBLIC_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(&request).filter(|t| !t.is_empty()) else {
        warn!(path = %path, "❌ Unauthorized request — missing bearer token");
        return AppError::Unauthorized("missing bearer token".into()).into_response();
    };

    match state.auth.resolve(&token).await {
        Ok(Some(session)) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Ok(None) => {
            warn!(path = %path, "❌ Unauthorized request — unknown or expired session");
            AppError::Unauthorized("session expired or invalid".into()).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_client() -> AuthClient {
        AuthClient::new(Client::new(), None, Environment::Development)
    }

    fn creds(email: &str) -> Credentials {
        Credentials { email: email.into(), password: "hunter22".into() }
    }

    #[tokio::test]
    async fn test_unconfigured_sign_in_uses_mock_user() {
        let auth = mock_client();
        assert!(auth.resolve(MOCK_USER_KEY).await.unwrap().is_none());

        let session = auth.sign_in(&creds("trader@example.com")).await.unwrap();
        assert!(session.mock);
        assert_eq!(session.access_token, MOCK_USER_KEY);
        assert_eq!(session.user.email, "trader@example.com");

        let resolved = auth.resolve(MOCK_USER_KEY).await.unwrap();
        assert_eq!(resolved, Some(session.clone()));

        auth.sign_out(&session).await.unwrap();
        assert!(auth.resolve(MOCK_USER_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_without_supabase() {
        let auth = mock_client();
        assert!(auth.resolve("some-jwt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_network_failure_falls_back_only_in_development() {
        // Port 9 (discard) on localhost refuses connections.
        let unreachable = SupabaseConfig { url: "http://127.0.0.1:9".into(), anon_key: "anon".into() };

        let dev = AuthClient::new(Client::new(), Some(unreachable.clone()), Environment::Development);
        let session = dev.sign_in(&creds("a@b.c")).await.unwrap();
        assert!(session.mock);

        let prod = AuthClient::new(Client::new(), Some(unreachable), Environment::Production);
        let err = prod.sign_in(&creds("a@b.c")).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn test_upstream_message_variants() {
        assert_eq!(
            upstream_message(&json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
            Some("Invalid login credentials".into())
        );
        assert_eq!(upstream_message(&json!({ "msg": "User already registered" })), Some("User already registered".into()));
        assert_eq!(upstream_message(&Value::Null), None);
    }

    #[test]
    fn test_bearer_from_header_or_query() {
        let req = axum::http::Request::builder()
            .uri("/api/strategies")
            .header("Authorization", "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc"));

        let req = axum::http::Request::builder()
            .uri("/ws/editor?strategy=1&access_token=mockUser")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req).as_deref(), Some(MOCK_USER_KEY));
    }

    #[test]
    fn test_query_token_is_percent_decoded() {
        let req = axum::http::Request::builder()
            .uri("/ws/editor?access_token=a%2Bb%3Dc&strategy=x")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req).as_deref(), Some("a+b=c"));

        let req = axum::http::Request::builder()
            .uri("/ws/editor?strategy=x")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), None);
    }
}
