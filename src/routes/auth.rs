//! # routes::auth
//!
//! | Method | Path                 | Description                          |
//! |--------|----------------------|--------------------------------------|
//! | POST   | `/api/auth/signin`   | email + password → session           |
//! | POST   | `/api/auth/signup`   | create account (may need confirming) |
//! | POST   | `/api/auth/signout`  | end the current session              |
//! | GET    | `/api/auth/session`  | who am I                             |
//! | POST   | `/api/auth/register` | registration API proxy               |

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;

use crate::{
    auth::{Credentials, Session},
    error::AppError,
    registration::RegistrationRequest,
    state::SharedState,
};

/// POST /api/auth/signin
pub async fn sign_in(
    State(state): State<SharedState>,
    Json(creds):  Json<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.auth.sign_in(&creds).await?;
    Ok(Json(json!({ "ok": true, "session": session })))
}

/// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<SharedState>,
    Json(creds):  Json<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.auth.sign_up(&creds).await?;
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "result": outcome }))))
}

/// POST /api/auth/signout — also closes the user's open editors.
pub async fn sign_out(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.sign_out(&session).await?;

    let mut editors = state.editors.write().await;
    let before = editors.len();
    editors.retain(|_, e| e.owner != session.user.id);
    let closed = before - editors.len();

    Ok(Json(json!({ "ok": true, "closed_editors": closed })))
}

/// GET /api/auth/session
pub async fn current_session(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(json!({
        "ok":   true,
        "user": session.user,
        "mock": session.mock,
    }))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<SharedState>,
    Json(form):   Json<RegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.registration.register(&form).await?;
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "result": result }))))
}
