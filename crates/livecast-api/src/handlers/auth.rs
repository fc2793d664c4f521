//! Sign-in endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::identity::{IdentityProvider, SignedIn};
use crate::session::{validate_new_password, SessionError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupAccountRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    #[serde(flatten)]
    pub session: SignedIn,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: AuthUser,
    pub is_admin: bool,
}

fn identity(state: &AppState) -> ApiResult<&Arc<dyn IdentityProvider>> {
    state
        .identity
        .as_ref()
        .ok_or_else(|| ApiError::from(SessionError::NotInitialized))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let session = identity(&state)?
        .sign_in(request.email.trim(), &request.password)
        .await?;

    Ok(Json(AuthResponse {
        message: "Login successful!".to_string(),
        session,
    }))
}

pub async fn signup_account(
    State(state): State<AppState>,
    Json(request): Json<SignupAccountRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let provider = identity(&state)?;
    validate_new_password(&request.password, &request.confirm_password)?;

    let session = provider
        .sign_up(request.email.trim(), &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Account created successfully!".to_string(),
            session,
        }),
    ))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> Json<MeResponse> {
    let is_admin = state.config.is_admin_email(user.email.as_deref());
    Json(MeResponse { user, is_admin })
}
