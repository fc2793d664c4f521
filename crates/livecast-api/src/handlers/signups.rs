//! Email signup capture.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

pub const SIGNUP_SUCCESS_MESSAGE: &str = "Thanks! We'll notify you about our next adventure.";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub email: String,
}

pub async fn create_signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let signup = state.signups.add(&request.email).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: SIGNUP_SUCCESS_MESSAGE.to_string(),
            email: signup.email,
        }),
    ))
}
