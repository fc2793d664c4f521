//! Admin stream management.
//!
//! Creates and full edits go through [`AdminFormController`] so they get the
//! same validation as the admin form. PATCH applies a partial update directly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use livecast_models::{
    embed_url, extract_video_id, is_valid_video_id, thumbnail_url, Stream, StreamId, StreamUpdate,
};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::form::{AdminFormController, FormError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VideoRefRequest {
    #[serde(default)]
    pub input: String,
}

/// Parse preview for the video field.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRefResponse {
    pub input: String,
    pub video_id: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Body for create and full edit. `videoInput` takes any supported reference
/// form; `videoId` is accepted as a fallback.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormRequest {
    pub video_input: Option<String>,
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl StreamFormRequest {
    fn apply(self, form: &mut AdminFormController) {
        if let Some(raw) = self.video_input.or(self.video_id) {
            form.set_video_input(raw);
        }
        if let Some(title) = self.title {
            form.set_title(title);
        }
        if let Some(description) = self.description {
            form.set_description(description);
        }
        if let Some(is_active) = self.is_active {
            form.set_active(is_active);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<StreamId>,
}

impl MessageResponse {
    fn new(message: &str, id: Option<StreamId>) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
            id,
        })
    }
}

pub async fn parse_video_ref(_admin: AdminUser, Json(request): Json<VideoRefRequest>) -> Json<VideoRefResponse> {
    let video_id = extract_video_id(&request.input);
    Json(VideoRefResponse {
        valid: video_id.is_some(),
        embed_url: video_id.as_deref().map(embed_url),
        thumbnail: video_id.as_deref().map(thumbnail_url),
        video_id,
        input: request.input,
    })
}

/// One-shot read of every stream, for the admin list.
pub async fn list_streams(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<Stream>>> {
    Ok(Json(state.streams.list().await?))
}

pub async fn get_stream(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Stream>> {
    state
        .streams
        .get(&StreamId::from(id.as_str()))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Stream {}", id)))
}

pub async fn create_stream(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<StreamFormRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let mut form = AdminFormController::new();
    request.apply(&mut form);
    form.submit(&state.streams).await?;

    info!(uid = %admin.uid, "Stream added via admin API");
    Ok((StatusCode::CREATED, MessageResponse::new("Stream added successfully", None)))
}

/// Full edit: loads the stored record, applies the supplied fields over it,
/// and saves every form field.
pub async fn replace_stream(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<StreamFormRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let stream_id = StreamId::from(id.as_str());
    let existing = state
        .streams
        .get(&stream_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Stream {}", id)))?;

    let mut form = AdminFormController::new();
    form.begin_edit(&existing);
    request.apply(&mut form);

    form.submit(&state.streams).await?;

    info!(uid = %admin.uid, stream_id = %stream_id, "Stream edited via admin API");
    Ok(MessageResponse::new("Stream updated successfully", Some(stream_id)))
}

/// Partial update, e.g. toggling `isActive`.
pub async fn patch_stream(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(update): Json<StreamUpdate>,
) -> ApiResult<Json<MessageResponse>> {
    let mut update = update.without_id();
    if update.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }

    if let Some(raw) = update.video_id.take() {
        let video_id = extract_video_id(&raw)
            .filter(|v| is_valid_video_id(v))
            .ok_or(FormError::InvalidVideoId)?;
        update.video_id = Some(video_id);
    }
    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(FormError::TitleRequired.into());
    }

    let stream_id = StreamId::from(id);
    state.streams.update(&stream_id, update).await?;
    Ok(MessageResponse::new("Stream updated successfully", Some(stream_id)))
}

pub async fn delete_stream(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let stream_id = StreamId::from(id);
    state.streams.delete(&stream_id).await?;
    info!(uid = %admin.uid, stream_id = %stream_id, "Stream deleted via admin API");
    Ok(MessageResponse::new("Stream deleted successfully", Some(stream_id)))
}
