//! Stream records.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video_ref::{embed_url, is_valid_video_id, watch_url};

/// Store-assigned identifier of a stream document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct StreamId(pub String);

impl StreamId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A published YouTube stream as read back from the `streams` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    /// Document ID, absent until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StreamId>,

    /// Canonical 11-character YouTube video ID
    pub video_id: String,

    /// Display title
    pub title: String,

    /// Display description (empty when not provided)
    #[serde(default)]
    pub description: String,

    /// Whether the stream is surfaced as live.
    ///
    /// Several records may be active at once; readers take the first one in
    /// list order.
    #[serde(default)]
    pub is_active: bool,

    /// Creation time, milliseconds since epoch
    pub created_at: i64,

    /// Last update time, milliseconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,

    /// Thumbnail URL, derived from `video_id` at creation time only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Stream {
    /// Creation time as a UTC datetime.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }

    /// Embed URL for the player widget.
    pub fn embed_url(&self) -> String {
        embed_url(&self.video_id)
    }

    /// Canonical watch URL.
    pub fn watch_url(&self) -> String {
        watch_url(&self.video_id)
    }

    /// Editable subset of this record, used to pre-fill the admin form.
    pub fn form_data(&self) -> StreamFormData {
        StreamFormData {
            video_id: self.video_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            is_active: self.is_active,
        }
    }
}

/// The fields an admin fills in to create or edit a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormData {
    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StreamFormData {
    fn default() -> Self {
        Self {
            video_id: String::new(),
            title: String::new(),
            description: String::new(),
            is_active: true,
        }
    }
}

impl StreamFormData {
    /// Whether `video_id` has the canonical shape.
    pub fn has_valid_video_id(&self) -> bool {
        !self.video_id.is_empty() && is_valid_video_id(&self.video_id)
    }

    /// Full-record update carrying every form field.
    pub fn into_update(self) -> StreamUpdate {
        StreamUpdate {
            id: None,
            video_id: Some(self.video_id),
            title: Some(self.title),
            description: Some(self.description),
            is_active: Some(self.is_active),
            thumbnail: None,
        }
    }
}

/// Partial update of a stream. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamUpdate {
    /// Accepted on input for convenience; never written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Changing `video_id` does not refresh the thumbnail; set it here
    /// explicitly if it should follow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl StreamUpdate {
    /// Drop the `id` field so it can never be written into the document body.
    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    /// True when no writable field is present.
    pub fn is_empty(&self) -> bool {
        self.video_id.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
            && self.thumbnail.is_none()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }
}
