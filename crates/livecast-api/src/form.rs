//! Admin stream form.
//!
//! [`AdminFormController`] holds what an admin has typed so far, validates it,
//! and hands a complete record to a [`StreamWriter`]. It is used both for
//! creating a new stream and for editing an existing one.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use livecast_firestore::{RepositoryError, RepositoryResult, StreamRepository};
use livecast_models::{extract_video_id, Stream, StreamFormData, StreamId, StreamUpdate};

/// Shown when a save fails without a message of its own.
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save stream";

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Please enter a valid YouTube video ID or embed code")]
    InvalidVideoId,

    #[error("Title is required")]
    TitleRequired,

    #[error("{}", save_message(.0))]
    Save(RepositoryError),
}

fn save_message(e: &RepositoryError) -> String {
    let msg = e.to_string();
    if msg.trim().is_empty() {
        SAVE_FAILED_MESSAGE.to_string()
    } else {
        msg
    }
}

/// Persistence used by the form.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamWriter: Send + Sync {
    async fn create_stream(&self, data: &StreamFormData) -> RepositoryResult<()>;

    async fn update_stream(&self, id: &StreamId, update: StreamUpdate) -> RepositoryResult<()>;
}

#[async_trait]
impl StreamWriter for StreamRepository {
    async fn create_stream(&self, data: &StreamFormData) -> RepositoryResult<()> {
        self.create(data).await
    }

    async fn update_stream(&self, id: &StreamId, update: StreamUpdate) -> RepositoryResult<()> {
        self.update(id, update).await
    }
}

/// What a successful submit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Updated(StreamId),
}

#[derive(Debug, Clone, Default)]
pub struct AdminFormController {
    video_input: String,
    form: StreamFormData,
    editing: Option<StreamId>,
    error: Option<String>,
    submitting: bool,
}

impl AdminFormController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw text in the video field, as typed.
    pub fn video_input(&self) -> &str {
        &self.video_input
    }

    pub fn form(&self) -> &StreamFormData {
        &self.form
    }

    pub fn editing(&self) -> Option<&StreamId> {
        self.editing.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Record the raw video field. The video ID only changes when the text
    /// yields one; otherwise the previous ID is kept.
    pub fn set_video_input(&mut self, raw: impl Into<String>) {
        self.video_input = raw.into();
        self.error = None;
        if let Some(id) = extract_video_id(&self.video_input) {
            self.form.video_id = id;
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.form.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form.description = description.into();
    }

    pub fn set_active(&mut self, is_active: bool) {
        self.form.is_active = is_active;
    }

    /// Load an existing stream for editing.
    pub fn begin_edit(&mut self, stream: &Stream) {
        self.form = stream.form_data();
        self.video_input = stream.video_id.clone();
        self.editing = stream.id.clone();
        self.error = None;
    }

    /// Leave edit mode and clear the form.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.reset();
    }

    fn reset(&mut self) {
        self.form = StreamFormData::default();
        self.video_input.clear();
        self.error = None;
    }

    fn validate(&self) -> Result<(), FormError> {
        if !self.form.has_valid_video_id() {
            return Err(FormError::InvalidVideoId);
        }
        if self.form.title.trim().is_empty() {
            return Err(FormError::TitleRequired);
        }
        Ok(())
    }

    /// Validate and save.
    ///
    /// Validation failures never reach `writer`. Any success clears the form;
    /// an edit also leaves edit mode. On any failure the form keeps its
    /// contents and [`error`](Self::error) holds the message.
    pub async fn submit<W>(&mut self, writer: &W) -> Result<SubmitOutcome, FormError>
    where
        W: StreamWriter + ?Sized,
    {
        self.error = None;

        if let Err(e) = self.validate() {
            debug!(error = %e, "Stream form rejected");
            self.error = Some(e.to_string());
            return Err(e);
        }

        self.submitting = true;
        let result = match self.editing.clone() {
            Some(id) => writer
                .update_stream(&id, self.form.clone().into_update())
                .await
                .map(|()| SubmitOutcome::Updated(id)),
            None => writer
                .create_stream(&self.form)
                .await
                .map(|()| SubmitOutcome::Created),
        };
        self.submitting = false;

        match result {
            Ok(outcome) => {
                self.editing = None;
                self.reset();
                Ok(outcome)
            }
            Err(e) => {
                let err = FormError::Save(e);
                warn!(error = %err, "Saving stream failed");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecast_firestore::FirestoreError;

    const ID: &str = "dQw4w9WgXcQ";

    fn filled() -> AdminFormController {
        let mut form = AdminFormController::new();
        form.set_video_input(format!("https://www.youtube.com/watch?v={ID}"));
        form.set_title("Sunset over the ridge");
        form.set_description("Live from camp");
        form
    }

    fn existing() -> Stream {
        Stream {
            id: Some(StreamId::from("abc")),
            video_id: ID.into(),
            title: "Old title".into(),
            description: "Old".into(),
            is_active: false,
            created_at: 1_700_000_000_000,
            updated_at: None,
            thumbnail: None,
        }
    }

    #[test]
    fn test_fresh_form_defaults_active() {
        let form = AdminFormController::new();
        assert!(form.form().is_active);
        assert!(form.editing().is_none());
        assert!(!form.is_submitting());
    }

    #[test]
    fn test_video_input_extracts_id() {
        let mut form = AdminFormController::new();
        form.set_video_input(format!(r#"<iframe src="https://www.youtube.com/embed/{ID}"></iframe>"#));
        assert_eq!(form.form().video_id, ID);

        // Unparseable text keeps the previous ID.
        form.set_video_input("not a url");
        assert_eq!(form.video_input(), "not a url");
        assert_eq!(form.form().video_id, ID);
    }

    #[tokio::test]
    async fn test_invalid_video_id_short_circuits() {
        let mut writer = MockStreamWriter::new();
        writer.expect_create_stream().never();

        let mut form = AdminFormController::new();
        form.set_video_input("short");
        form.set_title("");

        let err = form.submit(&writer).await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid YouTube video ID or embed code");
        assert_eq!(form.error(), Some("Please enter a valid YouTube video ID or embed code"));
    }

    #[tokio::test]
    async fn test_blank_title_rejected_before_writer() {
        let mut writer = MockStreamWriter::new();
        writer.expect_create_stream().never();

        let mut form = filled();
        form.set_title("   ");
        let err = form.submit(&writer).await.unwrap_err();
        assert!(matches!(err, FormError::TitleRequired));
        assert_eq!(form.error(), Some("Title is required"));
    }

    #[tokio::test]
    async fn test_create_success_resets_form() {
        let mut writer = MockStreamWriter::new();
        writer
            .expect_create_stream()
            .withf(|data| data.video_id == ID && data.title == "Sunset over the ridge" && data.is_active)
            .times(1)
            .returning(|_| Ok(()));

        let mut form = filled();
        assert_eq!(form.submit(&writer).await.unwrap(), SubmitOutcome::Created);
        assert_eq!(form.form(), &StreamFormData::default());
        assert_eq!(form.video_input(), "");
        assert!(form.error().is_none());
    }

    #[tokio::test]
    async fn test_edit_sends_full_update_and_leaves_edit_mode() {
        let mut writer = MockStreamWriter::new();
        writer
            .expect_update_stream()
            .withf(|id, update| {
                id.as_str() == "abc"
                    && update.title.as_deref() == Some("New title")
                    && update.video_id.as_deref() == Some(ID)
                    && update.is_active == Some(false)
                    && update.id.is_none()
            })
            .times(1)
            .returning(|_, _| Ok(()));
        writer.expect_create_stream().never();

        let mut form = AdminFormController::new();
        form.begin_edit(&existing());
        assert_eq!(form.video_input(), ID);
        form.set_title("New title");

        let outcome = form.submit(&writer).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Updated(StreamId::from("abc")));
        assert!(form.editing().is_none());
        assert_eq!(form.form(), &StreamFormData::default());
        assert_eq!(form.video_input(), "");
    }

    #[tokio::test]
    async fn test_submit_after_edit_does_not_create_duplicate() {
        let mut writer = MockStreamWriter::new();
        writer.expect_update_stream().times(1).returning(|_, _| Ok(()));
        writer.expect_create_stream().never();

        let mut form = AdminFormController::new();
        form.begin_edit(&existing());
        form.set_title("Edited");
        form.submit(&writer).await.unwrap();

        let err = form.submit(&writer).await.unwrap_err();
        assert!(matches!(err, FormError::InvalidVideoId));
        assert!(form.editing().is_none());
    }

    #[tokio::test]
    async fn test_repository_failure_keeps_form() {
        let mut writer = MockStreamWriter::new();
        writer
            .expect_create_stream()
            .returning(|_| Err(RepositoryError::Store(FirestoreError::unavailable("backend down"))));

        let mut form = filled();
        let err = form.submit(&writer).await.unwrap_err();
        assert!(matches!(err, FormError::Save(_)));
        assert!(form.error().unwrap().contains("backend down"));
        assert_eq!(form.form().title, "Sunset over the ridge");
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_empty_failure_message_falls_back() {
        let mut writer = MockStreamWriter::new();
        writer
            .expect_create_stream()
            .returning(|_| Err(RepositoryError::InvalidInput(String::new())));

        let mut form = filled();
        form.submit(&writer).await.unwrap_err();
        assert_eq!(form.error(), Some(SAVE_FAILED_MESSAGE));
    }

    #[test]
    fn test_cancel_edit_clears() {
        let mut form = AdminFormController::new();
        form.begin_edit(&existing());
        form.cancel_edit();
        assert!(form.editing().is_none());
        assert_eq!(form.form(), &StreamFormData::default());
    }
}
