//! Stream repository.
//!
//! Persists [`Stream`] records in the `streams` collection and exposes them
//! as a live, `createdAt`-descending list.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use livecast_models::{thumbnail_url, Stream, StreamFormData, StreamId, StreamUpdate};

use crate::error::{RepositoryError, RepositoryResult};
use crate::listen::{listen, Subscription};
use crate::store::{CollectionQuery, SharedStore};
use crate::types::{Direction, Document, Fields, ToFirestoreValue};

pub const STREAMS_COLLECTION: &str = "streams";

/// Persisted field names.
mod field {
    pub const VIDEO_ID: &str = "videoId";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const IS_ACTIVE: &str = "isActive";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const THUMBNAIL: &str = "thumbnail";
}

/// Repository for stream records.
///
/// Built without a store, every operation fails with
/// [`RepositoryError::NotInitialized`] instead of panicking.
#[derive(Clone)]
pub struct StreamRepository {
    store: Option<SharedStore>,
}

impl StreamRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store: Some(store) }
    }

    pub fn uninitialized() -> Self {
        Self { store: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> RepositoryResult<&SharedStore> {
        self.store.as_ref().ok_or(RepositoryError::NotInitialized)
    }

    fn query() -> CollectionQuery {
        CollectionQuery::new(STREAMS_COLLECTION).order_by(field::CREATED_AT, Direction::Descending)
    }

    /// Open a live query over all streams, newest first.
    ///
    /// `on_change` receives the full list on first load and after every
    /// change. On failure `on_error` is called once and the subscription ends.
    pub fn subscribe<F, E>(&self, mut on_change: F, on_error: E) -> Subscription
    where
        F: FnMut(Vec<Stream>) + Send + 'static,
        E: FnOnce(RepositoryError) + Send + 'static,
    {
        let store = match self.store() {
            Ok(store) => store.clone(),
            Err(e) => {
                on_error(e);
                return Subscription::inert();
            }
        };

        listen(
            store,
            Self::query(),
            move |docs| on_change(decode_all(&docs)),
            move |e| on_error(RepositoryError::Store(e)),
        )
    }

    /// Insert a new stream. The generated ID is not returned; it arrives with
    /// the next snapshot.
    pub async fn create(&self, data: &StreamFormData) -> RepositoryResult<()> {
        let store = self.store()?;
        let now = Utc::now();

        let mut fields = Fields::new();
        fields.insert(field::VIDEO_ID.into(), data.video_id.to_firestore_value());
        fields.insert(field::TITLE.into(), data.title.to_firestore_value());
        fields.insert(field::DESCRIPTION.into(), data.description.to_firestore_value());
        fields.insert(field::IS_ACTIVE.into(), data.is_active.to_firestore_value());
        fields.insert(
            field::THUMBNAIL.into(),
            thumbnail_url(&data.video_id).to_firestore_value(),
        );
        fields.insert(field::CREATED_AT.into(), now.to_firestore_value());
        fields.insert(field::UPDATED_AT.into(), now.to_firestore_value());

        let doc = store.add_document(STREAMS_COLLECTION, fields).await?;
        info!(
            stream_id = doc.id().unwrap_or_default(),
            video_id = %data.video_id,
            is_active = data.is_active,
            "Stream created"
        );
        Ok(())
    }

    /// Merge the present fields of `update` into an existing stream.
    ///
    /// `id` inside the update is ignored. The thumbnail is left as-is unless
    /// supplied explicitly.
    pub async fn update(&self, id: &StreamId, update: StreamUpdate) -> RepositoryResult<()> {
        let store = self.store()?;
        let update = update.without_id();

        let mut fields = Fields::new();
        if let Some(v) = update.video_id {
            fields.insert(field::VIDEO_ID.into(), v.to_firestore_value());
        }
        if let Some(v) = update.title {
            fields.insert(field::TITLE.into(), v.to_firestore_value());
        }
        if let Some(v) = update.description {
            fields.insert(field::DESCRIPTION.into(), v.to_firestore_value());
        }
        if let Some(v) = update.is_active {
            fields.insert(field::IS_ACTIVE.into(), v.to_firestore_value());
        }
        if let Some(v) = update.thumbnail {
            fields.insert(field::THUMBNAIL.into(), v.to_firestore_value());
        }
        fields.insert(field::UPDATED_AT.into(), Utc::now().to_firestore_value());

        let mask: Vec<String> = fields.keys().cloned().collect();
        store
            .patch_document(STREAMS_COLLECTION, id.as_str(), fields, mask)
            .await?;

        info!(stream_id = %id, "Stream updated");
        Ok(())
    }

    /// Remove a stream. Deleting an ID that does not exist is an error.
    pub async fn delete(&self, id: &StreamId) -> RepositoryResult<()> {
        self.store()?
            .remove_document(STREAMS_COLLECTION, id.as_str())
            .await?;
        info!(stream_id = %id, "Stream deleted");
        Ok(())
    }

    pub async fn get(&self, id: &StreamId) -> RepositoryResult<Option<Stream>> {
        let doc = self
            .store()?
            .get_document(STREAMS_COLLECTION, id.as_str())
            .await?;
        Ok(doc.as_ref().and_then(stream_from_document))
    }

    /// One-shot read of all streams, newest first.
    pub async fn list(&self) -> RepositoryResult<Vec<Stream>> {
        let docs = self.store()?.run_collection_query(&Self::query()).await?;
        Ok(decode_all(&docs))
    }
}

fn decode_all(docs: &[Document]) -> Vec<Stream> {
    docs.iter().filter_map(stream_from_document).collect()
}

/// Decode a stream document, or `None` (with a warning) if it lacks the
/// identifying fields.
pub fn stream_from_document(doc: &Document) -> Option<Stream> {
    let decoded = doc.id().and_then(|id| {
        Some(Stream {
            id: Some(StreamId::from(id)),
            video_id: doc.get(field::VIDEO_ID)?,
            title: doc.get(field::TITLE)?,
            description: doc.get(field::DESCRIPTION).unwrap_or_default(),
            is_active: doc.get(field::IS_ACTIVE).unwrap_or(false),
            created_at: millis(doc, field::CREATED_AT).unwrap_or_else(|| Utc::now().timestamp_millis()),
            updated_at: millis(doc, field::UPDATED_AT),
            thumbnail: doc.get(field::THUMBNAIL),
        })
    });

    if decoded.is_none() {
        warn!(name = ?doc.name, "Skipping malformed stream document");
    }
    decoded
}

/// Timestamp field as epoch millis; integer millis are accepted too.
fn millis(doc: &Document, name: &str) -> Option<i64> {
    doc.get::<DateTime<Utc>>(name)
        .map(|dt| dt.timestamp_millis())
        .or_else(|| doc.get::<i64>(name))
}
