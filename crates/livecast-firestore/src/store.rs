//! Document store abstraction.
//!
//! Repositories talk to a [`DocumentStore`] rather than to the REST client
//! directly, so the same stream and signup logic runs against Firestore in
//! production and against [`crate::memory::MemoryStore`] in tests and local
//! development. Every store publishes the names of collections it writes to
//! on a broadcast channel; live queries are built on that feed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{Direction, Document, Fields, Precondition, StructuredQuery};

/// Change-feed message telling every listener to re-read.
pub const ALL_COLLECTIONS: &str = "*";

const CHANGE_FEED_CAPACITY: usize = 64;

/// A whole-collection read, optionally ordered by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection: String,
    pub order_by: Option<(String, Direction)>,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Whether a change-feed message concerns this query.
    pub fn is_affected_by(&self, changed: &str) -> bool {
        changed == self.collection || changed == ALL_COLLECTIONS
    }

    fn to_structured(&self) -> StructuredQuery {
        let query = StructuredQuery::collection(&self.collection);
        match &self.order_by {
            Some((field, direction)) => query.order_by(field, *direction),
            None => query,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document under a store-assigned ID.
    async fn add_document(&self, collection: &str, fields: Fields) -> FirestoreResult<Document>;

    async fn get_document(&self, collection: &str, id: &str) -> FirestoreResult<Option<Document>>;

    /// Merge the masked fields into an existing document; `NotFound` if absent.
    async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        mask: Vec<String>,
    ) -> FirestoreResult<Document>;

    /// Delete an existing document; `NotFound` if absent.
    async fn remove_document(&self, collection: &str, id: &str) -> FirestoreResult<()>;

    async fn run_collection_query(&self, query: &CollectionQuery) -> FirestoreResult<Vec<Document>>;

    /// Subscribe to the change feed.
    fn changes(&self) -> broadcast::Receiver<String>;

    /// Interval at which live queries should re-read even without a change
    /// notification. Stores that see every write return `None`.
    fn resync_interval(&self) -> Option<Duration> {
        None
    }

    /// Short name for logs and readiness output.
    fn backend_name(&self) -> &'static str;
}

pub type SharedStore = Arc<dyn DocumentStore>;

// =============================================================================
// Firestore-backed store
// =============================================================================

/// [`DocumentStore`] over the Firestore REST API.
///
/// Writes made through this process are announced immediately; writes made
/// elsewhere are picked up by the periodic re-read.
pub struct FirestoreStore {
    client: FirestoreClient,
    changes: broadcast::Sender<String>,
}

impl FirestoreStore {
    pub fn new(client: FirestoreClient) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { client, changes }
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Ok(Self::new(FirestoreClient::from_env().await?))
    }

    fn notify(&self, collection: &str) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(collection.to_string());
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add_document(&self, collection: &str, fields: Fields) -> FirestoreResult<Document> {
        // Not retried: a create with a server-assigned ID is not idempotent.
        let doc = self.client.create_document(collection, None, fields).await?;
        self.notify(collection);
        Ok(doc)
    }

    async fn get_document(&self, collection: &str, id: &str) -> FirestoreResult<Option<Document>> {
        self.client
            .with_retry("get_document", || self.client.get_document(collection, id))
            .await
    }

    async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        mask: Vec<String>,
    ) -> FirestoreResult<Document> {
        let doc = self
            .client
            .with_retry("update_document", || {
                self.client.update_document(
                    collection,
                    id,
                    fields.clone(),
                    Some(mask.clone()),
                    Some(Precondition::must_exist()),
                )
            })
            .await?;
        self.notify(collection);
        Ok(doc)
    }

    async fn remove_document(&self, collection: &str, id: &str) -> FirestoreResult<()> {
        self.client
            .with_retry("delete_document", || {
                self.client
                    .delete_document(collection, id, Some(Precondition::must_exist()))
            })
            .await?;
        self.notify(collection);
        Ok(())
    }

    async fn run_collection_query(&self, query: &CollectionQuery) -> FirestoreResult<Vec<Document>> {
        let docs = self
            .client
            .with_retry("run_query", || self.client.run_query("", query.to_structured()))
            .await?;
        debug!(collection = %query.collection, count = docs.len(), "Collection query returned");
        Ok(docs)
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    fn resync_interval(&self) -> Option<Duration> {
        self.client.config().listen_resync
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}
