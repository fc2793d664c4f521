//! In-process document store.
//!
//! Mirrors the Firestore semantics the repositories depend on: server-assigned
//! IDs, `exists` preconditions on patch and delete, masked merges, ordering
//! that drops documents lacking the order field, and create/update times.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{CollectionQuery, DocumentStore, ALL_COLLECTIONS};
use crate::types::{Direction, Document, Fields, Value};

const NAME_PREFIX: &str = "projects/local/databases/(default)/documents";

type Collection = BTreeMap<String, Document>;

pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    changes: broadcast::Sender<String>,
    offline: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate losing the backend. While offline every operation fails with
    /// `Unavailable`; listeners are told to re-read so they observe it.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
        let _ = self.changes.send(ALL_COLLECTIONS.to_string());
    }

    /// Number of documents in a collection.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |c| c.len())
    }

    /// Insert a document under a caller-chosen ID, replacing any existing one.
    /// Used to seed fixtures that the public API would not produce.
    pub async fn insert_raw(&self, collection: &str, id: &str, fields: Fields) -> Document {
        let now = Utc::now().to_rfc3339();
        let doc = Document {
            name: Some(Self::document_name(collection, id)),
            fields: Some(fields),
            create_time: Some(now.clone()),
            update_time: Some(now),
        };
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc.clone());
        self.notify(collection);
        doc
    }

    fn document_name(collection: &str, id: &str) -> String {
        format!("{}/{}/{}", NAME_PREFIX, collection, id)
    }

    fn check_online(&self) -> FirestoreResult<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(FirestoreError::unavailable("memory store is offline"));
        }
        Ok(())
    }

    fn notify(&self, collection: &str) {
        let _ = self.changes.send(collection.to_string());
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add_document(&self, collection: &str, fields: Fields) -> FirestoreResult<Document> {
        self.check_online()?;
        let id = Uuid::new_v4().simple().to_string();
        let doc = self.insert_raw(collection, &id, fields).await;
        debug!(collection = %collection, id = %id, "Memory store insert");
        Ok(doc)
    }

    async fn get_document(&self, collection: &str, id: &str) -> FirestoreResult<Option<Document>> {
        self.check_online()?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        mut fields: Fields,
        mask: Vec<String>,
    ) -> FirestoreResult<Document> {
        self.check_online()?;
        let updated = {
            let mut collections = self.collections.write().await;
            let doc = collections
                .get_mut(collection)
                .and_then(|c| c.get_mut(id))
                .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", collection, id)))?;

            let existing = doc.fields.get_or_insert_with(Fields::new);
            for path in mask {
                // A masked field missing from `fields` is deleted, as in Firestore.
                match fields.remove(&path) {
                    Some(value) => existing.insert(path, value),
                    None => existing.remove(&path),
                };
            }
            doc.update_time = Some(Utc::now().to_rfc3339());
            doc.clone()
        };
        self.notify(collection);
        Ok(updated)
    }

    async fn remove_document(&self, collection: &str, id: &str) -> FirestoreResult<()> {
        self.check_online()?;
        let removed = self
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|c| c.remove(id));

        if removed.is_none() {
            return Err(FirestoreError::not_found(format!("{}/{}", collection, id)));
        }
        self.notify(collection);
        Ok(())
    }

    async fn run_collection_query(&self, query: &CollectionQuery) -> FirestoreResult<Vec<Document>> {
        self.check_online()?;
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut docs: Vec<Document> = match &query.order_by {
            Some((field, _)) => collection
                .values()
                .filter(|d| d.value(field).is_some())
                .cloned()
                .collect(),
            None => collection.values().cloned().collect(),
        };

        if let Some((field, direction)) = &query.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_values(a.value(field), b.value(field))
                    .then_with(|| a.name.cmp(&b.name));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        Ok(docs)
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Order values of the same kind; mixed kinds fall back to Firestore's type order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::TimestampValue(x)), Some(Value::TimestampValue(y))) => {
            match (parse_timestamp(x), parse_timestamp(y)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::IntegerValue(x)), Some(Value::IntegerValue(y))) => {
            match (x.parse::<i64>(), y.parse::<i64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::DoubleValue(x)), Some(Value::DoubleValue(y))) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::StringValue(x)), Some(Value::StringValue(y))) => x.cmp(y),
        (Some(Value::BooleanValue(x)), Some(Value::BooleanValue(y))) => x.cmp(y),
        (a, b) => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::NullValue(_)) => 0,
        Some(Value::BooleanValue(_)) => 1,
        Some(Value::IntegerValue(_)) | Some(Value::DoubleValue(_)) => 2,
        Some(Value::TimestampValue(_)) => 3,
        Some(Value::StringValue(_)) => 4,
        Some(Value::BytesValue(_)) => 5,
        Some(Value::ReferenceValue(_)) => 6,
        Some(Value::ArrayValue(_)) => 8,
        Some(Value::MapValue(_)) => 9,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into())
}
