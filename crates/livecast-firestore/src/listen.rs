//! Live queries.
//!
//! [`listen`] registers a snapshot handler and an error handler against a
//! collection query and returns a [`Subscription`]. The handler receives the
//! full ordered result set on first load and again after every change. An
//! error ends the subscription after a single call to the error handler.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::FirestoreError;
use crate::metrics::{record_listen_error, record_snapshot};
use crate::store::{CollectionQuery, SharedStore};
use crate::types::Document;

/// Handle to a running live query. Dropping it cancels the query.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A subscription with nothing behind it, for listeners that failed to start.
    pub fn inert() -> Self {
        Self { task: None }
    }

    /// Stop receiving updates.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    /// True once the query has stopped, either cancelled or after an error.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start a live query. Must be called from within a tokio runtime.
pub fn listen<F, E>(store: SharedStore, query: CollectionQuery, on_snapshot: F, on_error: E) -> Subscription
where
    F: FnMut(Vec<Document>) + Send + 'static,
    E: FnOnce(FirestoreError) + Send + 'static,
{
    // Subscribe before the first read so no write can slip in between.
    let changes = store.changes();
    let task = tokio::spawn(run_listener(store, query, changes, on_snapshot, on_error));
    Subscription { task: Some(task) }
}

/// Identity of a snapshot: document names and update times, in order.
type Signature = Vec<(Option<String>, Option<String>)>;

fn signature(docs: &[Document]) -> Signature {
    docs.iter()
        .map(|d| (d.name.clone(), d.update_time.clone()))
        .collect()
}

async fn run_listener<F, E>(
    store: SharedStore,
    query: CollectionQuery,
    mut changes: Receiver<String>,
    mut on_snapshot: F,
    on_error: E,
) where
    F: FnMut(Vec<Document>) + Send + 'static,
    E: FnOnce(FirestoreError) + Send + 'static,
{
    let mut resync = store.resync_interval().map(resync_timer);
    let mut last: Option<Signature> = None;

    loop {
        match store.run_collection_query(&query).await {
            Ok(docs) => {
                let current = signature(&docs);
                if last.as_ref() != Some(&current) {
                    last = Some(current);
                    record_snapshot(&query.collection, docs.len());
                    on_snapshot(docs);
                }
            }
            Err(e) => {
                warn!(collection = %query.collection, error = %e, "Live query failed");
                record_listen_error(&query.collection);
                on_error(e);
                return;
            }
        }

        if !next_trigger(&query, &mut changes, resync.as_mut()).await {
            debug!(collection = %query.collection, "Change feed closed, live query ending");
            return;
        }
    }
}

fn resync_timer(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Wait until the query should re-read. Returns false when the feed is gone.
async fn next_trigger(
    query: &CollectionQuery,
    changes: &mut Receiver<String>,
    mut resync: Option<&mut Interval>,
) -> bool {
    loop {
        let tick = async {
            match resync.as_deref_mut() {
                Some(interval) => {
                    interval.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            msg = changes.recv() => match msg {
                Ok(changed) if query.is_affected_by(&changed) => return true,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(collection = %query.collection, skipped, "Change feed lagged, re-reading");
                    return true;
                }
                Err(RecvError::Closed) => return false,
            },
            _ = tick => return true,
        }
    }
}
