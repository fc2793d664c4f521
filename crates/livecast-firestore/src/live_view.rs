//! Live, in-memory view of all streams.
//!
//! [`LiveStreams`] keeps the latest stream list in a `watch` channel fed by a
//! repository subscription. The subscription callbacks are the only writers;
//! readers take the current value without further locking.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use livecast_models::Stream;

use crate::listen::Subscription;
use crate::stream_repo::StreamRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveStatus {
    /// Waiting for the first snapshot.
    Loading,
    Ready,
    /// The subscription failed. Terminal for this view.
    Error,
}

/// Snapshot of the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveState {
    pub status: LiveStatus,
    pub streams: Vec<Stream>,
    pub error: Option<String>,
}

impl LiveState {
    fn loading() -> Self {
        Self {
            status: LiveStatus::Loading,
            streams: Vec::new(),
            error: None,
        }
    }

    /// First stream flagged active, in list order.
    pub fn active_stream(&self) -> Option<&Stream> {
        self.streams.iter().find(|s| s.is_active)
    }
}

pub struct LiveStreams {
    state: watch::Receiver<LiveState>,
    subscription: Mutex<Option<Subscription>>,
}

impl LiveStreams {
    /// Subscribe to `repo` and start tracking its streams.
    ///
    /// On error the last delivered list is kept and the state moves to
    /// [`LiveStatus::Error`]; there is no automatic retry.
    pub fn start(repo: &StreamRepository) -> Self {
        let (tx, rx) = watch::channel(LiveState::loading());
        let tx = Arc::new(tx);
        let err_tx = Arc::clone(&tx);

        let subscription = repo.subscribe(
            move |streams| {
                tx.send_modify(|state| {
                    state.status = LiveStatus::Ready;
                    state.streams = streams;
                    state.error = None;
                });
            },
            move |e| {
                warn!(error = %e, "Stream subscription failed");
                err_tx.send_modify(|state| {
                    state.status = LiveStatus::Error;
                    state.error = Some(e.to_string());
                });
            },
        );

        Self {
            state: rx,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn state(&self) -> LiveState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> LiveStatus {
        self.state.borrow().status
    }

    pub fn streams(&self) -> Vec<Stream> {
        self.state.borrow().streams.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Recomputed from the current list on every call.
    pub fn active_stream(&self) -> Option<Stream> {
        self.state.borrow().active_stream().cloned()
    }

    /// Receiver notified after every state change.
    pub fn changes(&self) -> watch::Receiver<LiveState> {
        self.state.clone()
    }

    /// Cancel the underlying subscription. The current state is kept.
    pub fn stop(&self) {
        if let Some(subscription) = self.lock_subscription().take() {
            subscription.unsubscribe();
            info!("Stream subscription stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.lock_subscription()
            .as_ref()
            .map_or(true, |s| s.is_finished())
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
