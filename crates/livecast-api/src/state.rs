//! Application state.

use std::sync::Arc;

use tracing::{error, info, warn};

use livecast_firestore::{FirestoreStore, LiveStreams, MemoryStore, SharedStore, SignupRepository, StreamRepository};

use crate::auth::{JwksCache, TokenVerifier};
use crate::config::{ApiConfig, StoreBackend};
use crate::identity::{FirebaseIdentity, IdentityProvider};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    /// Absent when the database could not be reached at boot.
    pub store: Option<SharedStore>,
    pub streams: StreamRepository,
    pub signups: SignupRepository,
    /// App-wide live view of all streams.
    pub live: Arc<LiveStreams>,
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// A database that cannot be reached is logged and left out; the server
    /// still starts and answers "Database not initialized".
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store: Option<SharedStore> = match config.store_backend {
            StoreBackend::Memory => {
                warn!("Using in-memory store; data is lost on restart");
                Some(Arc::new(MemoryStore::new()))
            }
            StoreBackend::Firestore => match FirestoreStore::from_env().await {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    error!(error = %e, "Firestore initialization failed, running without a database");
                    None
                }
            },
        };

        let verifier: Option<Arc<dyn TokenVerifier>> = match &config.project_id {
            Some(project_id) => Some(Arc::new(JwksCache::new(project_id.clone())?)),
            None => {
                warn!("No Firebase project configured; admin endpoints are disabled");
                None
            }
        };

        let identity: Option<Arc<dyn IdentityProvider>> = match &config.firebase_api_key {
            Some(key) => Some(Arc::new(FirebaseIdentity::new(key.clone())?)),
            None => {
                warn!("FIREBASE_API_KEY not set; sign-in endpoints are disabled");
                None
            }
        };

        Ok(Self::build(config, store, verifier, identity))
    }

    /// Assemble state from already-constructed parts. Must be called inside a
    /// tokio runtime, since it starts the live stream view.
    pub fn build(
        config: ApiConfig,
        store: Option<SharedStore>,
        verifier: Option<Arc<dyn TokenVerifier>>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        let (streams, signups) = match &store {
            Some(store) => {
                info!(backend = store.backend_name(), "Document store ready");
                (
                    StreamRepository::new(Arc::clone(store)),
                    SignupRepository::new(Arc::clone(store)),
                )
            }
            None => (StreamRepository::uninitialized(), SignupRepository::uninitialized()),
        };

        let live = Arc::new(LiveStreams::start(&streams));

        Self {
            config,
            store,
            streams,
            signups,
            live,
            verifier,
            identity,
        }
    }
}
