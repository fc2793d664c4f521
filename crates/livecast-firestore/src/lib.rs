//! Firestore REST client and stream persistence.
//!
//! This crate provides:
//! - A Firestore REST client with service-account auth, retry, and metrics
//! - A `DocumentStore` seam with Firestore and in-memory implementations
//! - Live collection queries built on the store's change feed
//! - Stream and signup repositories
//! - `LiveStreams`, a live view of all streams with active-stream selection

pub mod client;
pub mod error;
pub mod listen;
pub mod live_view;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod signup_repo;
pub mod store;
pub mod stream_repo;
pub mod token_cache;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult, RepositoryError, RepositoryResult};
pub use listen::{listen, Subscription};
pub use live_view::{LiveState, LiveStatus, LiveStreams};
pub use memory::MemoryStore;
pub use signup_repo::{SignupRepository, SIGNUPS_COLLECTION};
pub use store::{CollectionQuery, DocumentStore, FirestoreStore, SharedStore};
pub use stream_repo::{StreamRepository, STREAMS_COLLECTION};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
