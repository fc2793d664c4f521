//! Axum HTTP API server.
//!
//! This crate provides:
//! - Public read endpoints backed by the live stream view
//! - Admin stream management behind Firebase ID token verification
//! - Email signup capture and email/password sign-in
//! - A WebSocket feed of the stream list
//! - Security headers, request IDs, and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod ws;

pub use auth::{AdminUser, AuthUser, FirebaseClaims, JwksCache, TokenVerifier};
pub use config::{ApiConfig, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use form::{AdminFormController, FormError, StreamWriter, SubmitOutcome};
pub use identity::{FirebaseIdentity, IdentityError, IdentityProvider, SessionUser, SignedIn};
pub use routes::create_router;
pub use session::{Session, SessionError, SessionState};
pub use state::AppState;
