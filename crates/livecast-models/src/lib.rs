//! Shared data models for the livecast backend.
//!
//! This crate provides Serde-serializable types for:
//! - Stream records and the admin form payloads that produce them
//! - Email signups captured from the public page
//! - YouTube video-reference parsing and validation

pub mod signup;
pub mod stream;
pub mod video_ref;

// Re-export common types
pub use signup::{normalize_email, Signup, SignupError, SignupSource, SignupStatus};
pub use stream::{Stream, StreamFormData, StreamId, StreamUpdate};
pub use video_ref::{embed_url, extract_video_id, is_valid_video_id, thumbnail_url, watch_url, VIDEO_ID_LEN};
