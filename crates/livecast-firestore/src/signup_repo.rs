//! Signup capture. Write-only: records are never read back.

use tracing::info;

use livecast_models::Signup;

use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::record_signup;
use crate::store::SharedStore;
use crate::types::{Fields, ToFirestoreValue};

pub const SIGNUPS_COLLECTION: &str = "tripSubscriptions";

#[derive(Clone)]
pub struct SignupRepository {
    store: Option<SharedStore>,
}

impl SignupRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store: Some(store) }
    }

    pub fn uninitialized() -> Self {
        Self { store: None }
    }

    /// Validate, normalize, and store an email address.
    ///
    /// The address is checked before the store, so a bad address is reported
    /// even when the database is unavailable.
    pub async fn add(&self, raw_email: &str) -> RepositoryResult<Signup> {
        let signup = Signup::from_website(raw_email)
            .map_err(|e| RepositoryError::InvalidInput(e.to_string()))?;
        let store = self.store.as_ref().ok_or(RepositoryError::NotInitialized)?;

        let mut fields = Fields::new();
        fields.insert("email".into(), signup.email.to_firestore_value());
        fields.insert("createdAt".into(), signup.created_at.to_firestore_value());
        fields.insert("status".into(), signup.status.as_str().to_firestore_value());
        fields.insert("source".into(), signup.source.as_str().to_firestore_value());

        let doc = store.add_document(SIGNUPS_COLLECTION, fields).await?;
        record_signup();
        info!(signup_id = doc.id().unwrap_or_default(), "Signup stored");
        Ok(signup)
    }
}
