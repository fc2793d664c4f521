//! Email signups captured from the public page.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignupError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignupStatus {
    #[default]
    Active,
}

impl SignupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupStatus::Active => "active",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignupSource {
    #[default]
    Website,
}

impl SignupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupSource::Website => "website",
        }
    }
}

/// A stored signup record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Signup {
    /// Lowercased, trimmed address
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: SignupStatus,
    #[serde(default)]
    pub source: SignupSource,
}

impl Signup {
    /// Build a website signup from raw user input.
    pub fn from_website(raw_email: &str) -> Result<Self, SignupError> {
        Ok(Self {
            email: normalize_email(raw_email)?,
            created_at: Utc::now(),
            status: SignupStatus::Active,
            source: SignupSource::Website,
        })
    }
}

/// Trim and lowercase an address, rejecting anything without an `@`.
///
/// This is deliberately loose; deliverability is not checked.
pub fn normalize_email(raw: &str) -> Result<String, SignupError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(SignupError::InvalidEmail);
    }
    Ok(trimmed.to_lowercase())
}
