//! Email/password accounts over the Firebase Identity Toolkit REST API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Public Identity Toolkit endpoint.
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account has been disabled")]
    UserDisabled,

    #[error("An account with this email already exists")]
    EmailExists,

    #[error("Password must be at least 6 characters")]
    WeakPassword,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    #[error("Firebase not initialized")]
    NotConfigured,

    #[error("{0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl IdentityError {
    /// Map an Identity Toolkit error code such as `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn from_code(message: &str) -> Self {
        let code = message.split([' ', ':']).next().unwrap_or_default();
        match code {
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                IdentityError::InvalidCredentials
            }
            "USER_DISABLED" => IdentityError::UserDisabled,
            "EMAIL_EXISTS" => IdentityError::EmailExists,
            "WEAK_PASSWORD" => IdentityError::WeakPassword,
            "INVALID_EMAIL" | "MISSING_EMAIL" => IdentityError::InvalidEmail,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityError::TooManyAttempts,
            _ => IdentityError::Provider(message.to_string()),
        }
    }
}

/// Signed-in account as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub uid: String,
    pub email: Option<String>,
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
    pub user: SessionUser,
    /// Firebase ID token, sent back as a bearer token on admin requests.
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Account backend used by the session and the auth endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError>;

    /// Ends the account's session with the provider. Token-based providers
    /// have nothing to revoke.
    async fn sign_out(&self, user: &SessionUser) -> Result<(), IdentityError>;

    /// Previously persisted sign-in, if the provider keeps one.
    async fn restore(&self) -> Result<Option<SignedIn>, IdentityError>;
}

/// Identity Toolkit client.
#[derive(Clone)]
pub struct FirebaseIdentity {
    http: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    /// Seconds, sent as a string.
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: impl Into<String>) -> Result<Self, IdentityError> {
        Self::with_base_url(api_key, IDENTITY_TOOLKIT_URL)
    }

    /// Point the client somewhere other than Google, such as the auth emulator.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, IdentityError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn password_call(&self, action: &str, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        let url = format!("{}/accounts:{}", self.base_url, action);
        let start = Instant::now();

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        debug!(action, status = status.as_u16(), duration_ms = start.elapsed().as_millis() as u64, "Identity Toolkit call");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => IdentityError::from_code(&envelope.error.message),
                Err(_) => IdentityError::Provider(format!("HTTP {}: {}", status.as_u16(), body)),
            };
            warn!(action, error = %err, "Identity Toolkit rejected request");
            return Err(err);
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(format!("Invalid response: {}", e)))?;

        Ok(SignedIn {
            user: SessionUser {
                uid: body.local_id,
                email: body.email.or_else(|| Some(email.to_string())),
            },
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in: body
                .expires_in
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        let signed_in = self.password_call("signInWithPassword", email, password).await?;
        info!(uid = %signed_in.user.uid, "User signed in");
        Ok(signed_in)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        let signed_in = self.password_call("signUp", email, password).await?;
        info!(uid = %signed_in.user.uid, "Account created");
        Ok(signed_in)
    }

    async fn sign_out(&self, user: &SessionUser) -> Result<(), IdentityError> {
        debug!(uid = %user.uid, "Sign-out needs no provider call");
        Ok(())
    }

    async fn restore(&self) -> Result<Option<SignedIn>, IdentityError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn identity(server: &MockServer) -> FirebaseIdentity {
        FirebaseIdentity::with_base_url("test-key", format!("{}/v1", server.uri())).unwrap()
    }

    #[test]
    fn test_error_codes() {
        assert!(matches!(IdentityError::from_code("EMAIL_NOT_FOUND"), IdentityError::InvalidCredentials));
        assert!(matches!(
            IdentityError::from_code("INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(IdentityError::from_code("EMAIL_EXISTS"), IdentityError::EmailExists));
        assert!(matches!(
            IdentityError::from_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            IdentityError::WeakPassword
        ));
        match IdentityError::from_code("OPERATION_NOT_ALLOWED") {
            IdentityError::Provider(msg) => assert_eq!(msg, "OPERATION_NOT_ALLOWED"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sign_in_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "email": "admin@example.com",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-1",
                "email": "admin@example.com",
                "idToken": "id-token",
                "refreshToken": "refresh-token",
                "expiresIn": "3600"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let signed_in = identity(&server)
            .await
            .sign_in("admin@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(signed_in.user.uid, "uid-1");
        assert_eq!(signed_in.id_token, "id-token");
        assert_eq!(signed_in.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_sign_in_bad_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "INVALID_PASSWORD" }
            })))
            .mount(&server)
            .await;

        let err = identity(&server)
            .await
            .sign_in("admin@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_up_existing_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "EMAIL_EXISTS" }
            })))
            .mount(&server)
            .await;

        let err = identity(&server)
            .await
            .sign_up("admin@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailExists));
    }

    #[tokio::test]
    async fn test_unparseable_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = identity(&server)
            .await
            .sign_up("admin@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }
}
