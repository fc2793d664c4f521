//! API configuration.

use std::time::Duration;

/// Which document store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store; data is lost on restart.
    Memory,
}

impl StoreBackend {
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => StoreBackend::Memory,
            _ => StoreBackend::Firestore,
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    pub store_backend: StoreBackend,
    /// Accounts allowed to administer streams. Empty means any signed-in user.
    pub admin_emails: Vec<String>,
    /// Web API key for the Identity Toolkit endpoints.
    pub firebase_api_key: Option<String>,
    /// Project used to validate ID tokens.
    pub project_id: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            store_backend: StoreBackend::Firestore,
            admin_emails: Vec::new(),
            firebase_api_key: None,
            project_id: None,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors_origins),
            request_timeout: std::env::var("REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            store_backend: std::env::var("STORE_BACKEND")
                .map(|s| StoreBackend::parse(&s))
                .unwrap_or(defaults.store_backend),
            admin_emails: std::env::var("ADMIN_EMAILS")
                .map(|s| {
                    split_list(&s)
                        .into_iter()
                        .map(|e| e.to_lowercase())
                        .collect()
                })
                .unwrap_or_default(),
            firebase_api_key: non_empty_var("FIREBASE_API_KEY"),
            project_id: non_empty_var("FIREBASE_PROJECT_ID").or_else(|| non_empty_var("GCP_PROJECT_ID")),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Whether `email` may use the admin endpoints.
    pub fn is_admin_email(&self, email: Option<&str>) -> bool {
        if self.admin_emails.is_empty() {
            return true;
        }
        email
            .map(|e| e.trim().to_lowercase())
            .is_some_and(|e| self.admin_emails.iter().any(|a| *a == e))
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
