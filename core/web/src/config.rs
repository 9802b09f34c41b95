//! Server configuration.

use chrono::Duration;
use std::path::PathBuf;

use boxbridge_dropbox::{AuthConfig, Endpoints, DEFAULT_MAX_PAGES};

/// Local file staged before each upload.
pub const DEFAULT_SCRATCH_FILE: &str = "demo.txt";
/// Idle time after which a session is forgotten.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 24 * 60;

/// Everything the HTTP front end needs to run.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// OAuth2 client credentials.
    pub auth: AuthConfig,
    /// Provider endpoint locations.
    pub endpoints: Endpoints,
    /// Local file written and read back on each upload.
    pub scratch_file: PathBuf,
    /// Upper bound on listing pages per request.
    pub max_list_pages: usize,
    /// Idle session lifetime.
    pub session_ttl: Duration,
    /// Send the session cookie with `Secure`. Off for plain-HTTP local use.
    pub secure_cookie: bool,
}

impl ServerConfig {
    /// Configuration with default endpoints and limits.
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            endpoints: Endpoints::default(),
            scratch_file: PathBuf::from(DEFAULT_SCRATCH_FILE),
            max_list_pages: DEFAULT_MAX_PAGES,
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            secure_cookie: false,
        }
    }

    /// Set provider endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the upload scratch file.
    pub fn with_scratch_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_file = path.into();
        self
    }

    /// Set the listing page bound.
    pub fn with_max_list_pages(mut self, max_pages: usize) -> Self {
        self.max_list_pages = max_pages;
        self
    }

    /// Set the idle session lifetime.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set whether the session cookie is marked `Secure`.
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }
}
