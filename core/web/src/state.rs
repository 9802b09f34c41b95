//! Shared application state.

use std::sync::Arc;
use tokio::sync::Mutex;

use boxbridge_common::Result;
use boxbridge_dropbox::{AuthManager, DropboxClient};

use crate::config::ServerConfig;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub auth: Arc<AuthManager>,
    pub dropbox: Arc<DropboxClient>,
    pub sessions: Arc<SessionStore>,
    /// Serializes writes to the shared upload scratch file.
    pub upload_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// # Errors
    /// - Missing client credentials or invalid endpoint URLs
    pub fn new(config: ServerConfig) -> Result<Self> {
        let auth = Arc::new(AuthManager::new(config.auth.clone(), &config.endpoints)?);
        let dropbox = Arc::new(
            DropboxClient::new(config.endpoints.clone())?.with_max_pages(config.max_list_pages),
        );
        let sessions = Arc::new(SessionStore::new(config.session_ttl));

        Ok(Self {
            config: Arc::new(config),
            auth,
            dropbox,
            sessions,
            upload_lock: Arc::new(Mutex::new(())),
        })
    }
}
