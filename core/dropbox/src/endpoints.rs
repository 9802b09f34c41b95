//! Provider endpoint locations.

use serde::{Deserialize, Serialize};
use url::Url;

use boxbridge_common::{Error, Result};

/// OAuth2 authorization endpoint.
const DROPBOX_AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";
/// OAuth2 token endpoint.
const DROPBOX_TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";
/// RPC-style API host.
const DROPBOX_API_BASE: &str = "https://api.dropboxapi.com";
/// Content (upload/download) API host.
const DROPBOX_CONTENT_BASE: &str = "https://content.dropboxapi.com";

/// Where each provider call is sent.
///
/// Defaults to the public Dropbox hosts. Tests point every field at a
/// local mock server with [`Endpoints::with_base`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
    pub content_base: String,
}

impl Endpoints {
    /// Route every call to a single base URL.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{}/oauth2/authorize", base),
            token_url: format!("{}/oauth2/token", base),
            api_base: base.to_string(),
            content_base: base.to_string(),
        }
    }

    /// Check that every endpoint is an absolute URL.
    ///
    /// # Errors
    /// - Returns `InvalidInput` naming the first unparsable endpoint
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("authorize_url", &self.authorize_url),
            ("token_url", &self.token_url),
            ("api_base", &self.api_base),
            ("content_base", &self.content_base),
        ] {
            Url::parse(value)
                .map_err(|e| Error::InvalidInput(format!("Invalid {}: {}", name, e)))?;
        }
        Ok(())
    }

    /// URL of an RPC endpoint such as `/2/files/list_folder`.
    pub fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    /// URL of a content endpoint such as `/2/files/upload`.
    pub fn content(&self, path: &str) -> String {
        format!("{}{}", self.content_base.trim_end_matches('/'), path)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: DROPBOX_AUTHORIZE_URL.to_string(),
            token_url: DROPBOX_TOKEN_URL.to_string(),
            api_base: DROPBOX_API_BASE.to_string(),
            content_base: DROPBOX_CONTENT_BASE.to_string(),
        }
    }
}
