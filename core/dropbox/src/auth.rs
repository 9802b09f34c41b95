//! OAuth2 authorization-code flow for Dropbox.

use chrono::{DateTime, Duration, Utc};
use oauth2::{basic::BasicClient, AuthUrl, ClientId, CsrfToken, RedirectUrl};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use boxbridge_common::{AccessToken, Error, Result};

use crate::endpoints::Endpoints;

/// OAuth2 tokens returned by the token endpoint.
#[derive(Clone)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: AccessToken,
    /// Token type, normally `bearer`.
    pub token_type: String,
    /// When the access token expires, if the provider said so.
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token, only issued for offline access.
    pub refresh_token: Option<String>,
    /// Provider account identifier.
    pub account_id: Option<String>,
    /// Legacy user identifier.
    pub uid: Option<String>,
    /// Granted scopes, space separated.
    pub scope: Option<String>,
}

impl Tokens {
    /// Check if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        // Consider expired if less than 5 minutes remaining
        self.expires_at
            .is_some_and(|at| at < Utc::now() + Duration::minutes(5))
    }

    fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Result<Self> {
        let access_token = AccessToken::new(response.access_token).map_err(|_| {
            Error::Serialization("Token response carried an empty access token".to_string())
        })?;

        Ok(Self {
            access_token,
            token_type: response.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at: response
                .expires_in
                .map(|secs| issued_at + Duration::seconds(secs)),
            refresh_token: response.refresh_token,
            account_id: response.account_id,
            uid: response.uid,
            scope: response.scope,
        })
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &self.access_token)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// Wire shape of a successful token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Configuration for OAuth2 authentication.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// App key issued by the provider.
    pub client_id: String,
    /// App secret issued by the provider.
    pub client_secret: String,
    /// Redirect URI registered with the provider.
    pub redirect_uri: String,
}

impl AuthConfig {
    /// Check that every credential is present.
    ///
    /// # Errors
    /// - Returns `InvalidInput` naming the first empty field
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// OAuth2 authentication manager for Dropbox.
pub struct AuthManager {
    http: Client,
    config: AuthConfig,
    auth_url: AuthUrl,
    redirect_url: RedirectUrl,
    token_url: String,
}

impl AuthManager {
    /// Create a new authentication manager.
    ///
    /// # Errors
    /// - Empty client id, secret or redirect URI
    /// - Unparsable authorize, token or redirect URL
    pub fn new(config: AuthConfig, endpoints: &Endpoints) -> Result<Self> {
        config.validate()?;
        endpoints.validate()?;

        let auth_url = AuthUrl::new(endpoints.authorize_url.clone())
            .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| Error::InvalidInput(format!("Invalid redirect URL: {}", e)))?;

        let http = Client::builder()
            .user_agent(concat!("Boxbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            auth_url,
            redirect_url,
            token_url: endpoints.token_url.clone(),
        })
    }

    /// Generate the authorization URL for the user to visit.
    ///
    /// Returns the URL and a CSRF state that should be verified on callback.
    pub fn authorization_url(&self) -> (String, String) {
        let client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let (auth_url, csrf_token) = client.authorize_url(CsrfToken::new_random).url();

        (auth_url.to_string(), csrf_token.secret().clone())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Sends one form-encoded POST carrying the client credentials.
    ///
    /// # Preconditions
    /// - `code` is the non-empty authorization code from the callback
    ///
    /// # Errors
    /// - `InvalidInput` for an empty code, before any request is made
    /// - `Auth` carrying the status for any non-200 answer
    /// - `Network` when the endpoint cannot be reached
    pub async fn exchange_code(&self, code: &str) -> Result<Tokens> {
        if code.is_empty() {
            return Err(Error::InvalidInput(
                "Authorization code cannot be empty".to_string(),
            ));
        }

        let params = [
            ("code", code),
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        debug!("Requesting access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Token request rejected");
            return Err(Error::Auth {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse token response: {}", e)))?;

        let tokens = Tokens::from_response(body, Utc::now())?;
        info!(account_id = ?tokens.account_id, "Access token obtained");

        Ok(tokens)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
