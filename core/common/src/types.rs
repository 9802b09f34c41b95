//! Common types used throughout Boxbridge.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bearer credential authorizing provider API calls.
///
/// The secret is zeroized when dropped and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token string.
    ///
    /// # Errors
    /// - Returns error if the token is empty
    pub fn new(token: impl Into<String>) -> crate::Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Access token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the secret value.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken([REDACTED])")
    }
}

/// Map a folder path to the provider's representation.
///
/// The provider addresses its root as the empty string, so both `""` and
/// `"/"` become `""`. Any other path is passed through untouched.
pub fn normalize_folder_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        String::new()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_creation() {
        let token = AccessToken::new("sl.abc").unwrap();
        assert_eq!(token.secret(), "sl.abc");
        assert_eq!(token.bearer(), "Bearer sl.abc");
    }

    #[test]
    fn test_access_token_empty_fails() {
        assert!(AccessToken::new("").is_err());
    }

    #[test]
    fn test_access_token_debug_redacted() {
        let token = AccessToken::new("super-secret").unwrap();
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_access_token_transparent_serde() {
        let token: AccessToken = serde_json::from_str("\"sl.xyz\"").unwrap();
        assert_eq!(token.secret(), "sl.xyz");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"sl.xyz\"");
    }

    #[test]
    fn test_root_paths_normalize_identically() {
        assert_eq!(normalize_folder_path(""), "");
        assert_eq!(normalize_folder_path("/"), "");
        assert_eq!(normalize_folder_path(""), normalize_folder_path("/"));
    }

    #[test]
    fn test_non_root_path_unchanged() {
        assert_eq!(normalize_folder_path("/Photos"), "/Photos");
        assert_eq!(normalize_folder_path("/Photos/"), "/Photos/");
    }

    mod prop {
        use super::super::normalize_folder_path;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_normalize_is_identity_off_root(path in "/[A-Za-z0-9_ ]{1,24}(/[A-Za-z0-9_ ]{1,24}){0,3}") {
                prop_assert_eq!(normalize_folder_path(&path), path);
            }
        }
    }
}
