//! Dropbox integration for Boxbridge.
//!
//! This module talks to the provider's HTTP API on a user's behalf:
//! - OAuth2 authorization-code exchange
//! - Binary file upload with autorename on collision
//! - Folder creation that tolerates an existing folder
//! - Paginated folder listing flattened into [`ListingEntry`] records
//!
//! Every operation takes the access token explicitly; nothing here holds
//! per-user state between calls.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod listing;

pub use auth::{AuthConfig, AuthManager, Tokens};
pub use client::{
    require_token, stage_file, CreateFolderOutcome, CreatedFolder, DropboxClient, FileMetadata,
    FolderMetadata, DEFAULT_MAX_PAGES, DEMO_PAYLOAD,
};
pub use endpoints::Endpoints;
pub use listing::{EntryTag, FileDetails, ListFolderPage, ListFolderRequest, ListingEntry, RawEntry};
