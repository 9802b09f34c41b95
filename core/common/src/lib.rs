//! Common utilities and types shared across Boxbridge crates.
//!
//! This module provides the error taxonomy used by every provider operation
//! and the small value types threaded through them.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{normalize_folder_path, AccessToken};
