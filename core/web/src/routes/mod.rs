pub mod auth;
pub mod files;
pub mod home;
pub mod listing;
