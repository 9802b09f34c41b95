//! HTTP front end for Boxbridge.
//!
//! Exposes the provider operations behind session-gated routes. Each
//! browser session holds at most one access token, kept in memory only.

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod views;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;
pub use session::{CurrentSession, SessionId, SessionStore, SESSION_COOKIE};
pub use state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::home::index))
        .route("/api/auth/start", get(routes::auth::start))
        .route("/api/auth/callback", get(routes::auth::callback))
        .route("/api/upload", post(routes::files::upload))
        .route("/api/create-folder", post(routes::files::create_folder))
        .route("/api/list", get(routes::listing::list_json))
        .route("/list", get(routes::listing::list_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
