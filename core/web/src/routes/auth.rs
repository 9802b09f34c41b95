use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::ApiError, session::CurrentSession, state::AppState, views};

#[derive(Debug, Serialize)]
pub struct AuthStartResponse {
    pub authorize_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

pub async fn start(State(state): State<AppState>, session: CurrentSession) -> Response {
    let (authorize_url, csrf_state) = state.auth.authorization_url();
    let id = state
        .sessions
        .begin_authorization(session.id, csrf_state)
        .await;

    info!(session = %id, "Issued authorization URL");

    session.bind(Json(AuthStartResponse { authorize_url }).into_response(), id)
}

pub async fn callback(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::Text("Missing 'code' in query string.".to_string()))?;

    // Sessions that started the flow here must return the state they were given
    if let Some(id) = session.id {
        if let Some(expected) = state.sessions.take_oauth_state(id).await {
            if params.state.as_deref() != Some(expected.as_str()) {
                warn!(session = %id, "OAuth state mismatch on callback");
                return Err(ApiError::Text("Auth error: state mismatch".to_string()));
            }
        }
    }

    let tokens = state
        .auth
        .exchange_code(&code)
        .await
        .map_err(|e| ApiError::Text(format!("Auth error: {}", e)))?;

    let id = state.sessions.store_tokens(session.id, tokens).await;
    info!(session = %id, "Authorization complete");

    Ok(session.bind(Html(views::AUTH_COMPLETE_PAGE).into_response(), id))
}
