use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};

use boxbridge_dropbox::{ListFolderRequest, ListingEntry};

use crate::{error::ApiError, session::CurrentSession, state::AppState, views};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub path: Option<String>,
    pub recursive: Option<String>,
}

impl ListParams {
    fn path(&self) -> &str {
        self.path.as_deref().unwrap_or("/")
    }

    fn is_recursive(&self) -> bool {
        self.recursive
            .as_deref()
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    fn request(&self) -> ListFolderRequest {
        ListFolderRequest::new(self.path()).recursive(self.is_recursive())
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub entries: Vec<ListingEntry>,
}

pub async fn list_page(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, ApiError> {
    let entries = state
        .dropbox
        .list_folder(session.access_token.as_ref(), &params.request())
        .await
        .map_err(|e| ApiError::Text(format!("List error: {}", e)))?;

    Ok(Html(views::listing_page(
        params.path(),
        params.is_recursive(),
        &entries,
    )))
}

pub async fn list_json(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let entries = state
        .dropbox
        .list_folder(session.access_token.as_ref(), &params.request())
        .await?;

    Ok(Json(ListResponse { entries }))
}
