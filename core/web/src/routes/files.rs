use axum::{body::Bytes, extract::State, Json};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::info;

use boxbridge_common::AccessToken;
use boxbridge_dropbox::{stage_file, CreateFolderOutcome, FileMetadata, DEMO_PAYLOAD};

use crate::{error::ApiError, session::CurrentSession, state::AppState};

/// Upload destination used when the request names none.
pub const DEFAULT_UPLOAD_PATH: &str = "/StudyStart_Task_2_2/demo.txt";
/// Folder created when the request names none.
pub const DEFAULT_FOLDER_PATH: &str = "/StudyStart_Task_2_2";

#[derive(Debug, Default, Deserialize)]
pub struct UploadRequest {
    pub dropbox_path: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateFolderRequest {
    pub folder_path: Option<String>,
}

/// Decode a JSON body, treating a missing or malformed body as empty.
fn lenient_json<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

fn authorized(session: &CurrentSession) -> Result<&AccessToken, ApiError> {
    session
        .access_token
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("Not authorized".to_string()))
}

pub async fn upload(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Bytes,
) -> Result<Json<FileMetadata>, ApiError> {
    let token = authorized(&session)?;
    let request: UploadRequest = lenient_json(&body);

    let dropbox_path = request
        .dropbox_path
        .unwrap_or_else(|| DEFAULT_UPLOAD_PATH.to_string());
    let content = request
        .content
        .as_deref()
        .map(str::as_bytes)
        .unwrap_or(DEMO_PAYLOAD);

    let scratch = &state.config.scratch_file;
    let _guard = state.upload_lock.lock().await;

    stage_file(scratch, content).await?;
    let metadata = state
        .dropbox
        .upload_file(Some(token), scratch, &dropbox_path)
        .await?;

    info!(path = %dropbox_path, "Upload request served");
    Ok(Json(metadata))
}

pub async fn create_folder(
    State(state): State<AppState>,
    session: CurrentSession,
    body: Bytes,
) -> Result<Json<CreateFolderOutcome>, ApiError> {
    let token = authorized(&session)?;
    let request: CreateFolderRequest = lenient_json(&body);

    let folder_path = request
        .folder_path
        .unwrap_or_else(|| DEFAULT_FOLDER_PATH.to_string());

    let outcome = state
        .dropbox
        .create_folder(Some(token), &folder_path)
        .await?;

    Ok(Json(outcome))
}
