//! Dropbox API client.

use bytes::Bytes;
use reqwest::{header, Client, Response, StatusCode};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;
use tracing::{debug, info, warn};

use boxbridge_common::{AccessToken, Error, Result};

use crate::endpoints::Endpoints;
use crate::listing::{
    ListFolderArg, ListFolderContinueArg, ListFolderPage, ListFolderRequest, ListingEntry,
    RawEntry,
};

/// Content-upload endpoint path.
const UPLOAD_PATH: &str = "/2/files/upload";
/// Folder-creation endpoint path.
const CREATE_FOLDER_PATH: &str = "/2/files/create_folder_v2";
/// Initial listing endpoint path.
const LIST_FOLDER_PATH: &str = "/2/files/list_folder";
/// Listing continuation endpoint path.
const LIST_FOLDER_CONTINUE_PATH: &str = "/2/files/list_folder/continue";

/// Header carrying upload arguments as JSON.
const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Upper bound on listing pages fetched for one call.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Body of the fixed demo file.
pub const DEMO_PAYLOAD: &[u8] =
    b"StudyStart JYU Task 2.2\nPOST Implementation\nSuccessfully uploaded via POST method";

/// Marker returned in place of folder metadata when creation is refused.
const FOLDER_EXISTS_STATUS: &str = "folder_exists";

/// File metadata returned by the upload endpoint.
///
/// Known fields are typed; anything else the provider sends is kept in
/// `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_lower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Folder metadata returned by the folder-creation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_lower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Successful folder-creation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedFolder {
    pub metadata: FolderMetadata,
}

/// Result of a folder creation.
///
/// Any non-200 answer becomes `AlreadyExists`, since a path collision is the
/// only anticipated rejection. This also hides expired tokens and malformed
/// paths; the real status is logged at WARN.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateFolderOutcome {
    Created(CreatedFolder),
    AlreadyExists,
}

impl Serialize for CreateFolderOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CreateFolderOutcome::Created(folder) => folder.serialize(serializer),
            CreateFolderOutcome::AlreadyExists => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("status", FOLDER_EXISTS_STATUS)?;
                map.end()
            }
        }
    }
}

/// Arguments of an upload, sent in the [`API_ARG_HEADER`] header.
#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'a str,
    autorename: bool,
}

/// Body of a folder creation.
#[derive(Debug, Serialize)]
struct CreateFolderArg<'a> {
    path: &'a str,
}

/// Return the token or fail with `AuthRequired`.
pub fn require_token(token: Option<&AccessToken>) -> Result<&AccessToken> {
    token.ok_or(Error::AuthRequired)
}

/// Write `content` to a local scratch file, replacing what was there.
pub async fn stage_file(path: &Path, content: &[u8]) -> Result<()> {
    tokio::fs::write(path, content).await?;
    debug!(path = %path.display(), bytes = content.len(), "Staged local file");
    Ok(())
}

/// Serialize `value` as JSON that is safe to put in an HTTP header.
///
/// Non-ASCII characters are written as `\uXXXX` escapes of their UTF-16
/// code units.
fn header_safe_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)
        .map_err(|e| Error::Serialization(format!("Failed to serialize arguments: {}", e)))?;

    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(escaped)
}

/// Dropbox API client.
///
/// Stateless with respect to users: every call takes the access token.
pub struct DropboxClient {
    http: Client,
    endpoints: Endpoints,
    max_pages: usize,
}

impl DropboxClient {
    /// Create a new Dropbox client.
    ///
    /// # Errors
    /// - Unparsable endpoint URL
    /// - HTTP client construction failure
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        endpoints.validate()?;

        let http = Client::builder()
            .user_agent(concat!("Boxbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoints,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    /// Set the most listing pages fetched per call.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Get the configured endpoints.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Upload a local file.
    ///
    /// Reads `local_file` and posts its bytes to `dropbox_path`.
    ///
    /// # Errors
    /// - `AuthRequired` if no token is given, before touching the file
    /// - `Io` if the local file cannot be read
    /// - see [`DropboxClient::upload_bytes`]
    pub async fn upload_file(
        &self,
        token: Option<&AccessToken>,
        local_file: &Path,
        dropbox_path: &str,
    ) -> Result<FileMetadata> {
        let token = require_token(token)?;
        let data = tokio::fs::read(local_file).await?;

        self.upload_bytes(Some(token), dropbox_path, Bytes::from(data))
            .await
    }

    /// Upload raw bytes.
    ///
    /// Conflict mode is `add` with autorename, so an existing file is never
    /// overwritten.
    ///
    /// # Errors
    /// - `AuthRequired` if no token is given
    /// - `InvalidInput` for an empty destination path
    /// - `Upload` carrying status and body for any non-200 answer
    /// - `Network` when the endpoint cannot be reached
    pub async fn upload_bytes(
        &self,
        token: Option<&AccessToken>,
        dropbox_path: &str,
        data: Bytes,
    ) -> Result<FileMetadata> {
        let token = require_token(token)?;
        if dropbox_path.is_empty() {
            return Err(Error::InvalidInput(
                "Destination path cannot be empty".to_string(),
            ));
        }

        let arg = header_safe_json(&UploadArg {
            path: dropbox_path,
            mode: "add",
            autorename: true,
        })?;

        debug!(path = dropbox_path, bytes = data.len(), "Uploading file");

        let response = self
            .http
            .post(self.endpoints.content(UPLOAD_PATH))
            .header(header::AUTHORIZATION, token.bearer())
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(API_ARG_HEADER, arg)
            .body(data)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload file: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Upload rejected");
            return Err(Error::Upload {
                status: status.as_u16(),
                body,
            });
        }

        let metadata: FileMetadata = parse_json(response).await?;
        info!(name = %metadata.name, "File uploaded");

        Ok(metadata)
    }

    /// Create a folder.
    ///
    /// # Postconditions
    /// - `Created` with the new folder's metadata on HTTP 200
    /// - `AlreadyExists` on any other status
    ///
    /// # Errors
    /// - `AuthRequired` if no token is given
    /// - `InvalidInput` for an empty path
    /// - `Network` when the endpoint cannot be reached
    pub async fn create_folder(
        &self,
        token: Option<&AccessToken>,
        folder_path: &str,
    ) -> Result<CreateFolderOutcome> {
        let token = require_token(token)?;
        if folder_path.is_empty() {
            return Err(Error::InvalidInput(
                "Folder path cannot be empty".to_string(),
            ));
        }

        debug!(path = folder_path, "Creating folder");

        let response = self
            .post_json(
                token,
                &self.endpoints.api(CREATE_FOLDER_PATH),
                &CreateFolderArg { path: folder_path },
            )
            .await
            .map_err(|e| Error::Network(format!("Failed to create folder: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                status = status.as_u16(),
                path = folder_path,
                "Folder creation refused, reporting it as existing"
            );
            return Ok(CreateFolderOutcome::AlreadyExists);
        }

        let created: CreatedFolder = parse_json(response).await?;
        info!(name = %created.metadata.name, "Folder created");

        Ok(CreateFolderOutcome::Created(created))
    }

    /// List a folder, following continuation cursors until exhausted.
    ///
    /// Entries keep the provider's order, concatenated across pages.
    ///
    /// # Preconditions
    /// - `request.path` is in provider form (see [`ListFolderRequest::new`])
    ///
    /// # Postconditions
    /// - One initial call plus one call per continuation page
    ///
    /// # Errors
    /// - `AuthRequired` if no token is given, before any request is made
    /// - `List` carrying status and body for any non-200 page
    /// - `PageLimitExceeded` when the page bound is reached with more pending
    /// - `Network` when the endpoint cannot be reached
    pub async fn list_folder(
        &self,
        token: Option<&AccessToken>,
        request: &ListFolderRequest,
    ) -> Result<Vec<ListingEntry>> {
        let token = require_token(token)?;

        debug!(
            path = %request.path,
            recursive = request.recursive,
            "Listing folder"
        );

        let mut page: ListFolderPage = self
            .fetch_page(
                token,
                &self.endpoints.api(LIST_FOLDER_PATH),
                &ListFolderArg {
                    path: &request.path,
                    recursive: request.recursive,
                    include_deleted: false,
                },
            )
            .await?;

        let mut raw_entries: Vec<RawEntry> = Vec::new();
        let mut pages = 1usize;

        loop {
            let ListFolderPage {
                entries,
                cursor,
                has_more,
            } = page;
            debug!(page = pages, entries = entries.len(), has_more, "Fetched listing page");
            raw_entries.extend(entries);

            if !has_more {
                break;
            }

            let cursor = cursor.ok_or_else(|| {
                Error::Serialization("Listing reported more pages without a cursor".to_string())
            })?;

            if pages >= self.max_pages {
                warn!(max_pages = self.max_pages, "Listing page bound reached");
                return Err(Error::PageLimitExceeded(self.max_pages));
            }

            page = self
                .fetch_page(
                    token,
                    &self.endpoints.api(LIST_FOLDER_CONTINUE_PATH),
                    &ListFolderContinueArg { cursor: &cursor },
                )
                .await?;
            pages += 1;
        }

        info!(entries = raw_entries.len(), pages, "Folder listed");

        Ok(raw_entries.into_iter().map(ListingEntry::from).collect())
    }

    /// Fetch one listing page, failing with `List` on any non-200 answer.
    async fn fetch_page<B: Serialize>(
        &self,
        token: &AccessToken,
        url: &str,
        body: &B,
    ) -> Result<ListFolderPage> {
        let response = self
            .post_json(token, url, body)
            .await
            .map_err(|e| Error::Network(format!("Failed to list folder: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), url, "Listing rejected");
            return Err(Error::List {
                status: status.as_u16(),
                body,
            });
        }

        parse_json(response).await
    }

    /// Send an authorized JSON POST.
    async fn post_json<B: Serialize>(
        &self,
        token: &AccessToken,
        url: &str,
        body: &B,
    ) -> reqwest::Result<Response> {
        self.http
            .post(url)
            .header(header::AUTHORIZATION, token.bearer())
            .json(body)
            .send()
            .await
    }
}

/// Decode a successful response body.
async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)))
}
