use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use boxbridge_common::Error;

#[derive(Debug)]
pub enum ApiError {
    /// 401 with a JSON body.
    Unauthorized(String),
    /// 400 with a JSON body.
    BadRequest(String),
    /// 400 with a plain-text body, for browser-facing routes.
    Text(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Text(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::AuthRequired => ApiError::Unauthorized("Not authorized".to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}
