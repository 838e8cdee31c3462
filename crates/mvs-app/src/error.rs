use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use tracing::error;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(serde_json::Value),

    #[error("Record not found")]
    NotFound,

    #[error("Conflict on {0}")]
    Conflict(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<mvs_dal::Error> for ApiError {
    fn from(error: mvs_dal::Error) -> Self {
        match error {
            mvs_dal::Error::RecordNotFound(_) => ApiError::NotFound,
            mvs_dal::Error::UniqueViolation(what) => ApiError::Conflict(what),
            other => ApiError::Internal(other.into()),
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorModel {
    pub code: &'static str,
    pub status: u16,
    #[serde(rename = "metaData", skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, meta_data) = match self {
            ApiError::Validation(report) => {
                (StatusCode::BAD_REQUEST, "ValidationError", Some(report))
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NotFound", None),
            ApiError::Conflict(what) => (
                StatusCode::CONFLICT,
                "Conflict",
                Some(serde_json::Value::String(what)),
            ),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthenticated", None),
            ApiError::Internal(cause) => {
                // cause stays in the server log, the client gets the generic shape
                error!("Internal server error: {cause:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "UnknownError", None)
            }
        };

        let body = ErrorModel {
            code,
            status: status.as_u16(),
            meta_data,
        };
        (status, axum::Json(body)).into_response()
    }
}
