pub mod genre;
pub mod movie;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Record ids travel in the query string, not the path.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: String,
}

pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::Validation(serde_json::json!([
            { "field": "id", "message": "not a valid UUID" }
        ]))
    })
}
