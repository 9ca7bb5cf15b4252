//! DTOs for the shortening endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::BatchEntry;

/// Request body of `POST /api/shorten`.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    #[validate(length(min = 1, message = "URL must not be empty"))]
    pub url: String,
}

/// Response body of `POST /api/shorten`, on success and on conflict.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

/// One entry of `POST /api/shorten/batch`.
#[derive(Debug, Deserialize, Validate)]
pub struct BatchRequestItem {
    #[validate(length(min = 1, message = "correlation_id must not be empty"))]
    pub correlation_id: String,
    #[validate(length(min = 1, message = "original_url must not be empty"))]
    pub original_url: String,
}

impl From<BatchRequestItem> for BatchEntry {
    fn from(item: BatchRequestItem) -> Self {
        Self {
            correlation_id: item.correlation_id,
            original: item.original_url,
        }
    }
}

/// One entry of the batch response.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}
