// API request/response models (DTOs)

use serde::{Deserialize, Serialize};

/// Query string of `GET /countries`. Values stay raw so that unknown sort
/// keys and empty filters can be ignored instead of rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    pub total_countries: i64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}
