// Error taxonomy of the HTTP surface and its JSON bodies

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::api::validation::FieldErrors;
use crate::database_ops::refresh::RefreshError;
use crate::database_ops::source::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("external data source unavailable: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("country not found")]
    CountryNotFound,
    #[error("summary image not found")]
    ImageNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Upstream(e) => ApiError::Upstream(e),
            RefreshError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::CountryNotFound | ApiError::ImageNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Upstream(e) => json!({
                "error": "External data source unavailable",
                "details": e.details(),
            }),
            ApiError::Validation(fields) => json!({
                "error": "Validation failed",
                "details": fields,
            }),
            ApiError::MalformedBody(reason) => json!({
                "error": "Malformed request body",
                "details": reason,
            }),
            ApiError::CountryNotFound => json!({ "error": "Country not found" }),
            ApiError::ImageNotFound => json!({ "error": "Summary image not found" }),
            ApiError::Internal(e) => {
                // Cause stays in the logs only.
                tracing::error!(error = ?e, "request failed with internal error");
                json!({ "error": "Internal server error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::source::UpstreamApi;
    use actix_web::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn upstream_maps_to_503_with_details() {
        let (status, body) = body_of(
            UpstreamError::Status {
                api: UpstreamApi::Countries,
                status: 500,
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body,
            json!({
                "error": "External data source unavailable",
                "details": "Could not fetch data from Countries API"
            })
        );
    }

    #[actix_web::test]
    async fn internal_cause_is_not_leaked() {
        let (status, body) =
            body_of(anyhow::anyhow!("disk I/O error at /var/lib/secret.db").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[actix_web::test]
    async fn validation_lists_fields() {
        let mut fields = FieldErrors::new();
        fields.insert("name".into(), "is required".into());
        let (status, body) = body_of(ApiError::Validation(fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": "Validation failed", "details": { "name": "is required" } })
        );
    }
}
