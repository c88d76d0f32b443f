// HTTP request handlers for the country endpoints

use actix_web::{http::header, web, HttpResponse};
use serde_json::Value;
use std::io::ErrorKind;

use crate::api::error::ApiError;
use crate::api::models::{HealthResponse, ListQuery, RefreshResponse};
use crate::api::state::AppState;
use crate::api::validation::{validate_new_country, FieldErrors};
use crate::database_ops::countries::{CountryFilter, InsertOutcome, SortOrder};
use crate::database_ops::reconcile::RandomMultiplier;

type ApiResult = Result<HttpResponse, ApiError>;

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> ApiResult {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "health probe could not reach database");
            "disconnected"
        }
    };

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Pull both upstreams and rebuild the table, status row and summary image.
pub async fn refresh_countries(state: web::Data<AppState>) -> ApiResult {
    tracing::info!("refresh requested");
    let outcome = state
        .refresh
        .run(&mut RandomMultiplier::from_entropy())
        .await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        message: "Countries refreshed successfully".to_string(),
        total_countries: outcome.total_countries,
    }))
}

pub async fn list_countries(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult {
    let ListQuery {
        region,
        currency,
        sort,
    } = query.into_inner();
    let filter = CountryFilter {
        region,
        currency,
        sort: sort.as_deref().and_then(SortOrder::parse),
    };

    let rows = state.db.list_countries(&filter).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Manual create. Exchange rate and estimated GDP are never taken from the body.
pub async fn create_country(state: web::Data<AppState>, body: web::Json<Value>) -> ApiResult {
    let new = validate_new_country(&body).map_err(ApiError::Validation)?;

    match state.db.insert_country(&new).await? {
        InsertOutcome::Created(row) => {
            tracing::info!(id = row.id, name = %row.name, "country created");
            Ok(HttpResponse::Created().json(row))
        }
        InsertOutcome::DuplicateName => {
            let mut errors = FieldErrors::new();
            errors.insert(
                "name".into(),
                "country with this name already exists".into(),
            );
            Err(ApiError::Validation(errors))
        }
    }
}

pub async fn get_country(state: web::Data<AppState>, name: web::Path<String>) -> ApiResult {
    match state.db.find_country(&name).await? {
        Some(row) => Ok(HttpResponse::Ok().json(row)),
        None => Err(ApiError::CountryNotFound),
    }
}

pub async fn delete_country(state: web::Data<AppState>, name: web::Path<String>) -> ApiResult {
    if state.db.delete_country(&name).await? {
        tracing::info!(name = %name, "country deleted");
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::CountryNotFound)
    }
}

pub async fn refresh_status(state: web::Data<AppState>) -> ApiResult {
    let status = state.db.refresh_status().await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Serve the last rendered summary as `image/png`.
pub async fn summary_image(state: web::Data<AppState>) -> ApiResult {
    let path = state.summary_path();
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "image/png"))
            .insert_header((header::CACHE_CONTROL, "no-cache"))
            .body(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ApiError::ImageNotFound),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("cannot read {}", path.display()))
            .into()),
    }
}
