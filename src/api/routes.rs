// API route configuration

use crate::api::error::ApiError;
use crate::api::handlers;
use actix_web::{error::JsonPayloadError, web, HttpRequest};

/// Bodies that fail to parse become a 400 in the API's own error shape.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::MalformedBody(err.to_string()).into()
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(json_error_handler)
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(handlers::health_check))
        .route("/status", web::get().to(handlers::refresh_status))
        // Fixed paths before the `{name}` catch-all. Resources answer 405 for
        // any method without a route.
        .service(
            web::resource("/countries/refresh")
                .route(web::post().to(handlers::refresh_countries)),
        )
        .service(
            web::resource("/countries/image")
                .route(web::get().to(handlers::summary_image)),
        )
        .service(
            web::resource("/countries")
                .route(web::get().to(handlers::list_countries))
                .route(web::post().to(handlers::create_country)),
        )
        .service(
            web::resource("/countries/{name}")
                .route(web::get().to(handlers::get_country))
                .route(web::delete().to(handlers::delete_country)),
        );
}
