// Request logging, compression and CORS

use actix_web::middleware::{Compress, Logger};

pub fn setup_middleware() -> (Logger, Compress) {
    let logger = Logger::new(r#"%a "%r" %s %b %Dms"#);
    let compress = Compress::default();
    (logger, compress)
}

// CORS configuration
use actix_cors::Cors;
use actix_web::http::header;

/// `*` (or an empty list) allows any origin; otherwise a comma-separated allowlist.
pub fn setup_cors(allowed_origins: &str) -> Cors {
    let origins: Vec<&str> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "DELETE"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600);

    if origins.is_empty() || origins.contains(&"*") {
        return cors.allow_any_origin();
    }
    for origin in origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}
