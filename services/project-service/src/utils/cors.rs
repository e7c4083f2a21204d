// /project-management/services/project-service/src/utils/cors.rs

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// Setup CORS layer for the project service
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config.environment.as_str() {
        "production" => build_production_cors(config),
        _ => build_development_cors(config),
    }
}

/// Build CORS configuration for development
fn build_development_cors(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(&config.allowed_origins))
        .allow_methods(get_allowed_methods())
        .allow_headers(get_allowed_headers())
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Production only accepts explicit https origins
fn build_production_cors(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(production_origins(&config.allowed_origins))
        .allow_methods(get_allowed_methods())
        .allow_headers(get_allowed_headers())
        .allow_credentials(true)
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE, header::RETRY_AFTER])
        .max_age(std::time::Duration::from_secs(86400))
}

/// `*` mirrors the request origin, credentials rule out a literal wildcard
fn allow_origin(origins: &[String]) -> AllowOrigin {
    if origins.iter().any(|o| o == "*") {
        return AllowOrigin::mirror_request();
    }
    AllowOrigin::list(parse_allowed_origins(origins))
}

fn production_origins(origins: &[String]) -> Vec<HeaderValue> {
    let https: Vec<String> = origins
        .iter()
        .filter(|origin| {
            let secure = origin.starts_with("https://");
            if !secure {
                tracing::warn!("Dropping non-https CORS origin '{}' in production", origin);
            }
            secure
        })
        .cloned()
        .collect();
    parse_allowed_origins(&https)
}

fn parse_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(header) => {
                tracing::debug!("CORS origin registered: {}", origin);
                Some(header)
            }
            Err(e) => {
                tracing::warn!("Invalid origin format '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

fn get_allowed_methods() -> Vec<Method> {
    vec![
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ]
}

/// Explicit list, required when credentials are allowed
fn get_allowed_headers() -> Vec<header::HeaderName> {
    vec![
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        header::CACHE_CONTROL,
        header::ACCEPT_LANGUAGE,
    ]
}
