// /project-management/services/project-service/src/middleware/error_path.rs

use axum::{
    body::Body,
    extract::Request,
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};

use crate::models::ApiErrorResponse;

/// Fills the `path` field of error bodies with the request path
///
/// Error responses carry their `ApiErrorResponse` in the response extensions,
/// everything else passes through untouched.
pub async fn error_path_middleware(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let mut response = next.run(req).await;

    let Some(mut body) = response.extensions_mut().remove::<ApiErrorResponse>() else {
        return response;
    };
    body.path = path;

    match serde_json::to_vec(&body) {
        Ok(bytes) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::error!("Failed to re-serialize error body: {}", e);
            response
        }
    }
}
