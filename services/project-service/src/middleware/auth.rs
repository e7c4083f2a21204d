// /project-management/services/project-service/src/middleware/auth.rs

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{
    core::jwt::Principal,
    utils::error::{AppError, AppResult},
    AppState,
};

pub const MISSING_TOKEN_MESSAGE: &str = "JWT token is missing from the Authorization header.";

/// Middleware for validating JWT bearer tokens on protected endpoints
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let path = req.uri().path().to_string();

    // Skip auth for public endpoints
    if is_public_endpoint(&path) {
        return Ok(next.run(req).await);
    }

    let security = &state.config.security;
    if !security.auth_enabled {
        req.extensions_mut().insert(Principal::anonymous());
        return Ok(next.run(req).await);
    }

    if !state.idp_monitor.is_reachable() {
        tracing::warn!("Rejecting {}: identity provider unreachable", path);
        return Err(AppError::AuthProviderUnavailable);
    }

    let token = extract_bearer_token(&req)?;

    let principal = state.jwks.verify(&token).await.map_err(|e| {
        tracing::warn!("JWT verification failed for {}: {}", path, e);
        e
    })?;

    if !principal.has_role(&security.required_role) {
        tracing::warn!(
            "User {} lacks role {} for {}",
            principal.subject, security.required_role, path
        );
        return Err(AppError::Forbidden {
            message: format!("Insufficient permissions. Required role: {}", security.required_role),
            required_roles: vec![security.required_role.clone()],
            user_roles: principal.roles.clone(),
        });
    }

    tracing::debug!("Authenticated {} for {}", principal.subject, path);
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Helper to check whether an endpoint is public (no auth required)
fn is_public_endpoint(path: &str) -> bool {
    let exact_paths = ["/actuator/health", "/swagger", "/swagger-ui.html"];
    let prefixes = ["/swagger-ui", "/v3/api-docs"];

    exact_paths.contains(&path) || prefixes.iter().any(|prefix| path.starts_with(prefix))
}

/// Helper to extract the bearer token from the request header
fn extract_bearer_token(req: &Request) -> AppResult<String> {
    let missing = || AppError::Unauthorized {
        message: MISSING_TOKEN_MESSAGE.to_string(),
        details: None,
    };

    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| {
            tracing::debug!("Authorization header not found");
            missing()
        })?
        .to_str()
        .map_err(|_| {
            tracing::debug!("Invalid authorization header encoding");
            missing()
        })?;

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => {
            tracing::debug!("Authorization header missing Bearer prefix");
            Err(missing())
        }
    }
}
