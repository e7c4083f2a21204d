// /project-management/services/project-service/src/main.rs

mod api;
mod config;
mod core;
mod docs;
mod integration;
mod middleware;
mod models;
mod repository;
mod utils;

use anyhow::Context;
use axum::{middleware as axum_middleware, Router};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::routes,
    config::{AppConfig, StorageBackend},
    core::services::{JwksVerifier, ProjectService},
    docs::ApiDoc,
    integration::EmployeeServiceClient,
    middleware::{
        auth::auth_middleware, error_path::error_path_middleware,
        security::security_headers_middleware,
    },
    repository::{MemoryProjectRepository, PgProjectRepository, ProjectRepository},
    utils::{circuit_breaker::CircuitBreakerManager, health::IdentityProviderMonitor},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub project_service: Arc<ProjectService>,
    pub circuit_manager: Arc<CircuitBreakerManager>,
    pub jwks: Arc<JwksVerifier>,
    pub idp_monitor: Arc<IdentityProviderMonitor>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables, workspace .env first
    dotenvy::from_filename("../../.env").ok();
    dotenvy::dotenv().ok();

    // Initialize logging
    utils::logger::init_logger();

    let config = Arc::new(AppConfig::from_env().context("Failed to load configuration")?);

    let repository = connect_repository(&config).await?;

    // Initialize circuit breaker manager
    let circuit_manager = Arc::new(CircuitBreakerManager::new(config.resilience.clone()));

    // Employee Service client shares the employeeService breaker
    let employee_client = Arc::new(
        EmployeeServiceClient::new(&config.employee_service, &circuit_manager)
            .await
            .context("Failed to initialize Employee Service client")?,
    );
    info!("✅ Employee Service client targeting {}", config.employee_service.base_url);

    let project_service = Arc::new(ProjectService::new(repository, employee_client));

    let jwks = Arc::new(JwksVerifier::new(&config.security).context("Failed to initialize JWT verifier")?);

    // Identity provider probe runs once before serving, then in the background
    let idp_monitor = Arc::new(IdentityProviderMonitor::new(&config.security));
    if idp_monitor.is_enabled() {
        if idp_monitor.probe().await {
            info!("✅ Identity provider reachable");
        } else {
            tracing::warn!("⚠️ Identity provider not reachable at startup");
        }
        idp_monitor.clone().spawn(config.security.idp_health_check_interval);
    }

    // Create application state
    let app_state = AppState {
        config: config.clone(),
        project_service,
        circuit_manager,
        jwks,
        idp_monitor,
    };

    let app = build_router(app_state);

    let bind_address = config.server.bind_address();
    utils::banner::print_startup_banner(
        &bind_address,
        config.database.backend.as_str(),
        config.security.auth_enabled,
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("🚀 Project Service running at {}", bind_address);
    info!("📚 Swagger UI available at: http://{}/swagger-ui", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Pick the storage backend from config. PostgreSQL gets migrated on startup.
async fn connect_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn ProjectRepository>> {
    match config.database.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(config.database.acquire_timeout)
                .connect(&config.database.url)
                .await
                .context("Failed to connect to PostgreSQL")?;

            let repository = PgProjectRepository::new(pool);
            repository.ping().await.context("Database ping failed")?;
            repository.migrate().await.context("Database migration failed")?;
            info!("✅ Database connected and migrated");

            Ok(Arc::new(repository))
        }
        StorageBackend::Memory => {
            tracing::warn!("⚠️ Using in-memory storage, data is lost on restart");
            Ok(Arc::new(MemoryProjectRepository::new()))
        }
    }
}

/// Routes, API docs and the middleware stack
pub fn build_router(state: AppState) -> Router {
    let cors = utils::cors::create_cors_layer(&state.config.cors);

    Router::new()
        // Mount API routes
        .merge(routes::create_routes())
        // Swagger UI and the OpenAPI document, both public
        .merge(SwaggerUi::new("/swagger-ui").url("/v3/api-docs", ApiDoc::openapi()))
        .with_state(state.clone())
        // Auth middleware (innermost)
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware))
        // Security headers
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                // Request tracing
                .layer(TraceLayer::new_for_http())
                // Timeout protection
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                // CORS handling
                .layer(cors),
        )
        // Error body path (outermost)
        .layer(axum_middleware::from_fn(error_path_middleware))
}
