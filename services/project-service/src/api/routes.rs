// /project-management/services/project-service/src/api/routes.rs

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers;
use crate::AppState;

/// Create all routes of the project service
pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Project management routes
        .route("/projects", post(handlers::create_project).get(handlers::list_projects))
        .route(
            "/projects/{projectId}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )

        // Employee assignments
        .route(
            "/projects/{projectId}/employees",
            post(handlers::add_employee).get(handlers::project_employees),
        )
        .route(
            "/projects/{projectId}/employees/{employeeId}",
            delete(handlers::remove_employee),
        )
        .route("/employees/{employeeId}/projects", get(handlers::employee_projects))

        // Misc
        .route("/welcome", get(handlers::welcome))
        .route("/roles", get(handlers::roles))
        .route("/actuator/health", get(handlers::health_check))
}
