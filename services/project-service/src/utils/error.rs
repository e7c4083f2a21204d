// /project-management/services/project-service/src/utils/error.rs
// Centralized error handling for the project service

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{ApiErrorResponse, ConflictingProject, ExistingAssignment, ValidationError};

/// Name reported in error bodies for upstream failures
pub const EMPLOYEE_SERVICE: &str = "employee-service";

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Application error enum with every failure the service can report
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Required field is missing or invalid.")]
    Validation(Vec<ValidationError>),

    #[error("Employee with ID {employee_id} is already assigned to project with ID {project_id}.")]
    DuplicateAssignment {
        project_id: i64,
        employee_id: i64,
        assigned_date: Option<NaiveDate>,
        role: Option<String>,
    },

    #[error("Employee is already assigned to another project during the period {start} to {end}.")]
    TimeConflict {
        start: NaiveDate,
        end: NaiveDate,
        conflicting_projects: Vec<ConflictingProject>,
    },

    #[error("Employee with ID {0} does not exist.")]
    EmployeeNotFound(i64),

    #[error("Employee does not have the required qualification: {0}.")]
    QualificationMissing(String),

    #[error("Qualification {name} expired on {valid_until}.")]
    QualificationExpired { name: String, valid_until: NaiveDate },

    #[error("Employee Service is temporarily unavailable.")]
    EmployeeServiceUnavailable { upstream_status: Option<u16> },

    #[error("Employee Service did not respond within {timeout_ms} ms.")]
    EmployeeServiceTimeout { timeout_ms: u64 },

    #[error("Employee Service is currently unavailable. Please try again later.")]
    CircuitBreakerOpen { state: String, retry_after_secs: u64 },

    #[error("{message}")]
    Unauthorized { message: String, details: Option<String> },

    #[error("{message}")]
    Forbidden {
        message: String,
        required_roles: Vec<String>,
        user_roles: Vec<String>,
    },

    #[error("Authentication service unreachable.")]
    AuthProviderUnavailable,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Failures caused by the Employee Service itself. Only these are
    /// recorded as breaker failures and retried.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            AppError::EmployeeServiceUnavailable { .. } | AppError::EmployeeServiceTimeout { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::EmployeeNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::DuplicateAssignment { .. }
            | AppError::TimeConflict { .. } => StatusCode::CONFLICT,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::QualificationMissing(_) | AppError::QualificationExpired { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::EmployeeServiceUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::EmployeeServiceTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::CircuitBreakerOpen { .. } | AppError::AuthProviderUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Build the standard error body. `path` is filled in later by the
    /// error path middleware.
    pub fn to_body(&self) -> ApiErrorResponse {
        let status = self.status_code();

        match self {
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                ApiErrorResponse::new(status, "Database operation failed")
            }
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                ApiErrorResponse::new(status, "Service configuration error")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ApiErrorResponse::new(status, "Internal server error")
            }
            AppError::Validation(errors) => {
                let mut body = ApiErrorResponse::new(status, self.to_string());
                body.validation_errors = Some(errors.clone());
                body
            }
            AppError::DuplicateAssignment { assigned_date, role, .. } => {
                let mut body = ApiErrorResponse::new(status, self.to_string());
                body.existing_assignment = Some(ExistingAssignment {
                    assigned_date: *assigned_date,
                    role: role.clone(),
                });
                body
            }
            AppError::TimeConflict { conflicting_projects, .. } => {
                let mut body = ApiErrorResponse::new(status, self.to_string());
                body.conflicting_projects = Some(conflicting_projects.clone());
                body
            }
            AppError::EmployeeServiceUnavailable { upstream_status } => {
                tracing::error!("Employee service error (upstream status: {:?})", upstream_status);
                let mut body = ApiErrorResponse::new(status, self.to_string());
                body.service = Some(EMPLOYEE_SERVICE.to_string());
                body.upstream_status = *upstream_status;
                body
            }
            AppError::EmployeeServiceTimeout { .. } => {
                tracing::error!("{}", self);
                let mut body = ApiErrorResponse::new(status, self.to_string());
                body.service = Some(EMPLOYEE_SERVICE.to_string());
                body
            }
            AppError::CircuitBreakerOpen { state, retry_after_secs } => {
                let mut body = ApiErrorResponse::new(status, self.to_string());
                body.service = Some(EMPLOYEE_SERVICE.to_string());
                body.circuit_breaker_state = Some(state.clone());
                body.retry_after = Some(*retry_after_secs);
                body
            }
            AppError::Unauthorized { details, .. } => {
                let mut body = ApiErrorResponse::new(status, self.to_string());
                body.details = details.clone();
                body
            }
            AppError::Forbidden { required_roles, user_roles, .. } => {
                let mut body = ApiErrorResponse::new(status, self.to_string());
                body.required_roles = Some(required_roles.clone());
                body.user_roles = Some(user_roles.clone());
                body
            }
            _ => ApiErrorResponse::new(status, self.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert AppError to HTTP response
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_body();

        let mut response = (status, Json(body.clone())).into_response();

        if let AppError::CircuitBreakerOpen { retry_after_secs, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        // Picked up by the error path middleware
        response.extensions_mut().insert(body);
        response
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                AppError::Conflict("Employee is already assigned to this project.".to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}
