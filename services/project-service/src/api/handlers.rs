// /project-management/services/project-service/src/api/handlers.rs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    Extension,
};

use crate::{
    core::jwt::Principal,
    models::*,
    utils::{
        error::{AppError, AppResult},
        health::{comprehensive_health_check, HealthCheckResult},
        validator::{validate_id, validate_request},
    },
    AppState,
};

const INVALID_REQUEST_MESSAGE: &str = "Required field is missing or invalid.";
const PROJECT_ID: &str = "Project ID";
const EMPLOYEE_ID: &str = "Employee ID";

/// Unwrap a JSON body, malformed bodies become a 400 with the standard message
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AppError::BadRequest(INVALID_REQUEST_MESSAGE.to_string())
    })
}

// ========================= PROJECT HANDLERS =========================

/// Handler for creating a new project
/// POST /projects
#[utoipa::path(
    post,
    path = "/projects",
    request_body = ProjectCreateDto,
    responses(
        (status = 201, description = "Project created", body = ProjectGetDto),
        (status = 400, description = "Validation error", body = ApiErrorResponse),
        (status = 401, description = "Missing or invalid JWT token", body = ApiErrorResponse),
        (status = 404, description = "Responsible employee not found", body = ApiErrorResponse),
        (status = 502, description = "Employee Service error", body = ApiErrorResponse),
        (status = 503, description = "Circuit breaker open", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "projects"
)]
pub async fn create_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<ProjectCreateDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ProjectGetDto>)> {
    let payload = json_body(payload)?;
    validate_request(&payload)?;

    let project = payload
        .into_new_project()
        .ok_or_else(|| AppError::BadRequest(INVALID_REQUEST_MESSAGE.to_string()))?;

    let created = state
        .project_service
        .create(project, principal.bearer())
        .await?;

    Ok((StatusCode::CREATED, Json(ProjectGetDto::from(&created))))
}

/// Handler for listing projects, optionally filtered
/// GET /projects
#[utoipa::path(
    get,
    path = "/projects",
    params(
        ("customerId" = Option<i64>, Query, description = "Only projects of this customer, ordered by start date"),
        ("responsibleEmployeeId" = Option<i64>, Query, description = "Only projects led by this employee"),
    ),
    responses(
        (status = 200, description = "List of projects", body = [ProjectGetDto]),
        (status = 401, description = "Missing or invalid JWT token", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "projects"
)]
pub async fn list_projects(
    State(state): State<AppState>,
    params: Result<Query<ProjectQueryParams>, QueryRejection>,
) -> AppResult<Json<Vec<ProjectGetDto>>> {
    let Query(params) = params.map_err(|rejection| {
        tracing::debug!("Rejected query: {}", rejection.body_text());
        AppError::BadRequest(INVALID_REQUEST_MESSAGE.to_string())
    })?;

    // customerId wins when both filters are given
    let filter = match (params.customer_id, params.responsible_employee_id) {
        (Some(customer_id), _) => ProjectFilter::Customer(customer_id),
        (None, Some(employee_id)) => ProjectFilter::ResponsibleEmployee(employee_id),
        (None, None) => ProjectFilter::All,
    };

    let projects = state.project_service.find(filter).await?;
    Ok(Json(projects.iter().map(ProjectGetDto::from).collect()))
}

/// Handler for fetching one project
/// GET /projects/{projectId}
#[utoipa::path(
    get,
    path = "/projects/{projectId}",
    params(("projectId" = i64, Path, description = "Unique project identifier")),
    responses(
        (status = 200, description = "Project found", body = ProjectGetDto),
        (status = 400, description = "Invalid project id", body = ApiErrorResponse),
        (status = 404, description = "Project not found", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "projects"
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<ProjectGetDto>> {
    let project_id = validate_id(&project_id, PROJECT_ID)?;
    let project = state.project_service.read_by_id(project_id).await?;
    Ok(Json(ProjectGetDto::from(&project)))
}

/// Handler for updating a project
/// PUT /projects/{projectId}
#[utoipa::path(
    put,
    path = "/projects/{projectId}",
    params(("projectId" = i64, Path, description = "Unique project identifier")),
    request_body = UpdateProjectDto,
    responses(
        (status = 200, description = "Project updated", body = ProjectGetDto),
        (status = 400, description = "Validation error", body = ApiErrorResponse),
        (status = 404, description = "Project or responsible employee not found", body = ApiErrorResponse),
        (status = 502, description = "Employee Service error", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "projects"
)]
pub async fn update_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<String>,
    payload: Result<Json<UpdateProjectDto>, JsonRejection>,
) -> AppResult<Json<ProjectGetDto>> {
    let project_id = validate_id(&project_id, PROJECT_ID)?;
    let payload = json_body(payload)?;
    validate_request(&payload)?;

    let changes = payload
        .into_update()
        .ok_or_else(|| AppError::BadRequest(INVALID_REQUEST_MESSAGE.to_string()))?;

    let updated = state
        .project_service
        .update(project_id, changes, principal.bearer())
        .await?;

    Ok(Json(ProjectGetDto::from(&updated)))
}

/// Handler for deleting a project without assignments
/// DELETE /projects/{projectId}
#[utoipa::path(
    delete,
    path = "/projects/{projectId}",
    params(("projectId" = i64, Path, description = "Unique project identifier")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Project not found", body = ApiErrorResponse),
        (status = 409, description = "Project still has employee assignments", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "projects"
)]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<StatusCode> {
    let project_id = validate_id(&project_id, PROJECT_ID)?;
    state.project_service.delete(project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ========================= ASSIGNMENT HANDLERS =========================

/// Handler for assigning an employee to a project
/// POST /projects/{projectId}/employees
#[utoipa::path(
    post,
    path = "/projects/{projectId}/employees",
    params(("projectId" = i64, Path, description = "Unique project identifier")),
    request_body = EmployeeAssignmentDto,
    responses(
        (status = 200, description = "Employee assigned", body = EmployeeAssignmentResponseDto),
        (status = 400, description = "Validation error", body = ApiErrorResponse),
        (status = 404, description = "Project or employee not found", body = ApiErrorResponse),
        (status = 409, description = "Duplicate assignment or time conflict", body = ApiErrorResponse),
        (status = 422, description = "Qualification missing or expired", body = ApiErrorResponse),
        (status = 502, description = "Employee Service error", body = ApiErrorResponse),
        (status = 503, description = "Circuit breaker open", body = ApiErrorResponse),
        (status = 504, description = "Employee Service timeout", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn add_employee(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<String>,
    payload: Result<Json<EmployeeAssignmentDto>, JsonRejection>,
) -> AppResult<Json<EmployeeAssignmentResponseDto>> {
    let project_id = validate_id(&project_id, PROJECT_ID)?;
    let payload = json_body(payload)?;
    validate_request(&payload)?;

    let employee_id = payload
        .employee_id
        .ok_or_else(|| AppError::BadRequest(INVALID_REQUEST_MESSAGE.to_string()))?;

    let response = state
        .project_service
        .add_employee(project_id, employee_id, payload.qualification.trim(), principal.bearer())
        .await?;

    Ok(Json(response))
}

/// Handler for removing an employee from a project
/// DELETE /projects/{projectId}/employees/{employeeId}
#[utoipa::path(
    delete,
    path = "/projects/{projectId}/employees/{employeeId}",
    params(
        ("projectId" = i64, Path, description = "Unique project identifier"),
        ("employeeId" = i64, Path, description = "Employee identifier"),
    ),
    responses(
        (status = 200, description = "Employee removed", body = RemoveEmployeeResponseDto),
        (status = 400, description = "Invalid id", body = ApiErrorResponse),
        (status = 404, description = "Project not found or employee not assigned", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn remove_employee(
    State(state): State<AppState>,
    Path((project_id, employee_id)): Path<(String, String)>,
) -> AppResult<Json<RemoveEmployeeResponseDto>> {
    let project_id = validate_id(&project_id, PROJECT_ID)?;
    let employee_id = validate_id(&employee_id, EMPLOYEE_ID)?;

    let response = state
        .project_service
        .remove_employee(project_id, employee_id)
        .await?;

    Ok(Json(response))
}

/// Handler for listing the employees of a project
/// GET /projects/{projectId}/employees
#[utoipa::path(
    get,
    path = "/projects/{projectId}/employees",
    params(("projectId" = i64, Path, description = "Unique project identifier")),
    responses(
        (status = 200, description = "Assigned employees", body = ProjectEmployeesDto),
        (status = 404, description = "Project not found", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn project_employees(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<ProjectEmployeesDto>> {
    let project_id = validate_id(&project_id, PROJECT_ID)?;
    Ok(Json(state.project_service.project_employees(project_id).await?))
}

/// Handler for listing the projects of an employee
/// GET /employees/{employeeId}/projects
#[utoipa::path(
    get,
    path = "/employees/{employeeId}/projects",
    params(("employeeId" = i64, Path, description = "Employee identifier")),
    responses(
        (status = 200, description = "Projects of the employee", body = EmployeeProjectsResponseDto),
        (status = 404, description = "Employee not found", body = ApiErrorResponse),
        (status = 502, description = "Employee Service error", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn employee_projects(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(employee_id): Path<String>,
) -> AppResult<Json<EmployeeProjectsResponseDto>> {
    let employee_id = validate_id(&employee_id, EMPLOYEE_ID)?;

    let response = state
        .project_service
        .employee_projects(employee_id, principal.bearer())
        .await?;

    Ok(Json(response))
}

// ========================= MISC HANDLERS =========================

/// GET /welcome
#[utoipa::path(
    get,
    path = "/welcome",
    responses((status = 200, description = "Greeting", body = String)),
    security(("bearer_auth" = [])),
    tag = "misc"
)]
pub async fn welcome() -> &'static str {
    "welcome to project-service"
}

/// Claims of the caller, handy when debugging role mappings
/// GET /roles
pub async fn roles(Extension(principal): Extension<Principal>) -> Json<PrincipalInfo> {
    Json(PrincipalInfo {
        subject: principal.subject,
        username: principal.username,
        roles: principal.roles,
    })
}

/// Handler for the health endpoint
/// GET /actuator/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResult> {
    Json(
        comprehensive_health_check(
            state.project_service.repository(),
            &state.circuit_manager,
            &state.idp_monitor,
        )
        .await,
    )
}
