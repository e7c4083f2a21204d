// /project-management/services/project-service/src/docs.rs

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::models::{
    ApiErrorResponse, ConflictingProject, EmployeeAssignmentDto, EmployeeAssignmentResponseDto,
    EmployeeProjectsResponseDto, EmployeeWithQualificationDto, ExistingAssignment, ProjectCreateDto,
    ProjectEmployeesDto, ProjectGetDto, ProjectSummaryDto, RemoveEmployeeResponseDto, UpdateProjectDto,
    ValidationError,
};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::create_project,
        crate::api::handlers::list_projects,
        crate::api::handlers::get_project,
        crate::api::handlers::update_project,
        crate::api::handlers::delete_project,
        crate::api::handlers::add_employee,
        crate::api::handlers::remove_employee,
        crate::api::handlers::project_employees,
        crate::api::handlers::employee_projects,
        crate::api::handlers::welcome,
    ),
    components(
        schemas(
            ProjectCreateDto,
            UpdateProjectDto,
            ProjectGetDto,
            EmployeeAssignmentDto,
            EmployeeAssignmentResponseDto,
            RemoveEmployeeResponseDto,
            ProjectEmployeesDto,
            EmployeeWithQualificationDto,
            EmployeeProjectsResponseDto,
            ProjectSummaryDto,
            ApiErrorResponse,
            ValidationError,
            ConflictingProject,
            ExistingAssignment,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "projects", description = "Project management"),
        (name = "assignments", description = "Employee assignments with qualification and availability checks"),
        (name = "misc", description = "Service information"),
    ),
    info(
        title = "Project Management Service API",
        version = "1.0.0",
        description = "Projects and their employee assignments. Employees and qualifications \
                      are validated against the Employee Service.",
    ),
    servers(
        (url = "http://localhost:8089", description = "Local"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_project_routes() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/projects/{projectId}/employees"));
        assert!(doc.paths.paths.contains_key("/employees/{employeeId}/projects"));
        assert!(!doc.paths.paths.contains_key("/roles"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("ApiErrorResponse"));
    }
}
