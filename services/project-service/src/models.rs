// /project-management/services/project-service/src/models.rs

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::utils::validator::not_blank;

// ========================= DOMAIN MODELS =========================

/// Project with its employee assignments
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i64,
    pub designation: String,
    pub responsible_employee_id: i64,
    pub customer_id: i64,
    pub customer_contact_person: Option<String>,
    pub comment: Option<String>,
    pub start_date: NaiveDate,
    pub planned_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub assignments: Vec<Assignment>,
}

impl Project {
    /// Actual end date when the project is finished, otherwise the planned one
    pub fn effective_end_date(&self) -> NaiveDate {
        self.actual_end_date.unwrap_or(self.planned_end_date)
    }

    pub fn employee_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.assignments.iter().map(|a| a.employee_id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn assignment_of(&self, employee_id: i64) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.employee_id == employee_id)
    }

    pub fn has_employee(&self, employee_id: i64) -> bool {
        self.assignment_of(employee_id).is_some()
    }
}

/// One employee working on a project in a given qualification
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Assignment {
    pub employee_id: i64,
    pub qualification: String,
    pub assigned_date: NaiveDate,
}

/// Project fields before an id has been assigned
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub designation: String,
    pub responsible_employee_id: i64,
    pub customer_id: i64,
    pub customer_contact_person: Option<String>,
    pub comment: Option<String>,
    pub start_date: NaiveDate,
    pub planned_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
}

/// Scalar fields replaced by an update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateProject {
    pub designation: String,
    pub responsible_employee_id: i64,
    pub customer_id: i64,
    pub customer_contact_person: Option<String>,
    pub comment: Option<String>,
    pub start_date: NaiveDate,
    pub planned_end_date: NaiveDate,
}

/// Optional filter for listing projects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectFilter {
    #[default]
    All,
    Customer(i64),
    ResponsibleEmployee(i64),
}

/// Row shape of the `projects` table
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub designation: String,
    pub responsible_employee_id: i64,
    pub customer_id: i64,
    pub customer_contact_person: Option<String>,
    pub comment: Option<String>,
    pub start_date: NaiveDate,
    pub planned_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
}

impl ProjectRow {
    pub fn into_project(self, assignments: Vec<Assignment>) -> Project {
        Project {
            id: self.id,
            designation: self.designation,
            responsible_employee_id: self.responsible_employee_id,
            customer_id: self.customer_id,
            customer_contact_person: self.customer_contact_person,
            comment: self.comment,
            start_date: self.start_date,
            planned_end_date: self.planned_end_date,
            actual_end_date: self.actual_end_date,
            assignments,
        }
    }
}

// ========================= EMPLOYEE SERVICE DTOs =========================

/// GET /employees/{id} on the Employee Service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub employee_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
}

/// GET /employees/{id}/qualifications on the Employee Service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQualificationsDto {
    pub employee_id: Option<i64>,
    #[serde(default)]
    pub qualifications: Vec<QualificationDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationDto {
    pub name: String,
    pub level: Option<String>,
    pub valid_until: Option<NaiveDate>,
}

// ========================= REQUEST DTOs =========================

/// Request to create a new project
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreateDto {
    /// Project name or designation
    #[serde(default)]
    #[schema(example = "Cloud Migration Project Alpha")]
    #[validate(custom(function = "not_blank", message = "Designation cannot be blank"))]
    pub designation: String,

    /// Employee ID of the responsible project manager
    #[schema(example = 1)]
    #[validate(required(message = "Responsible employee ID is required"))]
    pub responsible_employee_id: Option<i64>,

    #[schema(example = 42)]
    #[validate(required(message = "Customer ID is required"))]
    pub customer_id: Option<i64>,

    #[schema(example = "John Miller")]
    pub customer_contact_person: Option<String>,

    pub comment: Option<String>,

    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    #[validate(required(message = "Start date is required"))]
    pub start_date: Option<NaiveDate>,

    #[schema(value_type = String, format = Date, example = "2025-06-30")]
    #[validate(required(message = "Planned end date is required"))]
    pub planned_end_date: Option<NaiveDate>,

    /// Actual completion date, absent while the project is ongoing
    #[schema(value_type = Option<String>, format = Date)]
    pub actual_end_date: Option<NaiveDate>,
}

impl ProjectCreateDto {
    /// Convert a validated request into a domain value
    pub fn into_new_project(self) -> Option<NewProject> {
        Some(NewProject {
            designation: self.designation,
            responsible_employee_id: self.responsible_employee_id?,
            customer_id: self.customer_id?,
            customer_contact_person: self.customer_contact_person,
            comment: self.comment,
            start_date: self.start_date?,
            planned_end_date: self.planned_end_date?,
            actual_end_date: self.actual_end_date,
        })
    }
}

/// Request to update an existing project
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectDto {
    #[serde(default)]
    #[schema(example = "Cloud Migration Project Beta")]
    #[validate(
        custom(function = "not_blank", message = "Designation cannot be blank"),
        length(min = 3, max = 100, message = "Designation must be between 3 and 100 characters")
    )]
    pub designation: String,

    #[schema(example = 1)]
    #[validate(
        required(message = "Responsible employee ID is required"),
        range(min = 1, message = "Responsible employee ID must be positive")
    )]
    pub responsible_employee_id: Option<i64>,

    #[schema(example = 42)]
    #[validate(
        required(message = "Customer ID is required"),
        range(min = 1, message = "Customer ID must be positive")
    )]
    pub customer_id: Option<i64>,

    pub customer_contact_person: Option<String>,

    #[validate(length(max = 500, message = "Comment must not exceed 500 characters"))]
    pub comment: Option<String>,

    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    #[validate(required(message = "Start date is required"))]
    pub start_date: Option<NaiveDate>,

    #[schema(value_type = String, format = Date, example = "2025-06-30")]
    #[validate(required(message = "Planned end date is required"))]
    pub planned_end_date: Option<NaiveDate>,
}

impl UpdateProjectDto {
    pub fn into_update(self) -> Option<UpdateProject> {
        Some(UpdateProject {
            designation: self.designation,
            responsible_employee_id: self.responsible_employee_id?,
            customer_id: self.customer_id?,
            customer_contact_person: self.customer_contact_person,
            comment: self.comment,
            start_date: self.start_date?,
            planned_end_date: self.planned_end_date?,
        })
    }
}

/// Request to assign an employee to a project
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAssignmentDto {
    #[schema(example = 2)]
    #[validate(required(message = "Employee ID is required"))]
    pub employee_id: Option<i64>,

    /// Must match one of the employee's qualifications
    #[serde(default)]
    #[schema(example = "Java Developer")]
    #[validate(custom(function = "not_blank", message = "Qualification is required"))]
    pub qualification: String,
}

/// Query parameters for listing projects
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQueryParams {
    pub customer_id: Option<i64>,
    pub responsible_employee_id: Option<i64>,
}

// ========================= RESPONSE DTOs =========================

/// Project details including assigned employee ids
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGetDto {
    #[schema(example = 1001)]
    pub id: i64,
    pub designation: String,
    pub responsible_employee_id: i64,
    pub customer_id: i64,
    pub customer_contact_person: Option<String>,
    pub comment: Option<String>,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub planned_end_date: NaiveDate,
    #[schema(value_type = Option<String>, format = Date)]
    pub actual_end_date: Option<NaiveDate>,
    pub employee_ids: Vec<i64>,
}

impl From<&Project> for ProjectGetDto {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            designation: project.designation.clone(),
            responsible_employee_id: project.responsible_employee_id,
            customer_id: project.customer_id,
            customer_contact_person: project.customer_contact_person.clone(),
            comment: project.comment.clone(),
            start_date: project.start_date,
            planned_end_date: project.planned_end_date,
            actual_end_date: project.actual_end_date,
            employee_ids: project.employee_ids(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAssignmentResponseDto {
    pub project_id: i64,
    pub project_name: String,
    pub employee_id: i64,
    #[schema(example = "Jane Doe")]
    pub employee_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveEmployeeResponseDto {
    pub message: String,
    pub project_id: i64,
    pub employee_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEmployeesDto {
    pub project_id: i64,
    pub designation: String,
    pub employees: Vec<EmployeeWithQualificationDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeWithQualificationDto {
    pub employee_id: i64,
    pub qualification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProjectsResponseDto {
    pub employee_id: i64,
    pub projects: Vec<ProjectSummaryDto>,
}

/// Project as seen from one employee's point of view
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummaryDto {
    pub id: i64,
    pub designation: String,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    /// Planned or actual end
    #[schema(value_type = String, format = Date)]
    pub end_date: NaiveDate,
    /// Qualification the employee holds on this project
    pub role: String,
}

/// Claims of the authenticated caller, returned by GET /roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalInfo {
    pub subject: String,
    pub username: Option<String>,
    pub roles: Vec<String>,
}

// ========================= ERROR DTOs =========================

/// Standard error body for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
    #[schema(example = 409)]
    pub status: u16,
    #[schema(example = "Conflict")]
    pub error: String,
    pub message: String,
    #[schema(example = "/projects/1001/employees")]
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_projects: Option<Vec<ConflictingProject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_assignment: Option<ExistingAssignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
            path: String::new(),
            validation_errors: None,
            conflicting_projects: None,
            existing_assignment: None,
            details: None,
            required_roles: None,
            user_roles: None,
            service: None,
            upstream_status: None,
            circuit_breaker_state: None,
            retry_after: None,
        }
    }
}

/// Validation failure of a single request field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationError {
    #[schema(example = "designation")]
    pub field: String,
    #[schema(example = "Designation cannot be blank")]
    pub message: String,
}

/// Project that overlaps the period of a requested assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingProject {
    pub project_id: i64,
    pub project_name: String,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExistingAssignment {
    #[schema(value_type = Option<String>, format = Date)]
    pub assigned_date: Option<NaiveDate>,
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_project() -> Project {
        Project {
            id: 1,
            designation: "Cloud Migration".to_string(),
            responsible_employee_id: 1,
            customer_id: 42,
            customer_contact_person: None,
            comment: None,
            start_date: date(2025, 1, 15),
            planned_end_date: date(2025, 6, 30),
            actual_end_date: None,
            assignments: vec![
                Assignment {
                    employee_id: 9,
                    qualification: "Java".to_string(),
                    assigned_date: date(2025, 1, 2),
                },
                Assignment {
                    employee_id: 3,
                    qualification: "SQL".to_string(),
                    assigned_date: date(2025, 1, 3),
                },
            ],
        }
    }

    #[test]
    fn test_effective_end_date() {
        let mut project = sample_project();
        assert_eq!(project.effective_end_date(), date(2025, 6, 30));

        project.actual_end_date = Some(date(2025, 6, 28));
        assert_eq!(project.effective_end_date(), date(2025, 6, 28));
    }

    #[test]
    fn test_employee_ids_sorted() {
        let project = sample_project();
        assert_eq!(project.employee_ids(), vec![3, 9]);
        assert!(project.has_employee(9));
        assert!(!project.has_employee(4));
    }

    #[test]
    fn test_project_dto_is_camel_case() {
        let dto = ProjectGetDto::from(&sample_project());
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["responsibleEmployeeId"], 1);
        assert_eq!(json["startDate"], "2025-01-15");
        assert_eq!(json["employeeIds"], serde_json::json!([3, 9]));
        assert!(json["actualEndDate"].is_null());
    }

    #[test]
    fn test_create_dto_validation() {
        let dto: ProjectCreateDto = serde_json::from_value(serde_json::json!({
            "designation": "   ",
            "customerId": 42,
            "startDate": "2025-01-15",
            "plannedEndDate": "2025-06-30"
        }))
        .unwrap();

        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("designation"));
        assert!(fields.contains_key("responsible_employee_id"));
        assert!(!fields.contains_key("customer_id"));
    }

    #[test]
    fn test_update_dto_rejects_non_positive_ids() {
        let dto: UpdateProjectDto = serde_json::from_value(serde_json::json!({
            "designation": "Data Platform",
            "responsibleEmployeeId": 0,
            "customerId": 42,
            "startDate": "2025-01-15",
            "plannedEndDate": "2025-06-30"
        }))
        .unwrap();

        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("responsible_employee_id"));
    }

    #[test]
    fn test_error_body_omits_absent_fields() {
        let body = ApiErrorResponse::new(StatusCode::NOT_FOUND, "Project with ID 5 does not exist.");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "Not Found");
        assert!(json.get("validationErrors").is_none());
        assert!(json.get("retryAfter").is_none());
    }
}
