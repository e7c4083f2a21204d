// /project-management/services/project-service/src/repository/mod.rs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    models::{Assignment, NewProject, Project},
    utils::error::AppResult,
};

pub use memory::MemoryProjectRepository;
pub use postgres::PgProjectRepository;

/// Persistence of projects and their employee assignments
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn insert(&self, project: NewProject) -> AppResult<Project>;

    /// All projects ordered by id
    async fn find_all(&self) -> AppResult<Vec<Project>>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Project>>;

    /// Replace the scalar fields, assignments are left untouched
    async fn update(&self, project: &Project) -> AppResult<Project>;

    async fn delete(&self, id: i64) -> AppResult<bool>;

    async fn find_by_responsible_employee(&self, employee_id: i64) -> AppResult<Vec<Project>>;

    /// Projects of a customer ordered by start date
    async fn find_by_customer(&self, customer_id: i64) -> AppResult<Vec<Project>>;

    /// Projects the employee is assigned to
    async fn find_by_employee(&self, employee_id: i64) -> AppResult<Vec<Project>>;

    /// Projects overlapping `[start, end]`
    async fn find_in_time_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Project>>;

    async fn add_assignment(&self, project_id: i64, assignment: Assignment) -> AppResult<()>;

    async fn remove_assignment(&self, project_id: i64, employee_id: i64) -> AppResult<bool>;

    /// Connectivity probe for the health endpoint
    async fn ping(&self) -> AppResult<()>;

    fn backend_name(&self) -> &'static str;
}

pub(crate) fn not_found(id: i64) -> crate::utils::error::AppError {
    crate::utils::error::AppError::NotFound(format!("Project with ID {} does not exist.", id))
}

pub(crate) fn duplicate_assignment() -> crate::utils::error::AppError {
    crate::utils::error::AppError::Conflict("Employee is already assigned to this project.".to_string())
}
