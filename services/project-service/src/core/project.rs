// /project-management/services/project-service/src/core/project.rs

use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::{
    integration::EmployeeDirectory,
    models::*,
    repository::ProjectRepository,
    utils::error::{AppError, AppResult},
};

/// Business logic for projects and employee assignments
pub struct ProjectService {
    repository: Arc<dyn ProjectRepository>,
    employees: Arc<dyn EmployeeDirectory>,
}

impl ProjectService {
    pub fn new(repository: Arc<dyn ProjectRepository>, employees: Arc<dyn EmployeeDirectory>) -> Self {
        Self { repository, employees }
    }

    pub fn repository(&self) -> &Arc<dyn ProjectRepository> {
        &self.repository
    }

    // ===== PROJECT CRUD =====

    pub async fn create(&self, project: NewProject, token: Option<&str>) -> AppResult<Project> {
        self.validate_project(
            project.responsible_employee_id,
            project.customer_id,
            ProjectDates::from(&project),
            token,
        )
        .await?;

        let created = self.repository.insert(project).await?;
        tracing::info!("Project {} '{}' created", created.id, created.designation);
        Ok(created)
    }

    pub async fn read_all(&self) -> AppResult<Vec<Project>> {
        self.repository.find_all().await
    }

    pub async fn find(&self, filter: ProjectFilter) -> AppResult<Vec<Project>> {
        match filter {
            ProjectFilter::All => self.read_all().await,
            ProjectFilter::Customer(id) => self.repository.find_by_customer(id).await,
            ProjectFilter::ResponsibleEmployee(id) => {
                self.repository.find_by_responsible_employee(id).await
            }
        }
    }

    pub async fn read_by_id(&self, id: i64) -> AppResult<Project> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project with ID {} does not exist.", id)))
    }

    /// Replace the scalar fields. The actual end date and the assignments stay as they are.
    pub async fn update(&self, id: i64, changes: UpdateProject, token: Option<&str>) -> AppResult<Project> {
        let mut project = self.read_by_id(id).await?;

        if changes.planned_end_date < changes.start_date {
            return Err(AppError::BadRequest("End date must be after the start date".to_string()));
        }

        project.designation = changes.designation;
        project.responsible_employee_id = changes.responsible_employee_id;
        project.customer_id = changes.customer_id;
        project.customer_contact_person = changes.customer_contact_person;
        project.comment = changes.comment;
        project.start_date = changes.start_date;
        project.planned_end_date = changes.planned_end_date;

        self.validate_project(
            project.responsible_employee_id,
            project.customer_id,
            ProjectDates::from(&project),
            token,
        )
        .await?;

        let updated = self.repository.update(&project).await?;
        tracing::info!("Project {} updated", updated.id);
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let project = self.read_by_id(id).await?;

        if !project.assignments.is_empty() {
            return Err(AppError::Conflict(
                "Project still has employee assignments and cannot be deleted.".to_string(),
            ));
        }

        self.repository.delete(id).await?;
        tracing::info!("Project {} deleted", id);
        Ok(())
    }

    // ===== EMPLOYEE ASSIGNMENTS =====

    pub async fn add_employee(
        &self,
        project_id: i64,
        employee_id: i64,
        qualification: &str,
        token: Option<&str>,
    ) -> AppResult<EmployeeAssignmentResponseDto> {
        let project = self.read_by_id(project_id).await?;

        if let Some(existing) = project.assignment_of(employee_id) {
            return Err(AppError::DuplicateAssignment {
                project_id,
                employee_id,
                assigned_date: Some(existing.assigned_date),
                role: Some(existing.qualification.clone()),
            });
        }

        if !self.employees.validate_employee(employee_id, token).await? {
            return Err(AppError::EmployeeNotFound(employee_id));
        }

        if !self
            .employees
            .validate_qualification(employee_id, qualification, token)
            .await?
        {
            return Err(AppError::QualificationMissing(qualification.to_string()));
        }

        let conflicting: Vec<ConflictingProject> = self
            .repository
            .find_in_time_range(project.start_date, project.planned_end_date)
            .await?
            .into_iter()
            .filter(|p| p.id != project_id && p.has_employee(employee_id))
            .map(|p| ConflictingProject {
                project_id: p.id,
                project_name: p.designation.clone(),
                start_date: p.start_date,
                end_date: p.effective_end_date(),
            })
            .collect();

        if let Some(first) = conflicting.first() {
            tracing::warn!(
                "Employee {} is busy in {} other project(s) during project {}",
                employee_id,
                conflicting.len(),
                project_id
            );
            return Err(AppError::TimeConflict {
                start: first.start_date,
                end: first.end_date,
                conflicting_projects: conflicting,
            });
        }

        self.repository
            .add_assignment(
                project_id,
                Assignment {
                    employee_id,
                    qualification: qualification.to_string(),
                    assigned_date: Utc::now().date_naive(),
                },
            )
            .await?;

        tracing::info!(
            "Employee {} assigned to project {} as '{}'",
            employee_id, project_id, qualification
        );

        Ok(EmployeeAssignmentResponseDto {
            project_id,
            project_name: project.designation,
            employee_id,
            employee_name: self.employees.employee_name(employee_id, token).await,
        })
    }

    pub async fn remove_employee(&self, project_id: i64, employee_id: i64) -> AppResult<RemoveEmployeeResponseDto> {
        let project = self.read_by_id(project_id).await?;

        let not_assigned = || {
            AppError::NotFound(format!(
                "Employee with ID {} is not assigned to project with ID {}.",
                employee_id, project_id
            ))
        };

        if !project.has_employee(employee_id) {
            return Err(not_assigned());
        }
        if !self.repository.remove_assignment(project_id, employee_id).await? {
            return Err(not_assigned());
        }

        tracing::info!("Employee {} removed from project {}", employee_id, project_id);
        Ok(RemoveEmployeeResponseDto {
            message: "Employee successfully removed from project.".to_string(),
            project_id,
            employee_id,
        })
    }

    pub async fn project_employees(&self, project_id: i64) -> AppResult<ProjectEmployeesDto> {
        let project = self.read_by_id(project_id).await?;

        let mut employees: Vec<EmployeeWithQualificationDto> = project
            .assignments
            .iter()
            .map(|a| EmployeeWithQualificationDto {
                employee_id: a.employee_id,
                qualification: a.qualification.clone(),
            })
            .collect();
        employees.sort_by_key(|e| e.employee_id);

        Ok(ProjectEmployeesDto {
            project_id: project.id,
            designation: project.designation,
            employees,
        })
    }

    pub async fn employee_projects(&self, employee_id: i64, token: Option<&str>) -> AppResult<EmployeeProjectsResponseDto> {
        if !self.employees.validate_employee(employee_id, token).await? {
            return Err(AppError::NotFound(format!(
                "Employee with ID {} does not exist.",
                employee_id
            )));
        }

        let projects = self
            .repository
            .find_by_employee(employee_id)
            .await?
            .into_iter()
            .map(|p| {
                let role = p
                    .assignment_of(employee_id)
                    .map(|a| a.qualification.clone())
                    .unwrap_or_default();
                ProjectSummaryDto {
                    id: p.id,
                    designation: p.designation.clone(),
                    start_date: p.start_date,
                    end_date: p.effective_end_date(),
                    role,
                }
            })
            .collect();

        Ok(EmployeeProjectsResponseDto { employee_id, projects })
    }

    // ===== VALIDATION =====

    /// No customer service exists, every positive id is a customer
    pub fn customer_exists(&self, customer_id: i64) -> bool {
        customer_id > 0
    }

    async fn validate_project(
        &self,
        responsible_employee_id: i64,
        customer_id: i64,
        dates: ProjectDates,
        token: Option<&str>,
    ) -> AppResult<()> {
        if dates.start > dates.planned_end {
            return Err(AppError::BadRequest(
                "Start date cannot be after the planned end date".to_string(),
            ));
        }

        if let Some(actual) = dates.actual_end {
            if actual < dates.start {
                return Err(AppError::BadRequest(
                    "Actual end date cannot be before the start date".to_string(),
                ));
            }
        }

        if !self
            .employees
            .validate_employee(responsible_employee_id, token)
            .await?
        {
            return Err(AppError::EmployeeNotFound(responsible_employee_id));
        }

        if !self.customer_exists(customer_id) {
            return Err(AppError::NotFound(format!(
                "Customer with ID {} does not exist.",
                customer_id
            )));
        }

        Ok(())
    }
}

/// Date fields checked by project validation
#[derive(Debug, Clone, Copy)]
struct ProjectDates {
    start: NaiveDate,
    planned_end: NaiveDate,
    actual_end: Option<NaiveDate>,
}

impl From<&NewProject> for ProjectDates {
    fn from(project: &NewProject) -> Self {
        Self {
            start: project.start_date,
            planned_end: project.planned_end_date,
            actual_end: project.actual_end_date,
        }
    }
}

impl From<&Project> for ProjectDates {
    fn from(project: &Project) -> Self {
        Self {
            start: project.start_date,
            planned_end: project.planned_end_date,
            actual_end: project.actual_end_date,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::MemoryProjectRepository;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-process employee directory with scripted answers
    #[derive(Default)]
    pub(crate) struct FakeDirectory {
        /// employee id -> qualifications with optional expiry
        pub employees: HashMap<i64, Vec<(String, Option<NaiveDate>)>>,
        pub names: HashMap<i64, String>,
        pub unavailable: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeDirectory {
        pub(crate) fn with_employee(mut self, id: i64, qualifications: &[&str]) -> Self {
            self.employees.insert(
                id,
                qualifications.iter().map(|q| (q.to_string(), None)).collect(),
            );
            self
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl EmployeeDirectory for FakeDirectory {
        async fn validate_employee(&self, employee_id: i64, _token: Option<&str>) -> AppResult<bool> {
            self.record(format!("employee:{}", employee_id));
            if employee_id <= 0 {
                return Ok(false);
            }
            if self.unavailable {
                return Err(AppError::EmployeeServiceUnavailable { upstream_status: Some(503) });
            }
            if self.employees.contains_key(&employee_id) {
                Ok(true)
            } else {
                Err(AppError::EmployeeNotFound(employee_id))
            }
        }

        async fn validate_qualification(
            &self,
            employee_id: i64,
            qualification: &str,
            _token: Option<&str>,
        ) -> AppResult<bool> {
            self.record(format!("qualification:{}:{}", employee_id, qualification));
            if qualification.trim().is_empty() {
                return Ok(false);
            }
            let qualifications = self
                .employees
                .get(&employee_id)
                .ok_or(AppError::EmployeeNotFound(employee_id))?;
            match qualifications
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(qualification))
            {
                Some((name, Some(valid_until))) if *valid_until < Utc::now().date_naive() => {
                    Err(AppError::QualificationExpired {
                        name: name.clone(),
                        valid_until: *valid_until,
                    })
                }
                Some(_) => Ok(true),
                None => Err(AppError::QualificationMissing(qualification.to_string())),
            }
        }

        async fn employee_name(&self, employee_id: i64, _token: Option<&str>) -> String {
            self.names
                .get(&employee_id)
                .cloned()
                .unwrap_or_else(|| format!("Employee {}", employee_id))
        }
    }

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn new_project(designation: &str, start: NaiveDate, end: NaiveDate) -> NewProject {
        NewProject {
            designation: designation.to_string(),
            responsible_employee_id: 1,
            customer_id: 42,
            customer_contact_person: Some("John Miller".to_string()),
            comment: None,
            start_date: start,
            planned_end_date: end,
            actual_end_date: None,
        }
    }

    fn service_with(directory: FakeDirectory) -> (ProjectService, Arc<FakeDirectory>) {
        let directory = Arc::new(directory);
        let service = ProjectService::new(Arc::new(MemoryProjectRepository::new()), directory.clone());
        (service, directory)
    }

    fn default_directory() -> FakeDirectory {
        let mut directory = FakeDirectory::default()
            .with_employee(1, &["Project Manager"])
            .with_employee(2, &["Java Developer"])
            .with_employee(3, &["Tester"]);
        directory.names.insert(2, "Jane Doe".to_string());
        directory
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let (service, _) = service_with(default_directory());

        let created = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap();
        assert_eq!(created.id, 1);

        let read = service.read_by_id(created.id).await.unwrap();
        assert_eq!(read.designation, "Alpha");
        assert_eq!(service.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_missing_project() {
        let (service, _) = service_with(default_directory());

        let err = service.read_by_id(5).await.unwrap_err();
        assert_eq!(err.to_string(), "Project with ID 5 does not exist.");
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_dates_before_calling_directory() {
        let (service, directory) = service_with(default_directory());

        let err = service
            .create(new_project("Alpha", date(2025, 7, 1), date(2025, 6, 30)), None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Start date cannot be after the planned end date");
        assert!(directory.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_actual_end_before_start() {
        let (service, _) = service_with(default_directory());
        let mut project = new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30));
        project.actual_end_date = Some(date(2025, 1, 1));

        let err = service.create(project, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Actual end date cannot be before the start date");
    }

    #[tokio::test]
    async fn test_create_with_invalid_responsible_or_customer() {
        let (service, _) = service_with(default_directory());

        let mut project = new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30));
        project.responsible_employee_id = 0;
        let err = service.create(project, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Employee with ID 0 does not exist.");

        let mut project = new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30));
        project.customer_id = -4;
        let err = service.create(project, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Customer with ID -4 does not exist.");
    }

    #[tokio::test]
    async fn test_create_propagates_directory_outage() {
        let mut directory = default_directory();
        directory.unavailable = true;
        let (service, _) = service_with(directory);

        let err = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmployeeServiceUnavailable { .. }));
        assert!(service.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_preserves_assignments_and_actual_end() {
        let (service, _) = service_with(default_directory());
        let mut project = new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30));
        project.actual_end_date = Some(date(2025, 6, 28));
        let created = service.create(project, None).await.unwrap();
        service.add_employee(created.id, 2, "Java Developer", None).await.unwrap();

        let updated = service
            .update(
                created.id,
                UpdateProject {
                    designation: "Alpha Reloaded".to_string(),
                    responsible_employee_id: 1,
                    customer_id: 43,
                    customer_contact_person: None,
                    comment: Some("rescoped".to_string()),
                    start_date: date(2025, 2, 1),
                    planned_end_date: date(2025, 7, 31),
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.designation, "Alpha Reloaded");
        assert_eq!(updated.customer_id, 43);
        assert_eq!(updated.actual_end_date, Some(date(2025, 6, 28)));
        assert_eq!(updated.employee_ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_update_rejects_end_before_start() {
        let (service, _) = service_with(default_directory());
        let created = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap();

        let err = service
            .update(
                created.id,
                UpdateProject {
                    designation: "Alpha".to_string(),
                    responsible_employee_id: 1,
                    customer_id: 42,
                    customer_contact_person: None,
                    comment: None,
                    start_date: date(2025, 6, 30),
                    planned_end_date: date(2025, 1, 1),
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "End date must be after the start date");
    }

    #[tokio::test]
    async fn test_delete_requires_no_assignments() {
        let (service, _) = service_with(default_directory());
        let created = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap();
        service.add_employee(created.id, 2, "Java Developer", None).await.unwrap();

        let err = service.delete(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        service.remove_employee(created.id, 2).await.unwrap();
        service.delete(created.id).await.unwrap();
        assert!(matches!(service.delete(created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_employee_success() {
        let (service, _) = service_with(default_directory());
        let created = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap();

        let response = service
            .add_employee(created.id, 2, "Java Developer", Some("token"))
            .await
            .unwrap();

        assert_eq!(response.project_id, created.id);
        assert_eq!(response.project_name, "Alpha");
        assert_eq!(response.employee_name, "Jane Doe");

        let project = service.read_by_id(created.id).await.unwrap();
        let assignment = project.assignment_of(2).unwrap();
        assert_eq!(assignment.qualification, "Java Developer");
        assert_eq!(assignment.assigned_date, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn test_duplicate_is_detected_before_directory_calls() {
        let (service, directory) = service_with(default_directory());
        let created = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap();
        service.add_employee(created.id, 2, "Java Developer", None).await.unwrap();
        directory.calls.lock().unwrap().clear();

        let err = service
            .add_employee(created.id, 2, "Java Developer", None)
            .await
            .unwrap_err();

        match err {
            AppError::DuplicateAssignment { role, assigned_date, .. } => {
                assert_eq!(role.as_deref(), Some("Java Developer"));
                assert_eq!(assigned_date, Some(Utc::now().date_naive()));
            }
            other => panic!("expected duplicate assignment, got {:?}", other),
        }
        assert!(directory.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_employee_unknown_or_unqualified() {
        let (service, _) = service_with(default_directory());
        let created = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap();

        let err = service.add_employee(created.id, 99, "Java Developer", None).await.unwrap_err();
        assert!(matches!(err, AppError::EmployeeNotFound(99)));

        let err = service.add_employee(created.id, 3, "Java Developer", None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Employee does not have the required qualification: Java Developer."
        );

        let err = service.add_employee(created.id, 0, "Java Developer", None).await.unwrap_err();
        assert!(matches!(err, AppError::EmployeeNotFound(0)));
    }

    #[tokio::test]
    async fn test_add_employee_expired_qualification() {
        let mut directory = default_directory();
        directory
            .employees
            .insert(4, vec![("Scrum Master".to_string(), Some(date(2020, 1, 1)))]);
        let (service, _) = service_with(directory);
        let created = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap();

        let err = service.add_employee(created.id, 4, "Scrum Master", None).await.unwrap_err();
        assert!(matches!(err, AppError::QualificationExpired { .. }));
    }

    #[tokio::test]
    async fn test_time_conflict_reports_overlapping_projects() {
        let (service, _) = service_with(default_directory());
        let first = service
            .create(new_project("Alpha", date(2025, 1, 1), date(2025, 3, 31)), None)
            .await
            .unwrap();
        let second = service
            .create(new_project("Beta", date(2025, 3, 1), date(2025, 5, 31)), None)
            .await
            .unwrap();
        let third = service
            .create(new_project("Gamma", date(2025, 6, 1), date(2025, 8, 31)), None)
            .await
            .unwrap();

        service.add_employee(first.id, 2, "Java Developer", None).await.unwrap();

        let err = service.add_employee(second.id, 2, "Java Developer", None).await.unwrap_err();
        match err {
            AppError::TimeConflict { start, end, conflicting_projects } => {
                assert_eq!(start, date(2025, 1, 1));
                assert_eq!(end, date(2025, 3, 31));
                assert_eq!(conflicting_projects.len(), 1);
                assert_eq!(conflicting_projects[0].project_id, first.id);
                assert_eq!(conflicting_projects[0].project_name, "Alpha");
            }
            other => panic!("expected time conflict, got {:?}", other),
        }

        service.add_employee(third.id, 2, "Java Developer", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_employee_not_assigned() {
        let (service, _) = service_with(default_directory());
        let created = service
            .create(new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30)), None)
            .await
            .unwrap();

        let err = service.remove_employee(created.id, 2).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Employee with ID 2 is not assigned to project with ID {}.", created.id)
        );

        let err = service.remove_employee(77, 2).await.unwrap_err();
        assert_eq!(err.to_string(), "Project with ID 77 does not exist.");
    }

    #[tokio::test]
    async fn test_project_employees_and_employee_projects() {
        let (service, _) = service_with(default_directory());
        let mut project = new_project("Alpha", date(2025, 1, 15), date(2025, 6, 30));
        project.actual_end_date = Some(date(2025, 6, 1));
        let created = service.create(project, None).await.unwrap();
        service.add_employee(created.id, 3, "Tester", None).await.unwrap();
        service.add_employee(created.id, 2, "Java Developer", None).await.unwrap();

        let employees = service.project_employees(created.id).await.unwrap();
        assert_eq!(employees.designation, "Alpha");
        assert_eq!(employees.employees.len(), 2);
        assert_eq!(employees.employees[0].employee_id, 2);
        assert_eq!(employees.employees[1].qualification, "Tester");

        let projects = service.employee_projects(3, None).await.unwrap();
        assert_eq!(projects.employee_id, 3);
        assert_eq!(projects.projects.len(), 1);
        assert_eq!(projects.projects[0].role, "Tester");
        assert_eq!(projects.projects[0].end_date, date(2025, 6, 1));

        let err = service.employee_projects(0, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Employee with ID 0 does not exist.");
    }

    #[tokio::test]
    async fn test_find_with_filters() {
        let (service, _) = service_with(default_directory());
        let mut other = new_project("Other", date(2025, 1, 1), date(2025, 2, 1));
        other.customer_id = 7;
        other.responsible_employee_id = 2;
        service.create(other, None).await.unwrap();
        service
            .create(new_project("Mine", date(2025, 1, 1), date(2025, 2, 1)), None)
            .await
            .unwrap();

        assert_eq!(service.read_all().await.unwrap().len(), 2);
        let by_customer = service.find(ProjectFilter::Customer(7)).await.unwrap();
        assert_eq!(by_customer.len(), 1);
        assert_eq!(by_customer[0].designation, "Other");
        let by_manager = service.find(ProjectFilter::ResponsibleEmployee(1)).await.unwrap();
        assert_eq!(by_manager.len(), 1);
        assert_eq!(by_manager[0].designation, "Mine");
    }
}
