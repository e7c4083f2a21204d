// /project-management/services/project-service/src/repository/memory.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::{
    models::{Assignment, NewProject, Project},
    repository::{duplicate_assignment, not_found, ProjectRepository},
    utils::error::AppResult,
};

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    projects: BTreeMap<i64, Project>,
}

/// In-process store with the same semantics as the PostgreSQL repository
#[derive(Default)]
pub struct MemoryProjectRepository {
    state: RwLock<MemoryState>,
}

impl MemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered<P>(&self, predicate: P) -> Vec<Project>
    where
        P: Fn(&Project) -> bool,
    {
        self.state
            .read()
            .await
            .projects
            .values()
            .filter(|p| predicate(p))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProjectRepository for MemoryProjectRepository {
    async fn insert(&self, project: NewProject) -> AppResult<Project> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = state.last_id;

        let project = Project {
            id,
            designation: project.designation,
            responsible_employee_id: project.responsible_employee_id,
            customer_id: project.customer_id,
            customer_contact_person: project.customer_contact_person,
            comment: project.comment,
            start_date: project.start_date,
            planned_end_date: project.planned_end_date,
            actual_end_date: project.actual_end_date,
            assignments: Vec::new(),
        };
        state.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn find_all(&self) -> AppResult<Vec<Project>> {
        Ok(self.filtered(|_| true).await)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Project>> {
        Ok(self.state.read().await.projects.get(&id).cloned())
    }

    async fn update(&self, project: &Project) -> AppResult<Project> {
        let mut state = self.state.write().await;
        let stored = state.projects.get_mut(&project.id).ok_or_else(|| not_found(project.id))?;

        stored.designation = project.designation.clone();
        stored.responsible_employee_id = project.responsible_employee_id;
        stored.customer_id = project.customer_id;
        stored.customer_contact_person = project.customer_contact_person.clone();
        stored.comment = project.comment.clone();
        stored.start_date = project.start_date;
        stored.planned_end_date = project.planned_end_date;
        stored.actual_end_date = project.actual_end_date;

        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.state.write().await.projects.remove(&id).is_some())
    }

    async fn find_by_responsible_employee(&self, employee_id: i64) -> AppResult<Vec<Project>> {
        Ok(self.filtered(|p| p.responsible_employee_id == employee_id).await)
    }

    async fn find_by_customer(&self, customer_id: i64) -> AppResult<Vec<Project>> {
        let mut projects = self.filtered(|p| p.customer_id == customer_id).await;
        projects.sort_by_key(|p| (p.start_date, p.id));
        Ok(projects)
    }

    async fn find_by_employee(&self, employee_id: i64) -> AppResult<Vec<Project>> {
        Ok(self.filtered(|p| p.has_employee(employee_id)).await)
    }

    async fn find_in_time_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Project>> {
        Ok(self
            .filtered(|p| p.start_date <= end && p.planned_end_date >= start)
            .await)
    }

    async fn add_assignment(&self, project_id: i64, assignment: Assignment) -> AppResult<()> {
        let mut state = self.state.write().await;
        let project = state.projects.get_mut(&project_id).ok_or_else(|| not_found(project_id))?;

        if project.has_employee(assignment.employee_id) {
            return Err(duplicate_assignment());
        }
        project.assignments.push(assignment);
        project.assignments.sort_by_key(|a| a.employee_id);
        Ok(())
    }

    async fn remove_assignment(&self, project_id: i64, employee_id: i64) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let Some(project) = state.projects.get_mut(&project_id) else {
            return Ok(false);
        };

        let before = project.assignments.len();
        project.assignments.retain(|a| a.employee_id != employee_id);
        Ok(project.assignments.len() < before)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
