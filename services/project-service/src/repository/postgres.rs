// /project-management/services/project-service/src/repository/postgres.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use crate::{
    models::{Assignment, NewProject, Project, ProjectRow},
    repository::{duplicate_assignment, not_found, ProjectRepository},
    utils::error::{AppError, AppResult},
};

const PROJECT_COLUMNS: &str = "p.id, p.designation, p.responsible_employee_id, p.customer_id, \
     p.customer_contact_person, p.comment, p.start_date, p.planned_end_date, p.actual_end_date";

#[derive(Debug, FromRow)]
struct AssignmentRow {
    project_id: i64,
    employee_id: i64,
    qualification: String,
    assigned_date: NaiveDate,
}

/// PostgreSQL repository for projects
pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Attach assignments to a batch of project rows
    async fn with_assignments(&self, rows: Vec<ProjectRow>) -> AppResult<Vec<Project>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let assignment_rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT project_id, employee_id, qualification, assigned_date
            FROM project_employee_assignments
            WHERE project_id = ANY($1)
            ORDER BY project_id, employee_id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_project: HashMap<i64, Vec<Assignment>> = HashMap::new();
        for row in assignment_rows {
            by_project.entry(row.project_id).or_default().push(Assignment {
                employee_id: row.employee_id,
                qualification: row.qualification,
                assigned_date: row.assigned_date,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let assignments = by_project.remove(&row.id).unwrap_or_default();
                row.into_project(assignments)
            })
            .collect())
    }

    async fn fetch_projects(&self, sql: &str, param: Option<i64>) -> AppResult<Vec<Project>> {
        let mut query = sqlx::query_as::<_, ProjectRow>(sql);
        if let Some(value) = param {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.with_assignments(rows).await
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn insert(&self, project: NewProject) -> AppResult<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects (
                designation, responsible_employee_id, customer_id, customer_contact_person,
                comment, start_date, planned_end_date, actual_end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, designation, responsible_employee_id, customer_id,
                      customer_contact_person, comment, start_date, planned_end_date, actual_end_date
            "#,
        )
        .bind(&project.designation)
        .bind(project.responsible_employee_id)
        .bind(project.customer_id)
        .bind(&project.customer_contact_person)
        .bind(&project.comment)
        .bind(project.start_date)
        .bind(project.planned_end_date)
        .bind(project.actual_end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!("Inserted project {}", row.id);
        Ok(row.into_project(Vec::new()))
    }

    async fn find_all(&self) -> AppResult<Vec<Project>> {
        let sql = format!("SELECT {} FROM projects p ORDER BY p.id", PROJECT_COLUMNS);
        self.fetch_projects(&sql, None).await
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Project>> {
        let sql = format!("SELECT {} FROM projects p WHERE p.id = $1", PROJECT_COLUMNS);
        Ok(self.fetch_projects(&sql, Some(id)).await?.into_iter().next())
    }

    async fn update(&self, project: &Project) -> AppResult<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            UPDATE projects
            SET designation = $2,
                responsible_employee_id = $3,
                customer_id = $4,
                customer_contact_person = $5,
                comment = $6,
                start_date = $7,
                planned_end_date = $8,
                actual_end_date = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, designation, responsible_employee_id, customer_id,
                      customer_contact_person, comment, start_date, planned_end_date, actual_end_date
            "#,
        )
        .bind(project.id)
        .bind(&project.designation)
        .bind(project.responsible_employee_id)
        .bind(project.customer_id)
        .bind(&project.customer_contact_person)
        .bind(&project.comment)
        .bind(project.start_date)
        .bind(project.planned_end_date)
        .bind(project.actual_end_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| not_found(project.id))?;

        self.with_assignments(vec![row])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(project.id))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_responsible_employee(&self, employee_id: i64) -> AppResult<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects p WHERE p.responsible_employee_id = $1 ORDER BY p.id",
            PROJECT_COLUMNS
        );
        self.fetch_projects(&sql, Some(employee_id)).await
    }

    async fn find_by_customer(&self, customer_id: i64) -> AppResult<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects p WHERE p.customer_id = $1 ORDER BY p.start_date, p.id",
            PROJECT_COLUMNS
        );
        self.fetch_projects(&sql, Some(customer_id)).await
    }

    async fn find_by_employee(&self, employee_id: i64) -> AppResult<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects p \
             JOIN project_employee_assignments a ON a.project_id = p.id \
             WHERE a.employee_id = $1 ORDER BY p.id",
            PROJECT_COLUMNS
        );
        self.fetch_projects(&sql, Some(employee_id)).await
    }

    async fn find_in_time_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects p \
             WHERE p.start_date <= $1 AND p.planned_end_date >= $2 ORDER BY p.id",
            PROJECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(end)
            .bind(start)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.with_assignments(rows).await
    }

    async fn add_assignment(&self, project_id: i64, assignment: Assignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO project_employee_assignments (project_id, employee_id, qualification, assigned_date)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(project_id)
        .bind(assignment.employee_id)
        .bind(&assignment.qualification)
        .bind(assignment.assigned_date)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let code = match &e {
                sqlx::Error::Database(db) => db.code().map(|c| c.to_string()),
                _ => None,
            };
            match code.as_deref() {
                Some("23505") => duplicate_assignment(),
                Some("23503") => not_found(project_id),
                _ => AppError::from(e),
            }
        })?;

        Ok(())
    }

    async fn remove_assignment(&self, project_id: i64, employee_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM project_employee_assignments WHERE project_id = $1 AND employee_id = $2",
        )
        .bind(project_id)
        .bind(employee_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

// Run against a scratch database with `DATABASE_URL` set:
// cargo test -p project-service -- --ignored
#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_project(designation: &str, customer_id: i64, start: NaiveDate, end: NaiveDate) -> NewProject {
        NewProject {
            designation: designation.to_string(),
            responsible_employee_id: 1,
            customer_id,
            customer_contact_person: Some("Ms. Smith".to_string()),
            comment: None,
            start_date: start,
            planned_end_date: end,
            actual_end_date: None,
        }
    }

    fn assignment(employee_id: i64, qualification: &str) -> Assignment {
        Assignment {
            employee_id,
            qualification: qualification.to_string(),
            assigned_date: date(2025, 1, 1),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs PostgreSQL via DATABASE_URL"]
    async fn test_insert_and_load_with_assignments(pool: PgPool) {
        let repo = PgProjectRepository::new(pool);
        let a = repo.insert(new_project("A", 1, date(2025, 1, 1), date(2025, 2, 1))).await.unwrap();
        let b = repo.insert(new_project("B", 1, date(2025, 1, 1), date(2025, 2, 1))).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(a.customer_contact_person.as_deref(), Some("Ms. Smith"));

        repo.add_assignment(a.id, assignment(7, "Java")).await.unwrap();
        repo.add_assignment(a.id, assignment(3, "Rust")).await.unwrap();
        repo.add_assignment(b.id, assignment(3, "Rust")).await.unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].employee_ids(), vec![3, 7]);
        assert_eq!(all[1].employee_ids(), vec![3]);

        let loaded = repo.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(loaded.assignments[1].qualification, "Java");
        assert!(repo.find_by_id(b.id + 100).await.unwrap().is_none());

        let for_employee = repo.find_by_employee(3).await.unwrap();
        assert_eq!(for_employee.len(), 2);
        assert_eq!(for_employee[0].employee_ids(), vec![3, 7]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs PostgreSQL via DATABASE_URL"]
    async fn test_customer_projects_ordered_by_start(pool: PgPool) {
        let repo = PgProjectRepository::new(pool);
        repo.insert(new_project("Late", 7, date(2025, 5, 1), date(2025, 6, 1))).await.unwrap();
        repo.insert(new_project("Early", 7, date(2025, 1, 1), date(2025, 2, 1))).await.unwrap();
        repo.insert(new_project("Other", 8, date(2024, 1, 1), date(2024, 2, 1))).await.unwrap();

        let projects = repo.find_by_customer(7).await.unwrap();
        let names: Vec<&str> = projects.iter().map(|p| p.designation.as_str()).collect();
        assert_eq!(names, vec!["Early", "Late"]);
        assert_eq!(repo.find_by_responsible_employee(1).await.unwrap().len(), 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs PostgreSQL via DATABASE_URL"]
    async fn test_time_range_is_inclusive(pool: PgPool) {
        let repo = PgProjectRepository::new(pool);
        repo.insert(new_project("Q1", 1, date(2025, 1, 1), date(2025, 3, 31))).await.unwrap();
        repo.insert(new_project("Q3", 1, date(2025, 7, 1), date(2025, 9, 30))).await.unwrap();

        let hits = repo.find_in_time_range(date(2025, 3, 31), date(2025, 6, 30)).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|p| p.designation.as_str()).collect();
        assert_eq!(names, vec!["Q1"]);

        let hits = repo.find_in_time_range(date(2025, 4, 1), date(2025, 7, 1)).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|p| p.designation.as_str()).collect();
        assert_eq!(names, vec!["Q3"]);

        assert!(repo.find_in_time_range(date(2025, 4, 1), date(2025, 6, 30)).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs PostgreSQL via DATABASE_URL"]
    async fn test_assignment_constraint_errors(pool: PgPool) {
        let repo = PgProjectRepository::new(pool);
        let p = repo.insert(new_project("A", 1, date(2025, 1, 1), date(2025, 2, 1))).await.unwrap();

        repo.add_assignment(p.id, assignment(5, "Java")).await.unwrap();
        let duplicate = repo.add_assignment(p.id, assignment(5, "Java")).await.unwrap_err();
        assert!(matches!(duplicate, AppError::Conflict(_)));

        let missing = repo.add_assignment(p.id + 100, assignment(5, "Java")).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        assert!(repo.remove_assignment(p.id, 5).await.unwrap());
        assert!(!repo.remove_assignment(p.id, 5).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs PostgreSQL via DATABASE_URL"]
    async fn test_delete_cascades_to_assignments(pool: PgPool) {
        let repo = PgProjectRepository::new(pool.clone());
        let p = repo.insert(new_project("A", 1, date(2025, 1, 1), date(2025, 2, 1))).await.unwrap();
        repo.add_assignment(p.id, assignment(5, "Java")).await.unwrap();

        assert!(repo.delete(p.id).await.unwrap());
        assert!(!repo.delete(p.id).await.unwrap());

        let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM project_employee_assignments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(repo.find_by_employee(5).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs PostgreSQL via DATABASE_URL"]
    async fn test_update_keeps_assignments(pool: PgPool) {
        let repo = PgProjectRepository::new(pool);
        let mut p = repo.insert(new_project("A", 1, date(2025, 1, 1), date(2025, 2, 1))).await.unwrap();
        repo.add_assignment(p.id, assignment(3, "Java")).await.unwrap();

        p.designation = "Renamed".to_string();
        p.actual_end_date = Some(date(2025, 1, 20));
        p.assignments.clear();
        let updated = repo.update(&p).await.unwrap();

        assert_eq!(updated.designation, "Renamed");
        assert_eq!(updated.actual_end_date, Some(date(2025, 1, 20)));
        assert_eq!(updated.employee_ids(), vec![3]);

        repo.delete(p.id).await.unwrap();
        assert!(matches!(repo.update(&p).await, Err(AppError::NotFound(_))));
        repo.ping().await.unwrap();
    }
}
