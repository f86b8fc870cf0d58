/// Task model and database operations
///
/// A task belongs to exactly one project and may be assigned to any number of
/// users through the `task_assignees` join table. Status values can be set in
/// any order; there is no transition state machine.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM (
///     'new', 'in_progress', 'on_checking', 'completed', 'canceled'
/// );
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     due_date TIMESTAMPTZ,
///     status task_status NOT NULL DEFAULT 'new',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_assignees (
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use super::project::Project;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    New,
    InProgress,
    OnChecking,
    Completed,
    Canceled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::OnChecking => "on_checking",
            TaskStatus::Completed => "completed",
            TaskStatus::Canceled => "canceled",
        }
    }

    /// Completed and canceled tasks are closed and can no longer be overdue
    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Canceled)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::New
    }
}

/// Task row with its assignee ids
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,

    #[serde(rename = "project")]
    pub project_id: i64,

    pub title: String,

    pub description: String,

    pub due_date: Option<DateTime<Utc>>,

    pub status: TaskStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// User ids of the assignees, ascending
    pub assigned_to: Vec<i64>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: i64,

    pub title: String,

    pub description: String,

    pub due_date: Option<DateTime<Utc>>,

    pub status: TaskStatus,

    pub assigned_to: Vec<i64>,
}

/// Partial update; only `Some` fields are written
///
/// `assigned_to: Some(ids)` replaces the whole assignee set.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,

    pub description: Option<String>,

    pub due_date: Option<Option<DateTime<Utc>>>,

    pub status: Option<TaskStatus>,

    pub assigned_to: Option<Vec<i64>>,
}

const TASK_SELECT: &str = r#"
    SELECT t.id, t.project_id, t.title, t.description, t.due_date, t.status,
           t.created_at, t.updated_at,
           COALESCE(
               ARRAY(SELECT ta.user_id FROM task_assignees ta WHERE ta.task_id = t.id ORDER BY ta.user_id),
               '{}'
           ) AS assigned_to
    FROM tasks t
"#;

impl Task {
    /// Creates a task together with its assignees
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let task_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (project_id, title, description, due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(data.project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date)
        .bind(data.status)
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_assignees(&mut tx, task_id, &data.assigned_to).await?;

        let task = Self::fetch_in(&mut tx, task_id).await?;
        tx.commit().await?;

        tracing::info!(task_id, project_id = task.project_id, "Task created");
        Ok(task)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("{TASK_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("{TASK_SELECT} ORDER BY t.id ASC"))
            .fetch_all(pool)
            .await
    }

    /// Tasks of every project where the user holds any membership
    pub async fn list_for_staff(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"{TASK_SELECT}
            WHERE EXISTS (
                SELECT 1 FROM project_users pu
                WHERE pu.project_id = t.project_id AND pu.user_id = $1
            )
            ORDER BY t.id ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update and refreshes `updated_at`
    pub async fn update(pool: &PgPool, id: i64, data: UpdateTask) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                due_date = CASE WHEN $4 THEN $5 ELSE due_date END,
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date.is_some())
        .bind(data.due_date.flatten())
        .bind(data.status)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(assignees) = data.assigned_to {
            Self::replace_assignees(&mut tx, id, &assignees).await?;
        }

        let task = Self::fetch_in(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Some(task))
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_creator_access(&self, pool: &PgPool, user_id: i64) -> Result<bool, sqlx::Error> {
        Project::has_creator_access(pool, self.project_id, user_id).await
    }

    pub async fn has_manager_access(&self, pool: &PgPool, user_id: i64) -> Result<bool, sqlx::Error> {
        Project::has_manager_access(pool, self.project_id, user_id).await
    }

    /// Executor access means being one of the task's assignees
    pub async fn has_executor_access(pool: &PgPool, task_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM task_assignees WHERE task_id = $1 AND user_id = $2)",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Creator OR manager of the project, OR assignee of the task
    pub async fn user_has_access(&self, pool: &PgPool, user_id: i64) -> Result<bool, sqlx::Error> {
        Ok(self.has_creator_access(pool, user_id).await?
            || self.has_manager_access(pool, user_id).await?
            || Self::has_executor_access(pool, self.id, user_id).await?)
    }

    async fn replace_assignees(
        tx: &mut Transaction<'_, Postgres>,
        task_id: i64,
        user_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO task_assignees (task_id, user_id)
            SELECT $1, assignee FROM UNNEST($2::BIGINT[]) AS assignee
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_ids)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn fetch_in(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("{TASK_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_one(&mut **tx)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::New.as_str(), "new");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::OnChecking.as_str(), "on_checking");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
        assert_eq!(TaskStatus::Canceled.as_str(), "canceled");
    }

    #[test]
    fn test_task_status_serde_matches_database_labels() {
        let status: TaskStatus = serde_json::from_str("\"on_checking\"").unwrap();
        assert_eq!(status, TaskStatus::OnChecking);
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_closed_statuses() {
        assert!(TaskStatus::Completed.is_closed());
        assert!(TaskStatus::Canceled.is_closed());
        assert!(!TaskStatus::New.is_closed());
        assert!(!TaskStatus::InProgress.is_closed());
        assert!(!TaskStatus::OnChecking.is_closed());
        assert_eq!(TaskStatus::default(), TaskStatus::New);
    }

    #[test]
    fn test_task_serializes_project_field() {
        let task = Task {
            id: 1,
            project_id: 42,
            title: "Write docs".to_string(),
            description: String::new(),
            due_date: None,
            status: TaskStatus::New,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            assigned_to: vec![3, 5],
        };

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["project"], 42);
        assert_eq!(json["assigned_to"], serde_json::json!([3, 5]));
        assert_eq!(json["status"], "new");
    }
}
