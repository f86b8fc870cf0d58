/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     start_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     end_date TIMESTAMPTZ
/// );
/// ```
///
/// Deleting a project cascades to its memberships, tasks, task assignments
/// and comments through foreign keys.
///
/// # Example
///
/// ```no_run
/// use projectdesk_shared::models::project::{CreateProject, Project};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, creator_id: i64) -> Result<(), sqlx::Error> {
/// let project = Project::create(&pool, creator_id, CreateProject {
///     name: "Website relaunch".to_string(),
///     description: "Q3 redesign".to_string(),
///     start_date: None,
///     end_date: None,
/// }).await?;
///
/// assert!(Project::has_creator_access(&pool, project.id, creator_id).await?);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::membership::{ProjectRole, ProjectUser};

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,

    pub name: String,

    pub description: String,

    pub start_date: DateTime<Utc>,

    /// Not required to be after `start_date`
    pub end_date: Option<DateTime<Utc>>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,

    pub description: String,

    /// Defaults to the current time
    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

/// Partial update; only `Some` fields are written
///
/// `end_date: Some(None)` clears the end date.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,

    pub description: Option<String>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<Option<DateTime<Utc>>>,
}

impl UpdateProject {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

const PROJECT_COLUMNS: &str = "id, name, description, start_date, end_date";

impl Project {
    /// Creates a project and binds `creator_id` as its creator
    ///
    /// Both rows are written in one transaction so a project never exists
    /// without its creator membership.
    pub async fn create(
        pool: &PgPool,
        creator_id: i64,
        data: CreateProject,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (name, description, start_date, end_date)
            VALUES ($1, $2, COALESCE($3, NOW()), $4)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(&mut *tx)
        .await?;

        ProjectUser::create_creator(&mut tx, project.id, creator_id).await?;

        tx.commit().await?;

        tracing::info!(project_id = project.id, creator_id, "Project created");
        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id ASC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Projects in which the user holds any membership
    pub async fn list_for_staff(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS} FROM projects p
            WHERE EXISTS (
                SELECT 1 FROM project_users pu
                WHERE pu.project_id = p.id AND pu.user_id = $1
            )
            ORDER BY id ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update and appends staff entries in one transaction
    ///
    /// Staff entries use get-or-create semantics per `(user, role)`.
    pub async fn update_with_staff(
        pool: &PgPool,
        id: i64,
        data: UpdateProject,
        staff: &[(i64, ProjectRole)],
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                start_date = COALESCE($4, start_date),
                end_date = CASE WHEN $5 THEN $6 ELSE end_date END
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.start_date)
        .bind(data.end_date.is_some())
        .bind(data.end_date.flatten())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(project) = project else {
            return Ok(None);
        };

        for (user_id, role) in staff {
            let (_, created) = ProjectUser::get_or_create(&mut tx, id, *user_id, *role).await?;
            if created {
                tracing::debug!(project_id = id, user_id, role = role.as_str(), "Staff added");
            }
        }

        tx.commit().await?;
        Ok(Some(project))
    }

    /// Deletes the project; dependent rows go with it
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_creator_access(
        pool: &PgPool,
        project_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        ProjectUser::has_role(pool, project_id, user_id, ProjectRole::Creator).await
    }

    pub async fn has_manager_access(
        pool: &PgPool,
        project_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        ProjectUser::has_role(pool, project_id, user_id, ProjectRole::Manager).await
    }

    /// Whether the user is staff (any role) of the project
    pub async fn is_staff(pool: &PgPool, project_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_users WHERE project_id = $1 AND user_id = $2)",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_project_is_empty() {
        assert!(UpdateProject::default().is_empty());

        let update = UpdateProject {
            end_date: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
