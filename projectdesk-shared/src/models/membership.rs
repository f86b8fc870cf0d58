/// Project membership model and database operations
///
/// A membership row binds a user to a project with a single role. A user may
/// hold several roles in the same project (one row each); the triple
/// `(project, user, role)` is unique so adding the same staff entry twice is
/// a no-op.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('creator', 'manager', 'executor');
///
/// CREATE TABLE project_users (
///     id BIGSERIAL PRIMARY KEY,
///     project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role project_role NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (project_id, user_id, role)
/// );
/// ```
///
/// # Roles
///
/// - **creator**: assigned once, at project creation; administers the project
/// - **manager**: creates and edits tasks
/// - **executor**: project staff with read access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

/// Per-project role carried by a membership row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Creator,
    Manager,
    Executor,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Creator => "creator",
            ProjectRole::Manager => "manager",
            ProjectRole::Executor => "executor",
        }
    }

    /// Whether this role may be granted through the project staff list
    ///
    /// The creator role is only ever assigned when the project is created.
    pub fn is_assignable(&self) -> bool {
        !matches!(self, ProjectRole::Creator)
    }
}

/// Membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectUser {
    pub id: i64,

    pub project_id: i64,

    pub user_id: i64,

    pub role: ProjectRole,

    pub created_at: DateTime<Utc>,
}

/// Staff entry joined with the member's username, as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StaffMember {
    pub user_id: i64,

    pub username: String,

    pub role: ProjectRole,
}

impl ProjectUser {
    /// Inserts the creator membership for a freshly created project
    pub async fn create_creator(
        tx: &mut Transaction<'_, Postgres>,
        project_id: i64,
        user_id: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProjectUser>(
            r#"
            INSERT INTO project_users (project_id, user_id, role)
            VALUES ($1, $2, 'creator')
            RETURNING id, project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Returns the existing membership for the triple or creates it
    ///
    /// The boolean is `true` when a new row was inserted.
    pub async fn get_or_create(
        tx: &mut Transaction<'_, Postgres>,
        project_id: i64,
        user_id: i64,
        role: ProjectRole,
    ) -> Result<(Self, bool), sqlx::Error> {
        let inserted = sqlx::query_as::<_, ProjectUser>(
            r#"
            INSERT INTO project_users (project_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, user_id, role) DO NOTHING
            RETURNING id, project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(membership) = inserted {
            return Ok((membership, true));
        }

        let existing = sqlx::query_as::<_, ProjectUser>(
            r#"
            SELECT id, project_id, user_id, role, created_at
            FROM project_users
            WHERE project_id = $1 AND user_id = $2 AND role = $3
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&mut **tx)
        .await?;

        Ok((existing, false))
    }

    /// Whether a membership with exactly this role exists
    pub async fn has_role(
        pool: &PgPool,
        project_id: i64,
        user_id: i64,
        role: ProjectRole,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM project_users
                WHERE project_id = $1 AND user_id = $2 AND role = $3
            )
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// All roles the user holds in the project (empty when not staff)
    pub async fn roles_of(
        pool: &PgPool,
        project_id: i64,
        user_id: i64,
    ) -> Result<Vec<ProjectRole>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT role FROM project_users
            WHERE project_id = $1 AND user_id = $2
            ORDER BY role
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Lists the staff of a project with usernames, in insertion order
    pub async fn list_staff(pool: &PgPool, project_id: i64) -> Result<Vec<StaffMember>, sqlx::Error> {
        sqlx::query_as::<_, StaffMember>(
            r#"
            SELECT pu.user_id, u.username, pu.role
            FROM project_users pu
            JOIN users u ON u.id = pu.user_id
            WHERE pu.project_id = $1
            ORDER BY pu.id ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_with_role(
        pool: &PgPool,
        project_id: i64,
        role: ProjectRole,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM project_users WHERE project_id = $1 AND role = $2")
            .bind(project_id)
            .bind(role)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_role_as_str() {
        assert_eq!(ProjectRole::Creator.as_str(), "creator");
        assert_eq!(ProjectRole::Manager.as_str(), "manager");
        assert_eq!(ProjectRole::Executor.as_str(), "executor");
    }

    #[test]
    fn test_creator_role_is_not_assignable() {
        assert!(!ProjectRole::Creator.is_assignable());
        assert!(ProjectRole::Manager.is_assignable());
        assert!(ProjectRole::Executor.is_assignable());
    }

    #[test]
    fn test_project_role_serde() {
        let role: ProjectRole = serde_json::from_str("\"manager\"").unwrap();
        assert_eq!(role, ProjectRole::Manager);
        assert!(serde_json::from_str::<ProjectRole>("\"owner\"").is_err());
    }
}
