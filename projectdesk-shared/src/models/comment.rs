/// Comment model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id BIGSERIAL PRIMARY KEY,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     text TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::task::Task;

/// Comment row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,

    #[serde(rename = "task")]
    pub task_id: i64,

    /// Author
    #[serde(rename = "user")]
    pub user_id: i64,

    pub text: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

const COMMENT_COLUMNS: &str = "id, task_id, user_id, text, created_at, updated_at";

impl Comment {
    pub async fn create(
        pool: &PgPool,
        task_id: i64,
        user_id: i64,
        text: &str,
    ) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (task_id, user_id, text)
            VALUES ($1, $2, $3)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(pool)
        .await?;

        tracing::debug!(comment_id = comment.id, task_id, user_id, "Comment created");
        Ok(comment)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a comment only if it belongs to the given task
    pub async fn find_in_task(
        pool: &PgPool,
        task_id: i64,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND task_id = $2"
        ))
        .bind(id)
        .bind(task_id)
        .fetch_optional(pool)
        .await
    }

    /// Comments of a task, oldest first
    pub async fn list_by_task(pool: &PgPool, task_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE task_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub fn is_author(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    /// Task-level access: creator or manager of the project, or assignee of the task
    ///
    /// The superuser bypass is applied by the caller.
    pub async fn user_has_access(&self, pool: &PgPool, user_id: i64) -> Result<bool, sqlx::Error> {
        match Task::find_by_id(pool, self.task_id).await? {
            Some(task) => task.user_has_access(pool, user_id).await,
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(author: i64) -> Comment {
        Comment {
            id: 1,
            task_id: 10,
            user_id: author,
            text: "Looks good".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_author() {
        let c = comment(5);
        assert!(c.is_author(5));
        assert!(!c.is_author(6));
    }

    #[test]
    fn test_comment_serialized_field_names() {
        let json = serde_json::to_value(comment(5)).unwrap();
        assert_eq!(json["task"], 10);
        assert_eq!(json["user"], 5);
        assert_eq!(json["text"], "Looks good");
        assert!(json.get("task_id").is_none());
    }
}
