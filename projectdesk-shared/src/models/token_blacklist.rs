/// Revoked refresh tokens
///
/// Logging out blacklists the refresh token's `jti`. Refresh and logout both
/// consult this table before trusting a refresh token.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE token_blacklist (
///     jti UUID PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     blacklisted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct TokenBlacklist;

impl TokenBlacklist {
    /// Blacklists a token id; repeated calls are no-ops
    ///
    /// Returns `true` when the jti was newly inserted.
    pub async fn blacklist(
        pool: &PgPool,
        jti: Uuid,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO token_blacklist (jti, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_blacklisted(pool: &PgPool, jti: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE jti = $1)")
            .bind(jti)
            .fetch_one(pool)
            .await
    }

    /// Removes entries whose token would have expired anyway
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < NOW()")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
