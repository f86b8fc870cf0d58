/// Schema migrations
///
/// The SQL files under the workspace `migrations/` directory are embedded at
/// compile time with `sqlx::migrate!` and applied in version order. sqlx
/// takes an advisory lock while migrating, so several processes (or test
/// binaries) may call [`run_migrations`] at once.
///
/// # Example
///
/// ```no_run
/// use projectdesk_shared::db::migrations::run_migrations;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{
    migrate::{MigrateDatabase, MigrateError, Migrator},
    postgres::PgPool,
    Postgres,
};
use tracing::{debug, error, info};

static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// What `_sqlx_migrations` says about the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,

    /// Version prefix of the newest applied file
    pub latest_version: Option<i64>,
}

/// Applies every pending migration
///
/// # Errors
///
/// Fails when a file cannot be applied or an applied file was edited after
/// the fact (checksum mismatch).
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(available = MIGRATOR.iter().count(), "Applying database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database migrations applied");
    Ok(())
}

/// Counts successfully applied migrations
///
/// A database that was never migrated reports zero.
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let migrated: bool =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;

    if !migrated {
        debug!("No migrations table yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
        });
    }

    let (applied, latest_version): (i64, Option<i64>) =
        sqlx::query_as("SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await?;

    Ok(MigrationStatus {
        applied_migrations: usize::try_from(applied).unwrap_or_default(),
        latest_version,
    })
}

/// Creates the database named in the URL when it is missing
///
/// Used by the test suites so a fresh `DATABASE_URL` works out of the box.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database exists");
        return Ok(());
    }

    info!("Creating database");
    Postgres::create_database(database_url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert_eq!(versions.len(), 5);
        assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
