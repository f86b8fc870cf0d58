/// Database plumbing: the connection pool and schema migrations
///
/// SQL for each entity lives with its model under `crate::models`.
///
/// ```no_run
/// use projectdesk_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// # async fn boot(url: String) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::for_url(url, 10)).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod migrations;
pub mod pool;
