/// Database models for ProjectDesk
///
/// Each model owns its SQL and exposes async CRUD functions taking a `PgPool`
/// (or a transaction for multi-row writes).
///
/// # Models
///
/// - `user`: accounts, credentials, superuser flag
/// - `project`: projects and their staff-aware listings
/// - `membership`: per-project role rows (creator, manager, executor)
/// - `task`: tasks with status and assignees
/// - `comment`: comments on tasks
/// - `token_blacklist`: revoked refresh tokens
///
/// # Example
///
/// ```no_run
/// use projectdesk_shared::models::user::{CreateUser, User, UserRole};
/// use projectdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Executor,
///     is_superuser: false,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod comment;
pub mod membership;
pub mod project;
pub mod task;
pub mod token_blacklist;
pub mod user;
