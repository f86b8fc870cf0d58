/// API route handlers, organized by resource
///
/// - `health`: health check
/// - `auth`: register, login, logout, token refresh
/// - `projects`: project CRUD, staff assignment, timing
/// - `tasks`: task CRUD, assignees, timing
/// - `comments`: comments nested under tasks

pub mod auth;
pub mod comments;
pub mod health;
pub mod projects;
pub mod tasks;
