/// Task endpoints
///
/// # Endpoints
///
/// - `GET    /api/task/` - List visible tasks
/// - `POST   /api/task/` - Create task in a project
/// - `GET    /api/task/:id/` - Task detail
/// - `PATCH  /api/task/:id/` - Partial update (assignees replaced as a set)
/// - `DELETE /api/task/:id/` - Delete task
/// - `GET    /api/task/time/:id/` - Derived timing fields

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, ApiJson, ApiPath},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use projectdesk_shared::{
    auth::{
        authorization::{authorize, Capability, Target},
        middleware::AuthContext,
    },
    models::{
        project::Project,
        task::{CreateTask, Task, TaskStatus, UpdateTask},
        user::User,
    },
    timing::TaskTiming,
};
use serde::Deserialize;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Owning project id
    pub project: Option<i64>,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    #[validate(required(message = "This field is required."))]
    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub status: Option<TaskStatus>,

    #[serde(default)]
    pub assigned_to: Vec<i64>,
}

/// Partial task update
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    pub status: Option<TaskStatus>,

    pub assigned_to: Option<Vec<i64>>,
}

async fn find_task(state: &AppState, id: i64) -> ApiResult<Task> {
    Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Rejects assignee lists naming users that do not exist
async fn validate_assignees(state: &AppState, ids: &[i64]) -> ApiResult<Vec<i64>> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let missing = User::missing_ids(&state.db, &ids).await?;
    if let Some(first) = missing.first() {
        return Err(ApiError::invalid_field(
            "assigned_to",
            format!("Invalid pk \"{}\" - object does not exist.", first),
        ));
    }

    Ok(ids)
}

/// List tasks
///
/// Superusers see every task; everyone else sees the tasks of projects
/// where they hold at least one role.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = if auth.is_superuser {
        Task::list_all(&state.db).await?
    } else {
        Task::list_for_staff(&state.db, auth.user_id).await?
    };

    Ok(Json(tasks))
}

/// Create a task
///
/// ```text
/// POST /api/task/
///
/// {
///   "title": "Test Task",
///   "description": "Task Description",
///   "project": 1,
///   "assigned_to": [2]
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: `project` missing or unknown
/// - `403 Forbidden`: requester is not creator or manager of the project
/// - `400 Bad Request`: invalid fields or unknown assignees
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let project_id = req
        .project
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    authorize(&state.db, &auth, Capability::CreateTask, Target::project(&project)).await?;

    req.validate()?;
    let assigned_to = validate_assignees(&state, &req.assigned_to).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id: project.id,
            title: req.title,
            description: req.description.unwrap_or_default(),
            due_date: req.due_date,
            status: req.status.unwrap_or_default(),
            assigned_to,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Task detail; project staff, assignees or superuser
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Task>> {
    let task = find_task(&state, id).await?;
    authorize(&state.db, &auth, Capability::ViewTask, Target::task(&task)).await?;

    Ok(Json(task))
}

/// Partially update a task; creator, manager or superuser
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = find_task(&state, id).await?;
    authorize(&state.db, &auth, Capability::UpdateTask, Target::task(&task)).await?;

    req.validate()?;

    let assigned_to = match req.assigned_to {
        Some(ids) => Some(validate_assignees(&state, &ids).await?),
        None => None,
    };

    let updated = Task::update(
        &state.db,
        id,
        UpdateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            status: req.status,
            assigned_to,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(task_id = id, user_id = auth.user_id, status = updated.status.as_str(), "Task updated");

    Ok(Json(updated))
}

/// Delete a task; creator, manager or superuser
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let task = find_task(&state, id).await?;
    authorize(&state.db, &auth, Capability::DeleteTask, Target::task(&task)).await?;

    Task::delete(&state.db, id).await?;
    tracing::info!(task_id = id, user_id = auth.user_id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Remaining time and age of a task
pub async fn task_timing(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<TaskTiming>> {
    let task = find_task(&state, id).await?;
    authorize(&state.db, &auth, Capability::ViewTaskTiming, Target::task(&task)).await?;

    Ok(Json(TaskTiming::derive(&task, Utc::now())))
}
