/// Comment endpoints, nested under a task
///
/// # Endpoints
///
/// - `GET    /api/task/:task_id/comments/` - List comments of a task
/// - `POST   /api/task/:task_id/comments/` - Add a comment as the requester
/// - `GET    /api/task/:task_id/comments/:id/` - Comment detail
/// - `DELETE /api/task/:task_id/comments/:id/` - Delete a comment
///
/// A comment id that exists but belongs to another task is a 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use projectdesk_shared::{
    auth::{
        authorization::{authorize, Capability, Target},
        middleware::AuthContext,
    },
    models::{comment::Comment, task::Task},
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 10000, message = "Text must be between 1 and 10000 characters"))]
    pub text: String,
}

async fn find_task(state: &AppState, task_id: i64) -> ApiResult<Task> {
    Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

async fn find_comment(state: &AppState, task_id: i64, id: i64) -> ApiResult<Comment> {
    Comment::find_in_task(&state.db, task_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Comment>>> {
    let task = find_task(&state, task_id).await?;
    authorize(&state.db, &auth, Capability::ViewComments, Target::task(&task)).await?;

    Ok(Json(Comment::list_by_task(&state.db, task.id).await?))
}

/// Add a comment; the author is always the requester
///
/// ```text
/// POST /api/task/1/comments/
///
/// { "text": "Test comment" }
/// ```
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let task = find_task(&state, task_id).await?;
    authorize(&state.db, &auth, Capability::CreateComment, Target::task(&task)).await?;

    req.validate()?;

    let comment = Comment::create(&state.db, task.id, auth.user_id, &req.text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((task_id, id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<Comment>> {
    let task = find_task(&state, task_id).await?;
    authorize(&state.db, &auth, Capability::ViewComments, Target::task(&task)).await?;

    Ok(Json(find_comment(&state, task.id, id).await?))
}

/// Delete a comment; its author, task-level access holders or superuser
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((task_id, id)): ApiPath<(i64, i64)>,
) -> ApiResult<StatusCode> {
    let task = find_task(&state, task_id).await?;
    let comment = find_comment(&state, task.id, id).await?;

    authorize(
        &state.db,
        &auth,
        Capability::DeleteComment,
        Target::comment(&task, &comment),
    )
    .await?;

    Comment::delete(&state.db, comment.id).await?;
    tracing::info!(comment_id = comment.id, task_id, user_id = auth.user_id, "Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}
