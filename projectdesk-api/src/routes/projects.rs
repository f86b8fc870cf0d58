/// Project endpoints
///
/// # Endpoints
///
/// - `GET    /api/projects/` - List visible projects
/// - `POST   /api/projects/` - Create project (requester becomes creator)
/// - `GET    /api/projects/:id/` - Project detail with staff
/// - `PATCH  /api/projects/:id/` - Partial update, optionally adding staff
/// - `DELETE /api/projects/:id/` - Delete project and everything under it
/// - `GET    /api/projects/time/:id/` - Derived timing fields

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
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
        membership::{ProjectRole, ProjectUser, StaffMember},
        project::{CreateProject, Project, UpdateProject},
        user::User,
    },
    timing::ProjectTiming,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(required(message = "This field is required."))]
    pub description: Option<String>,

    pub start_date: Option<DateTime<Utc>>,

    pub end_date: Option<DateTime<Utc>>,
}

/// Staff entry in a PATCH body
#[derive(Debug, Clone, Deserialize)]
pub struct StaffEntry {
    pub user_id: i64,

    pub role: ProjectRole,
}

/// Partial project update
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,

    pub start_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,

    pub staff: Option<Vec<StaffEntry>>,
}

/// Project with its staff
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    #[serde(flatten)]
    pub project: Project,

    pub staff: Vec<StaffMember>,
}

impl ProjectResponse {
    async fn load(state: &AppState, project: Project) -> ApiResult<Self> {
        let staff = ProjectUser::list_staff(&state.db, project.id).await?;
        Ok(Self { project, staff })
    }
}

async fn find_project(state: &AppState, id: i64) -> ApiResult<Project> {
    Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

/// Checks staff entries: assignable roles and existing users
async fn validate_staff(state: &AppState, staff: &[StaffEntry]) -> ApiResult<()> {
    let mut errors = Vec::new();

    for entry in staff.iter().filter(|e| !e.role.is_assignable()) {
        errors.push(ValidationErrorDetail::new(
            "staff",
            format!(
                "Role '{}' cannot be assigned (user {})",
                entry.role.as_str(),
                entry.user_id
            ),
        ));
    }

    let ids: Vec<i64> = staff.iter().map(|e| e.user_id).collect();
    for missing in User::missing_ids(&state.db, &ids).await? {
        errors.push(ValidationErrorDetail::new(
            "staff",
            format!("User {} does not exist", missing),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(errors))
    }
}

/// List projects
///
/// Superusers see every project; everyone else sees projects where they
/// hold at least one role.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = if auth.is_superuser {
        Project::list_all(&state.db).await?
    } else {
        Project::list_for_staff(&state.db, auth.user_id).await?
    };

    Ok(Json(projects))
}

/// Create a project
///
/// ```text
/// POST /api/projects/
///
/// { "name": "Test Project", "description": "Test Description" }
/// ```
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    req.validate()?;

    let project = Project::create(
        &state.db,
        auth.user_id,
        CreateProject {
            name: req.name,
            description: req.description.unwrap_or_default(),
            start_date: req.start_date,
            end_date: req.end_date,
        },
    )
    .await?;

    let response = ProjectResponse::load(&state, project).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Project detail; staff or superuser only
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ProjectResponse>> {
    let project = find_project(&state, id).await?;
    authorize(&state.db, &auth, Capability::ViewProject, Target::project(&project)).await?;

    Ok(Json(ProjectResponse::load(&state, project).await?))
}

/// Partially update a project; creator or superuser only
///
/// ```text
/// PATCH /api/projects/1/
///
/// {
///   "name": "Updated Project",
///   "staff": [{ "user_id": 2, "role": "manager" }]
/// }
/// ```
///
/// Staff entries are added with get-or-create semantics and never removed.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    let project = find_project(&state, id).await?;
    authorize(&state.db, &auth, Capability::UpdateProject, Target::project(&project)).await?;

    req.validate()?;

    let staff = req.staff.unwrap_or_default();
    validate_staff(&state, &staff).await?;

    let assignments: Vec<(i64, ProjectRole)> =
        staff.iter().map(|e| (e.user_id, e.role)).collect();

    let updated = Project::update_with_staff(
        &state.db,
        id,
        UpdateProject {
            name: req.name,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
        },
        &assignments,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = id, user_id = auth.user_id, "Project updated");

    Ok(Json(ProjectResponse::load(&state, updated).await?))
}

/// Delete a project; creator or superuser only
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let project = find_project(&state, id).await?;
    authorize(&state.db, &auth, Capability::DeleteProject, Target::project(&project)).await?;

    Project::delete(&state.db, id).await?;
    tracing::info!(project_id = id, user_id = auth.user_id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Elapsed, remaining and total time of a project
pub async fn project_timing(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ProjectTiming>> {
    let project = find_project(&state, id).await?;
    authorize(
        &state.db,
        &auth,
        Capability::ViewProjectTiming,
        Target::project(&project),
    )
    .await?;

    Ok(Json(ProjectTiming::derive(&project, Utc::now())))
}
