/// Project-level access control
///
/// Every protected operation is named by a [`Capability`]. A static policy
/// table ([`Capability::requirement`]) maps each capability to the project
/// roles that grant it and whether being the task's assignee or the comment's
/// author also grants it.
///
/// [`authorize`] is the single entry point used by handlers:
///
/// 1. superusers are allowed immediately (the only place this bypass lives);
/// 2. [`AccessFacts`] are loaded for the target with fresh queries;
/// 3. the pure [`evaluate`] function decides.
///
/// # Policy
///
/// | Capability        | Roles                       | Assignee | Author |
/// |-------------------|-----------------------------|----------|--------|
/// | ViewProject       | creator, manager, executor  |          |        |
/// | UpdateProject     | creator                     |          |        |
/// | DeleteProject     | creator                     |          |        |
/// | ViewProjectTiming | creator, manager, executor  |          |        |
/// | CreateTask        | creator, manager            |          |        |
/// | ViewTask          | creator, manager, executor  | yes      |        |
/// | UpdateTask        | creator, manager            |          |        |
/// | DeleteTask        | creator, manager            |          |        |
/// | ViewTaskTiming    | creator, manager, executor  | yes      |        |
/// | ViewComments      | creator, manager            | yes      |        |
/// | CreateComment     | creator, manager            | yes      |        |
/// | DeleteComment     | creator, manager            | yes      | yes    |
///
/// # Example
///
/// ```no_run
/// use projectdesk_shared::auth::authorization::{authorize, Capability, Target};
/// use projectdesk_shared::auth::middleware::AuthContext;
/// use projectdesk_shared::models::project::Project;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, auth: AuthContext, project: Project) -> Result<(), Box<dyn std::error::Error>> {
/// authorize(&pool, &auth, Capability::UpdateProject, Target::project(&project)).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;

use super::middleware::AuthContext;
use crate::models::{
    comment::Comment,
    membership::{ProjectRole, ProjectUser},
    project::Project,
    task::Task,
};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Access denied")]
    Denied,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// A protected operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ViewProject,
    UpdateProject,
    DeleteProject,
    ViewProjectTiming,
    CreateTask,
    ViewTask,
    UpdateTask,
    DeleteTask,
    ViewTaskTiming,
    ViewComments,
    CreateComment,
    DeleteComment,
}

const STAFF: &[ProjectRole] = &[ProjectRole::Creator, ProjectRole::Manager, ProjectRole::Executor];
const LEADS: &[ProjectRole] = &[ProjectRole::Creator, ProjectRole::Manager];
const CREATOR: &[ProjectRole] = &[ProjectRole::Creator];

/// What grants a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    /// Holding any of these project roles grants access
    pub roles: &'static [ProjectRole],

    /// Being assigned to the task grants access
    pub assignee: bool,

    /// Being the comment's author grants access
    pub author: bool,
}

impl Requirement {
    const fn roles(roles: &'static [ProjectRole]) -> Self {
        Self {
            roles,
            assignee: false,
            author: false,
        }
    }

    const fn or_assignee(self) -> Self {
        Self {
            assignee: true,
            ..self
        }
    }

    const fn or_author(self) -> Self {
        Self {
            author: true,
            ..self
        }
    }
}

impl Capability {
    pub const ALL: [Capability; 12] = [
        Capability::ViewProject,
        Capability::UpdateProject,
        Capability::DeleteProject,
        Capability::ViewProjectTiming,
        Capability::CreateTask,
        Capability::ViewTask,
        Capability::UpdateTask,
        Capability::DeleteTask,
        Capability::ViewTaskTiming,
        Capability::ViewComments,
        Capability::CreateComment,
        Capability::DeleteComment,
    ];

    /// Policy table
    pub const fn requirement(self) -> Requirement {
        match self {
            Capability::ViewProject | Capability::ViewProjectTiming => Requirement::roles(STAFF),
            Capability::UpdateProject | Capability::DeleteProject => Requirement::roles(CREATOR),
            Capability::CreateTask | Capability::UpdateTask | Capability::DeleteTask => {
                Requirement::roles(LEADS)
            }
            Capability::ViewTask | Capability::ViewTaskTiming => {
                Requirement::roles(STAFF).or_assignee()
            }
            Capability::ViewComments | Capability::CreateComment => {
                Requirement::roles(LEADS).or_assignee()
            }
            Capability::DeleteComment => Requirement::roles(LEADS).or_assignee().or_author(),
        }
    }
}

/// The entity a capability is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Project {
        project_id: i64,
    },
    Task {
        project_id: i64,
        task_id: i64,
    },
    Comment {
        project_id: i64,
        task_id: i64,
        author_id: i64,
    },
}

impl Target {
    pub fn project(project: &Project) -> Self {
        Target::Project {
            project_id: project.id,
        }
    }

    pub fn task(task: &Task) -> Self {
        Target::Task {
            project_id: task.project_id,
            task_id: task.id,
        }
    }

    pub fn comment(task: &Task, comment: &Comment) -> Self {
        Target::Comment {
            project_id: task.project_id,
            task_id: task.id,
            author_id: comment.user_id,
        }
    }

    fn project_id(&self) -> i64 {
        match *self {
            Target::Project { project_id }
            | Target::Task { project_id, .. }
            | Target::Comment { project_id, .. } => project_id,
        }
    }

    fn task_id(&self) -> Option<i64> {
        match *self {
            Target::Project { .. } => None,
            Target::Task { task_id, .. } | Target::Comment { task_id, .. } => Some(task_id),
        }
    }
}

/// Everything the policy needs to know about a principal and a target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessFacts {
    /// Roles held in the target's project
    pub roles: Vec<ProjectRole>,

    pub is_assignee: bool,

    pub is_author: bool,
}

impl AccessFacts {
    /// Queries memberships and assignments; nothing is cached
    ///
    /// All roles come from one `roles_of` query rather than one
    /// `has_*_access` predicate per role.
    pub async fn load(pool: &PgPool, user_id: i64, target: Target) -> Result<Self, sqlx::Error> {
        let roles = ProjectUser::roles_of(pool, target.project_id(), user_id).await?;

        let is_assignee = match target.task_id() {
            Some(task_id) => Task::has_executor_access(pool, task_id, user_id).await?,
            None => false,
        };

        let is_author = matches!(target, Target::Comment { author_id, .. } if author_id == user_id);

        Ok(Self {
            roles,
            is_assignee,
            is_author,
        })
    }
}

/// Pure policy decision
pub fn evaluate(requirement: Requirement, facts: &AccessFacts) -> bool {
    facts.roles.iter().any(|role| requirement.roles.contains(role))
        || (requirement.assignee && facts.is_assignee)
        || (requirement.author && facts.is_author)
}

/// Allows or denies `capability` on `target` for the principal
///
/// # Errors
///
/// `AuthzError::Denied` when the policy rejects the request,
/// `AuthzError::DatabaseError` when loading facts fails.
pub async fn authorize(
    pool: &PgPool,
    principal: &AuthContext,
    capability: Capability,
    target: Target,
) -> Result<(), AuthzError> {
    if principal.is_superuser {
        return Ok(());
    }

    let facts = AccessFacts::load(pool, principal.user_id, target).await?;

    if evaluate(capability.requirement(), &facts) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = principal.user_id,
            ?capability,
            ?target,
            "Access denied"
        );
        Err(AuthzError::Denied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(roles: &[ProjectRole], is_assignee: bool, is_author: bool) -> AccessFacts {
        AccessFacts {
            roles: roles.to_vec(),
            is_assignee,
            is_author,
        }
    }

    fn allowed(capability: Capability, facts: &AccessFacts) -> bool {
        evaluate(capability.requirement(), facts)
    }

    #[test]
    fn test_no_facts_grant_nothing() {
        let outsider = AccessFacts::default();
        for capability in Capability::ALL {
            assert!(!allowed(capability, &outsider), "{:?} granted to outsider", capability);
        }
    }

    #[test]
    fn test_creator_has_every_role_based_capability() {
        let creator = facts(&[ProjectRole::Creator], false, false);
        for capability in Capability::ALL {
            assert!(allowed(capability, &creator), "{:?} denied to creator", capability);
        }
    }

    #[test]
    fn test_manager_cannot_administer_project() {
        let manager = facts(&[ProjectRole::Manager], false, false);

        assert!(allowed(Capability::ViewProject, &manager));
        assert!(allowed(Capability::CreateTask, &manager));
        assert!(allowed(Capability::UpdateTask, &manager));
        assert!(allowed(Capability::DeleteTask, &manager));
        assert!(allowed(Capability::DeleteComment, &manager));

        assert!(!allowed(Capability::UpdateProject, &manager));
        assert!(!allowed(Capability::DeleteProject, &manager));
    }

    #[test]
    fn test_executor_is_read_only_on_project() {
        let executor = facts(&[ProjectRole::Executor], false, false);

        assert!(allowed(Capability::ViewProject, &executor));
        assert!(allowed(Capability::ViewProjectTiming, &executor));
        assert!(allowed(Capability::ViewTask, &executor));
        assert!(allowed(Capability::ViewTaskTiming, &executor));

        assert!(!allowed(Capability::UpdateProject, &executor));
        assert!(!allowed(Capability::CreateTask, &executor));
        assert!(!allowed(Capability::UpdateTask, &executor));
        assert!(!allowed(Capability::DeleteTask, &executor));
        assert!(!allowed(Capability::ViewComments, &executor));
        assert!(!allowed(Capability::CreateComment, &executor));
    }

    #[test]
    fn test_assignee_without_role() {
        let assignee = facts(&[], true, false);

        assert!(allowed(Capability::ViewTask, &assignee));
        assert!(allowed(Capability::ViewTaskTiming, &assignee));
        assert!(allowed(Capability::ViewComments, &assignee));
        assert!(allowed(Capability::CreateComment, &assignee));
        assert!(allowed(Capability::DeleteComment, &assignee));

        assert!(!allowed(Capability::ViewProject, &assignee));
        assert!(!allowed(Capability::UpdateTask, &assignee));
        assert!(!allowed(Capability::DeleteTask, &assignee));
    }

    #[test]
    fn test_executor_assignee_cannot_modify_task() {
        let executor_assignee = facts(&[ProjectRole::Executor], true, false);

        assert!(!allowed(Capability::UpdateTask, &executor_assignee));
        assert!(!allowed(Capability::DeleteTask, &executor_assignee));
        assert!(allowed(Capability::CreateComment, &executor_assignee));
    }

    #[test]
    fn test_author_only_grants_comment_deletion() {
        let author = facts(&[], false, true);

        assert!(allowed(Capability::DeleteComment, &author));
        for capability in Capability::ALL {
            if capability != Capability::DeleteComment {
                assert!(!allowed(capability, &author), "{:?} granted to author", capability);
            }
        }
    }

    #[test]
    fn test_multiple_roles_are_unioned() {
        let both = facts(&[ProjectRole::Manager, ProjectRole::Executor], false, false);
        assert!(allowed(Capability::UpdateTask, &both));
        assert!(!allowed(Capability::DeleteProject, &both));
    }

    #[test]
    fn test_target_constructors() {
        let target = Target::Comment {
            project_id: 1,
            task_id: 2,
            author_id: 3,
        };
        assert_eq!(target.project_id(), 1);
        assert_eq!(target.task_id(), Some(2));
        assert_eq!(Target::Project { project_id: 9 }.task_id(), None);
    }

    #[test]
    fn test_authz_error_display() {
        assert_eq!(AuthzError::Denied.to_string(), "Access denied");
    }

    #[tokio::test]
    async fn test_superuser_bypasses_without_querying() {
        // Lazy pool: any query would fail, so success proves no lookup happened
        let pool = PgPool::connect_lazy("postgres://nobody@127.0.0.1:1/none").unwrap();
        let superuser = AuthContext {
            user_id: 1,
            username: "admin".to_string(),
            is_superuser: true,
        };

        for capability in Capability::ALL {
            let result = authorize(
                &pool,
                &superuser,
                capability,
                Target::Project { project_id: 404 },
            )
            .await;
            assert!(result.is_ok());
        }
    }
}
