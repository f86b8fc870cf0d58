/// Derived time-tracking fields
///
/// Nothing here is stored; every value is computed from the entity's
/// timestamps and a caller-supplied `now`, so the functions are pure and
/// handlers pass `Utc::now()`.
///
/// All durations are whole seconds. Negative values mean the reference point
/// is already in the past.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    project::Project,
    task::{Task, TaskStatus},
};

/// Timing view of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTiming {
    pub project_id: i64,

    pub start_date: DateTime<Utc>,

    pub end_date: Option<DateTime<Utc>>,

    /// `now - start_date`
    pub elapsed_seconds: i64,

    /// `end_date - now`, absent without an end date
    pub remaining_seconds: Option<i64>,

    /// `end_date - start_date`, absent without an end date
    pub duration_seconds: Option<i64>,

    pub is_overdue: bool,
}

impl ProjectTiming {
    pub fn derive(project: &Project, now: DateTime<Utc>) -> Self {
        let remaining_seconds = project.end_date.map(|end| seconds_between(now, end));

        Self {
            project_id: project.id,
            start_date: project.start_date,
            end_date: project.end_date,
            elapsed_seconds: seconds_between(project.start_date, now),
            remaining_seconds,
            duration_seconds: project
                .end_date
                .map(|end| seconds_between(project.start_date, end)),
            is_overdue: remaining_seconds.is_some_and(|s| s < 0),
        }
    }
}

/// Timing view of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTiming {
    pub task_id: i64,

    pub status: TaskStatus,

    pub due_date: Option<DateTime<Utc>>,

    /// `due_date - now`; negative once the due date has passed
    pub time_remaining: Option<i64>,

    /// `now - created_at`
    pub time_since_created: i64,

    /// `now - updated_at`
    pub time_since_updated: i64,

    /// Past due and neither completed nor canceled
    pub is_overdue: bool,
}

impl TaskTiming {
    pub fn derive(task: &Task, now: DateTime<Utc>) -> Self {
        let time_remaining = task.due_date.map(|due| seconds_between(now, due));

        Self {
            task_id: task.id,
            status: task.status,
            due_date: task.due_date,
            time_remaining,
            time_since_created: seconds_between(task.created_at, now),
            time_since_updated: seconds_between(task.updated_at, now),
            is_overdue: !task.status.is_closed() && time_remaining.is_some_and(|s| s < 0),
        }
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds()
}
