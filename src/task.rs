//! Task and project records.
//!
//! A `Task` belongs to exactly one `Project` and may hang under a parent task of
//! the same project. `depth` is derived from the parent chain and is only ever
//! written by the hierarchy rules in [`crate::hierarchy`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;

pub type TaskId = u64;
pub type ProjectId = u64;

/// A unit of work scoped to a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub category: Category,
    #[serde(default)]
    pub parent_task_id: Option<TaskId>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default = "default_billable")]
    pub billable: bool,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee_id: Option<u64>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

fn default_billable() -> bool {
    true
}

impl Task {
    /// Root tasks have no parent.
    pub fn is_root(&self) -> bool {
        self.parent_task_id.is_none()
    }
}

/// A client project owning a task forest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at_utc: i64,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal task for tests; depth is taken as given.
    pub fn task(id: TaskId, project_id: ProjectId, name: &str, parent: Option<TaskId>, depth: u32) -> Task {
        Task {
            id,
            project_id,
            name: name.to_string(),
            description: None,
            status: Status::Todo,
            priority: Priority::Medium,
            category: Category::Development,
            parent_task_id: parent,
            depth,
            billable: true,
            estimated_hours: None,
            due_date: None,
            assignee_id: None,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_fills_defaults() {
        let json = r#"{
            "id": 7, "project_id": 1, "name": "Wireframes",
            "status": "todo", "priority": "high", "category": "design",
            "created_at_utc": 0, "updated_at_utc": 0
        }"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert!(t.is_root());
        assert_eq!(t.depth, 0);
        assert!(t.billable);
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.category, Category::Design);
    }
}
