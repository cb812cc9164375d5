//! JSON file store for projects and tasks.
//!
//! The store owns persistence only. Hierarchy rules live in
//! [`crate::hierarchy`] and are applied by the command layer before anything
//! is written back.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::hierarchy::Snapshot;
use crate::task::{Project, ProjectId, Task, TaskId};

/// Failures reading or writing the database file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize database: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// In-memory database holding every project and task.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Database {
    /// Load from a JSON file. A missing file is an empty database.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "database file missing, starting empty");
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut buf))
            .map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let db: Database = serde_json::from_str(&buf).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(projects = db.projects.len(), tasks = db.tasks.len(), "database loaded");
        Ok(db)
    }

    /// Save to a JSON file via temp file + rename.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        let write = |p: &Path| -> std::io::Result<()> {
            let mut f = File::create(p)?;
            f.write_all(data.as_bytes())?;
            f.flush()?;
            fs::rename(p, path)
        };
        write(&tmp).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), tasks = self.tasks.len(), "database saved");
        Ok(())
    }

    pub fn next_task_id(&self) -> TaskId {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    pub fn next_project_id(&self) -> ProjectId {
        self.projects.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Tasks of one project, in storage order.
    pub fn project_tasks(&self, id: ProjectId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.project_id == id)
    }

    /// Hierarchy view over every stored task.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(&self.tasks)
    }
}

/// Resolve a project identifier (id or case-insensitive name).
pub fn resolve_project_identifier(identifier: &str, db: &Database) -> Result<ProjectId, String> {
    if let Ok(id) = identifier.parse::<ProjectId>() {
        return match db.project(id) {
            Some(_) => Ok(id),
            None => Err(format!("Project with ID {} not found", id)),
        };
    }
    let matches: Vec<&Project> = db
        .projects
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(identifier))
        .collect();
    match matches.as_slice() {
        [] => Err(format!("No project found with name '{}'", identifier)),
        [p] => Ok(p.id),
        _ => Err(format!(
            "Multiple projects named '{}', use the ID instead ({})",
            identifier,
            matches.iter().map(|p| p.id.to_string()).collect::<Vec<_>>().join(", ")
        )),
    }
}

/// Resolve a task identifier (either ID or name) to a task ID.
/// Returns an error if the name has multiple matches and suggests using ID instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<TaskId, String> {
    if let Ok(id) = identifier.parse::<TaskId>() {
        return match db.get(id) {
            Some(_) => Ok(id),
            None => Err(format!("Task with ID {} not found", id)),
        };
    }

    let snap = db.snapshot();
    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| task.name.to_lowercase() == identifier.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with name '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found with name '{}':\n", identifier);
            for task in matches {
                let project = db.project(task.project_id).map(|p| p.name.as_str()).unwrap_or("-");
                error_msg.push_str(&format!(
                    "  ID {}: {} [project: {}]\n",
                    task.id,
                    snap.task_path(task.id).join(" / "),
                    project
                ));
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}
