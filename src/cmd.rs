//! Command implementations for the CLI interface.
//!
//! Every handler validates against a fresh [`crate::hierarchy::Snapshot`] of the database
//! before mutating anything, then saves. A rejected command leaves the database
//! untouched.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::{Args, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use tracing::{debug, info};

use crate::cli::Cli;
use crate::db::*;
use crate::display::*;
use crate::error::AppError;
use crate::fields::*;
use crate::hierarchy::{group_for_display, rebase_depths, MAX_TASK_DEPTH};
use crate::task::{Project, ProjectId, Task, TaskId};

#[derive(Subcommand)]
pub enum Commands {
    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Add a new task.
    Add(AddArgs),

    /// List tasks with optional filters.
    List {
        /// Project ID or name.
        #[arg(long)]
        project: Option<String>,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Include done tasks.
        #[arg(long)]
        all: bool,
        /// Render subtasks under their parents.
        #[arg(long)]
        tree: bool,
    },

    /// View a single task by ID or name.
    View {
        /// Task ID or name
        id: String,
    },

    /// Update fields on a task, including its parent.
    Update(UpdateArgs),

    /// List tasks that can be chosen as a parent.
    Candidates {
        /// Project ID or name.
        #[arg(long)]
        project: String,
        /// Task being edited; it and its subtasks are excluded.
        #[arg(long)]
        editing: Option<String>,
        /// Group children under their root.
        #[arg(long)]
        grouped: bool,
    },

    /// Print the root-to-task path.
    Path {
        /// Task ID or name
        id: String,
    },

    /// Check stored tasks for broken parent links and stale depths.
    Check,

    /// Print label tables and hierarchy limits.
    Labels,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project.
    Add {
        name: String,
        /// Client the project is billed to.
        #[arg(long)]
        client: Option<String>,
    },
    /// List projects with task counts.
    List,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Short task name.
    pub name: String,
    /// Project ID or name.
    #[arg(long)]
    pub project: String,
    /// Parent task ID or name.
    #[arg(long)]
    pub parent: Option<String>,
    /// Longer description.
    #[arg(long)]
    pub desc: Option<String>,
    #[arg(long, value_enum, default_value_t = Status::Todo)]
    pub status: Status,
    #[arg(long, value_enum, default_value_t = Priority::Medium)]
    pub priority: Priority,
    #[arg(long, value_enum, default_value_t = Category::Development)]
    pub category: Category,
    /// Mark the task as not billable.
    #[arg(long)]
    pub non_billable: bool,
    /// Estimated hours.
    #[arg(long)]
    pub estimate: Option<f64>,
    /// Due date: YYYY-MM-DD, "today", "tomorrow", "in Nd" or "in Nw".
    #[arg(long)]
    pub due: Option<String>,
    /// Assignee (employee ID).
    #[arg(long)]
    pub assignee: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UpdateArgs {
    /// Task ID or name to update
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub desc: Option<String>,
    #[arg(long, value_enum)]
    pub status: Option<Status>,
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,
    #[arg(long, value_enum)]
    pub category: Option<Category>,
    #[arg(long)]
    pub billable: Option<bool>,
    #[arg(long, conflicts_with = "clear_estimate")]
    pub estimate: Option<f64>,
    #[arg(long)]
    pub clear_estimate: bool,
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    #[arg(long)]
    pub clear_due: bool,
    #[arg(long, conflicts_with = "clear_assignee")]
    pub assignee: Option<u64>,
    #[arg(long)]
    pub clear_assignee: bool,
    /// New parent task ID or name.
    #[arg(long, conflicts_with = "clear_parent")]
    pub parent: Option<String>,
    /// Make the task a root.
    #[arg(long)]
    pub clear_parent: bool,
}

fn lookup_task(identifier: &str, db: &Database) -> Result<TaskId, AppError> {
    resolve_task_identifier(identifier, db).map_err(AppError::Lookup)
}

fn lookup_project(identifier: &str, db: &Database) -> Result<ProjectId, AppError> {
    resolve_project_identifier(identifier, db).map_err(AppError::Lookup)
}

fn parse_due(s: &str) -> Result<NaiveDate, AppError> {
    parse_due_input(s, Local::now().date_naive()).ok_or_else(|| {
        AppError::Invalid(format!(
            "unrecognised due date '{s}'. Use YYYY-MM-DD, 'today', 'tomorrow', 'in Nd' or 'in Nw'"
        ))
    })
}

fn check_estimate(h: f64) -> Result<f64, AppError> {
    if h.is_finite() && h >= 0.0 {
        Ok(h)
    } else {
        Err(AppError::Invalid(format!("estimate must be a non-negative number of hours, got {h}")))
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Create a project.
pub fn cmd_project_add(
    db: &mut Database,
    db_path: &Path,
    name: String,
    client: Option<String>,
) -> Result<ProjectId, AppError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Invalid("project name cannot be empty".into()));
    }
    if db.projects.iter().any(|p| p.name.eq_ignore_ascii_case(&name)) {
        return Err(AppError::Invalid(format!("project '{name}' already exists")));
    }
    let id = db.next_project_id();
    db.projects.push(Project {
        id,
        name,
        client: non_empty(client),
        active: true,
        created_at_utc: Utc::now().timestamp(),
    });
    db.save(db_path)?;
    info!(project = id, "project added");
    println!("Added project {id}");
    Ok(id)
}

/// List projects with their task counts.
pub fn cmd_project_list(db: &Database) {
    if db.projects.is_empty() {
        println!("No projects.");
        return;
    }
    println!("{:<5} {:<24} {:<20} {:<7} {}", "ID", "Name", "Client", "Active", "Tasks");
    for p in &db.projects {
        println!(
            "{:<5} {:<24} {:<20} {:<7} {}",
            p.id,
            truncate(&p.name, 24),
            truncate(p.client.as_deref().unwrap_or("-"), 20),
            if p.active { "yes" } else { "no" },
            db.project_tasks(p.id).count()
        );
    }
}

/// Add a new task. The parent must pass the hierarchy rules.
pub fn cmd_add(db: &mut Database, db_path: &Path, args: AddArgs) -> Result<TaskId, AppError> {
    let name = args.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Invalid("task name cannot be empty".into()));
    }
    let project_id = lookup_project(&args.project, db)?;
    let parent_id = args.parent.as_deref().map(|p| lookup_task(p, db)).transpose()?;
    let depth = db.snapshot().plan_parent_assignment(None, project_id, parent_id)?;
    let due_date = args.due.as_deref().map(parse_due).transpose()?;
    let estimated_hours = args.estimate.map(check_estimate).transpose()?;

    let now_utc = Utc::now().timestamp();
    let id = db.next_task_id();
    db.tasks.push(Task {
        id,
        project_id,
        name,
        description: non_empty(args.desc),
        status: args.status,
        priority: args.priority,
        category: args.category,
        parent_task_id: parent_id,
        depth,
        billable: !args.non_billable,
        estimated_hours,
        due_date,
        assignee_id: args.assignee,
        created_at_utc: now_utc,
        updated_at_utc: now_utc,
    });
    db.save(db_path)?;
    info!(task = id, project = project_id, depth, "task added");
    println!("Added task {id}");
    Ok(id)
}

/// Tasks in tree order: each root followed by its descendants, depth first.
fn tree_order<'a>(db: &'a Database, tasks: &[&'a Task]) -> Vec<&'a Task> {
    let snap = db.snapshot();
    let included: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(tasks.len());

    let mut stack: Vec<&'a Task> = tasks
        .iter()
        .rev()
        .filter(|t| t.parent_task_id.map_or(true, |p| !included.contains(&p)))
        .copied()
        .collect();
    while let Some(t) = stack.pop() {
        if !seen.insert(t.id) {
            continue;
        }
        out.push(t);
        for c in snap.children(t.id).iter().rev() {
            if included.contains(&c.id) {
                stack.push(*c);
            }
        }
    }
    // Anything caught in a parent loop is never reached from a root.
    out.extend(tasks.iter().filter(|t| !seen.contains(&t.id)).copied());
    out
}

/// List tasks with optional filtering.
pub fn cmd_list(
    db: &Database,
    project: Option<String>,
    status: Option<Status>,
    all: bool,
    tree: bool,
) -> Result<(), AppError> {
    let project_id = project.as_deref().map(|p| lookup_project(p, db)).transpose()?;
    let filtered: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| project_id.map_or(true, |p| t.project_id == p))
        .filter(|t| match status {
            Some(s) => t.status == s,
            None => all || t.status != Status::Done,
        })
        .collect();

    if filtered.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    if tree {
        print_table(db, &tree_order(db, &filtered), true);
    } else {
        print_table(db, &filtered, false);
    }
    Ok(())
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, id: String) -> Result<(), AppError> {
    let task_id = lookup_task(&id, db)?;
    let snap = db.snapshot();
    let task = snap
        .get(task_id)
        .ok_or_else(|| AppError::Lookup(format!("Task {task_id} not found")))?;
    let today = Local::now().date_naive();
    let project = db.project(task.project_id).map(|p| p.name.as_str()).unwrap_or("-");
    let timestamp = |ts: i64| {
        Utc.timestamp_opt(ts, 0)
            .single()
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "-".into())
    };

    println!("ID:           {}", task.id);
    println!("Name:         {}", task.name);
    println!("Path:         {}", snap.task_path(task_id).join(" / "));
    println!("Project:      {} (#{})", project, task.project_id);
    println!("Status:       {}", task.status.label());
    println!("Priority:     {}", task.priority.label());
    println!("Category:     {}", task.category.label());
    println!("Depth:        {} of {}", task.depth, MAX_TASK_DEPTH);
    println!("Billable:     {}", if task.billable { "yes" } else { "no" });
    println!("Estimate:     {}", format_hours(task.estimated_hours));
    println!(
        "Due:          {}",
        match task.due_date {
            Some(d) => format!("{d} ({})", format_due_relative(Some(d), today)),
            None => "-".into(),
        }
    );
    println!("Assignee:     {}", task.assignee_id.map(|a| a.to_string()).unwrap_or_else(|| "-".into()));
    println!("Created UTC:  {}", timestamp(task.created_at_utc));
    println!("Updated UTC:  {}", timestamp(task.updated_at_utc));
    println!("Description:\n{}\n", task.description.as_deref().unwrap_or("-"));

    println!("Subtasks:");
    let subtasks = tree_order(db, &snap.descendants(task_id));
    if subtasks.is_empty() {
        println!("  -");
    }
    for d in subtasks {
        println!(
            "{}- {} [{}] (#{})",
            "  ".repeat(d.depth.saturating_sub(task.depth) as usize),
            d.name,
            d.status.label(),
            d.id
        );
    }
    Ok(())
}

/// Update an existing task's fields.
///
/// Re-parenting is checked for cycles, project scope and depth before any field
/// changes; descendants get their depth recomputed afterwards.
pub fn cmd_update(db: &mut Database, db_path: &Path, args: UpdateArgs) -> Result<(), AppError> {
    let task_id = lookup_task(&args.id, db)?;
    let project_id = db
        .get(task_id)
        .map(|t| t.project_id)
        .ok_or_else(|| AppError::Lookup(format!("Task {task_id} not found")))?;

    let new_parent = if args.clear_parent {
        Some(None)
    } else {
        args.parent.as_deref().map(|p| lookup_task(p, db).map(Some)).transpose()?
    };
    let new_depth = match new_parent {
        Some(parent) => Some(db.snapshot().plan_parent_assignment(Some(task_id), project_id, parent)?),
        None => None,
    };
    let due = args.due.as_deref().map(parse_due).transpose()?;
    let estimate = args.estimate.map(check_estimate).transpose()?;
    if let Some(name) = &args.name {
        if name.trim().is_empty() {
            return Err(AppError::Invalid("task name cannot be empty".into()));
        }
    }

    {
        let t = db
            .get_mut(task_id)
            .ok_or_else(|| AppError::Lookup(format!("Task {task_id} not found")))?;
        if let Some(s) = args.name { t.name = s.trim().to_string(); }
        if let Some(d) = args.desc { t.description = non_empty(Some(d)); }
        if let Some(s) = args.status { t.status = s; }
        if let Some(p) = args.priority { t.priority = p; }
        if let Some(c) = args.category { t.category = c; }
        if let Some(b) = args.billable { t.billable = b; }
        if args.clear_estimate { t.estimated_hours = None; }
        if estimate.is_some() { t.estimated_hours = estimate; }
        if args.clear_due { t.due_date = None; }
        if due.is_some() { t.due_date = due; }
        if args.clear_assignee { t.assignee_id = None; }
        if args.assignee.is_some() { t.assignee_id = args.assignee; }
        if let (Some(parent), Some(depth)) = (new_parent, new_depth) {
            t.parent_task_id = parent;
            t.depth = depth;
        }
        t.updated_at_utc = Utc::now().timestamp();
    }

    if new_depth.is_some() {
        let moved = rebase_depths(&mut db.tasks, task_id);
        debug!(task = task_id, subtasks = moved, "rebased subtask depths");
    }
    db.save(db_path)?;
    info!(task = task_id, "task updated");
    println!("Updated task {task_id}");
    Ok(())
}

/// Print legal parent choices for a new or edited task.
pub fn cmd_candidates(
    db: &Database,
    project: String,
    editing: Option<String>,
    grouped: bool,
) -> Result<(), AppError> {
    let project_id = lookup_project(&project, db)?;
    let editing = editing.as_deref().map(|e| lookup_task(e, db)).transpose()?;
    let snap = db.snapshot();
    let candidates = snap.valid_parent_candidates(project_id, editing);
    debug!(project = project_id, ?editing, count = candidates.len(), "parent candidates");

    if candidates.is_empty() {
        println!("No valid parent candidates.");
        return Ok(());
    }
    if grouped {
        for entry in group_for_display(&candidates) {
            println!("{:<5} {}", entry.task.id, entry.label());
        }
    } else {
        for t in candidates {
            println!("{:<5} {}{}", t.id, "  ".repeat(t.depth as usize), t.name);
        }
    }
    Ok(())
}

/// Print the path from the root to a task.
pub fn cmd_path(db: &Database, id: String) -> Result<(), AppError> {
    let task_id = lookup_task(&id, db)?;
    println!("{}", db.snapshot().task_path(task_id).join(" / "));
    Ok(())
}

/// Report hierarchy problems in the stored data.
pub fn cmd_check(db: &Database) -> Result<(), AppError> {
    let issues = db.snapshot().audit();
    if issues.is_empty() {
        println!("No integrity issues found ({} tasks).", db.tasks.len());
        return Ok(());
    }
    for issue in &issues {
        println!("{issue}");
    }
    Err(AppError::Integrity(issues.len()))
}

/// Print the label tables shared with the rendering side.
pub fn cmd_labels() {
    println!("Max task depth: {} ({} levels)", MAX_TASK_DEPTH, MAX_TASK_DEPTH + 1);
    println!("\nStatus:");
    for s in Status::ALL {
        println!("  {:<14} {}", value_key(s), s.label());
    }
    println!("\nPriority:");
    for p in Priority::ALL {
        println!("  {:<14} {}", value_key(p), p.label());
    }
    println!("\nCategory:");
    for c in Category::ALL {
        println!("  {:<14} {}", value_key(c), c.label());
    }
}

/// Generate shell completions.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "tt", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyError;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup() -> (TempDir, std::path::PathBuf, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut db = Database::default();
        cmd_project_add(&mut db, &path, "Website".into(), Some("Acme".into())).unwrap();
        cmd_project_add(&mut db, &path, "Mobile".into(), None).unwrap();
        (dir, path, db)
    }

    fn add(db: &mut Database, path: &Path, name: &str, project: &str, parent: Option<&str>) -> Result<TaskId, AppError> {
        cmd_add(
            db,
            path,
            AddArgs {
                name: name.into(),
                project: project.into(),
                parent: parent.map(String::from),
                desc: None,
                status: Status::Todo,
                priority: Priority::Medium,
                category: Category::Development,
                non_billable: false,
                estimate: None,
                due: None,
                assignee: None,
            },
        )
    }

    fn reparent(db: &mut Database, path: &Path, id: TaskId, parent: Option<TaskId>) -> Result<(), AppError> {
        cmd_update(
            db,
            path,
            UpdateArgs {
                id: id.to_string(),
                parent: parent.map(|p| p.to_string()),
                clear_parent: parent.is_none(),
                ..Default::default()
            },
        )
    }

    fn depths(db: &Database) -> Vec<(TaskId, u32)> {
        db.tasks.iter().map(|t| (t.id, t.depth)).collect()
    }

    #[test]
    fn test_project_add_rejects_duplicates() {
        let (_dir, path, mut db) = setup();
        assert!(matches!(
            cmd_project_add(&mut db, &path, "website".into(), None),
            Err(AppError::Invalid(_))
        ));
        assert!(matches!(cmd_project_add(&mut db, &path, "  ".into(), None), Err(AppError::Invalid(_))));
        assert_eq!(db.projects.len(), 2);
    }

    #[test]
    fn test_add_computes_depth_and_persists() {
        let (_dir, path, mut db) = setup();
        let a = add(&mut db, &path, "Backend", "Website", None).unwrap();
        let b = add(&mut db, &path, "API", "Website", Some("Backend")).unwrap();
        let c = add(&mut db, &path, "Auth endpoint", "Website", Some(b.to_string().as_str())).unwrap();
        assert_eq!(depths(&db), vec![(a, 0), (b, 1), (c, 2)]);

        let reloaded = Database::load(&path).unwrap();
        assert_eq!(depths(&reloaded), vec![(a, 0), (b, 1), (c, 2)]);
    }

    #[test]
    fn test_add_rejects_bad_parents() {
        let (_dir, path, mut db) = setup();
        add(&mut db, &path, "A", "Website", None).unwrap();
        add(&mut db, &path, "B", "Website", Some("1")).unwrap();
        add(&mut db, &path, "C", "Website", Some("2")).unwrap();

        let err = add(&mut db, &path, "D", "Website", Some("3")).unwrap_err();
        assert!(matches!(err, AppError::Hierarchy(HierarchyError::ParentAtMaxDepth(3))));
        let err = add(&mut db, &path, "E", "Mobile", Some("1")).unwrap_err();
        assert!(matches!(err, AppError::Hierarchy(HierarchyError::CrossProjectParent { .. })));
        let err = add(&mut db, &path, "F", "Website", Some("42")).unwrap_err();
        assert!(matches!(err, AppError::Lookup(_)));
        assert_eq!(db.tasks.len(), 3);
    }

    #[test]
    fn test_update_rejects_cycle_without_mutation() {
        let (_dir, path, mut db) = setup();
        add(&mut db, &path, "A", "Website", None).unwrap();
        add(&mut db, &path, "B", "Website", Some("1")).unwrap();
        let before = depths(&db);

        let err = reparent(&mut db, &path, 1, Some(2)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Hierarchy(HierarchyError::CircularReference { task: 1, parent: 2 })
        ));
        let err = reparent(&mut db, &path, 1, Some(1)).unwrap_err();
        assert!(matches!(err, AppError::Hierarchy(HierarchyError::CircularReference { .. })));
        assert_eq!(depths(&db), before);
        assert_eq!(db.get(1).unwrap().parent_task_id, None);
    }

    #[test]
    fn test_update_reparent_rebases_subtree() {
        let (_dir, path, mut db) = setup();
        add(&mut db, &path, "A", "Website", None).unwrap();
        add(&mut db, &path, "B", "Website", Some("1")).unwrap();
        add(&mut db, &path, "C", "Website", Some("2")).unwrap();
        add(&mut db, &path, "D", "Website", None).unwrap();

        reparent(&mut db, &path, 2, None).unwrap();
        assert_eq!(depths(&db), vec![(1, 0), (2, 0), (3, 1), (4, 0)]);

        reparent(&mut db, &path, 2, Some(4)).unwrap();
        assert_eq!(depths(&db), vec![(1, 0), (2, 1), (3, 2), (4, 0)]);
        assert_eq!(db.get(2).unwrap().parent_task_id, Some(4));

        // B now carries C, so it cannot move under a depth-1 task.
        add(&mut db, &path, "E", "Website", Some("1")).unwrap();
        let err = reparent(&mut db, &path, 2, Some(5)).unwrap_err();
        assert!(matches!(err, AppError::Hierarchy(HierarchyError::SubtreeTooDeep { .. })));
        assert!(db.snapshot().audit().is_empty());
    }

    #[test]
    fn test_update_fields() {
        let (_dir, path, mut db) = setup();
        add(&mut db, &path, "A", "Website", None).unwrap();
        cmd_update(
            &mut db,
            &path,
            UpdateArgs {
                id: "A".into(),
                name: Some("Homepage".into()),
                status: Some(Status::InProgress),
                estimate: Some(4.5),
                due: Some("2030-01-15".into()),
                billable: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
        let t = db.get(1).unwrap();
        assert_eq!(t.name, "Homepage");
        assert_eq!(t.status, Status::InProgress);
        assert_eq!(t.estimated_hours, Some(4.5));
        assert_eq!(t.due_date, NaiveDate::from_ymd_opt(2030, 1, 15));
        assert!(!t.billable);

        let err = cmd_update(
            &mut db,
            &path,
            UpdateArgs {
                id: "1".into(),
                estimate: Some(-1.0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Invalid(_)));
    }

    #[test]
    fn test_tree_order() {
        let (_dir, path, mut db) = setup();
        add(&mut db, &path, "A", "Website", None).unwrap();
        add(&mut db, &path, "D", "Website", None).unwrap();
        add(&mut db, &path, "B", "Website", Some("A")).unwrap();
        add(&mut db, &path, "E", "Website", Some("D")).unwrap();
        add(&mut db, &path, "C", "Website", Some("B")).unwrap();
        let all: Vec<&Task> = db.tasks.iter().collect();
        let names: Vec<&str> = tree_order(&db, &all).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_check_reports_corruption() {
        let (_dir, path, mut db) = setup();
        add(&mut db, &path, "A", "Website", None).unwrap();
        assert!(cmd_check(&db).is_ok());
        db.tasks[0].depth = 2;
        assert!(matches!(cmd_check(&db), Err(AppError::Integrity(1))));
    }
}
