//! Task hierarchy rules: depth limits, parent candidates and cycle checks.
//!
//! Tasks form a forest per project through `parent_task_id` links. Every
//! operation here is a pure function over a caller-supplied snapshot of tasks;
//! nothing is cached between calls. Callers rebuild the [`Snapshot`] after each
//! mutation.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, warn};

use crate::task::{ProjectId, Task, TaskId};

/// Deepest level a task may sit at. Roots are depth 0, so three levels in total.
pub const MAX_TASK_DEPTH: u32 = 2;

/// Upper bound on parent hops for any upward walk.
const WALK_LIMIT: u32 = MAX_TASK_DEPTH + 1;

/// Rejection reasons for a parent assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("parent task {0} not found")]
    UnresolvedParent(TaskId),
    #[error("parent task {parent} belongs to project {parent_project}, not project {project}")]
    CrossProjectParent {
        parent: TaskId,
        parent_project: ProjectId,
        project: ProjectId,
    },
    #[error("task {0} is at the maximum depth ({max}) and cannot have children", max = MAX_TASK_DEPTH)]
    ParentAtMaxDepth(TaskId),
    #[error("making task {parent} the parent of task {task} would create a cycle")]
    CircularReference { task: TaskId, parent: TaskId },
    #[error("moving task {task} under task {parent} would push its subtasks past depth {max}", max = MAX_TASK_DEPTH)]
    SubtreeTooDeep { task: TaskId, parent: TaskId },
}

/// Non-fatal note produced while resolving a depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyWarning {
    /// The parent id is not in the snapshot, so the task was treated as a root.
    UnresolvedParent(TaskId),
}

/// Outcome of [`Snapshot::compute_depth`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthResolution<'a> {
    pub depth: u32,
    /// The parent record, when one was named and found.
    pub parent: Option<&'a Task>,
    pub warning: Option<HierarchyWarning>,
}

impl DepthResolution<'_> {
    /// Treat an unresolved parent as an error instead of rooting the task.
    pub fn strict(self) -> Result<u32, HierarchyError> {
        match self.warning {
            Some(HierarchyWarning::UnresolvedParent(id)) => Err(HierarchyError::UnresolvedParent(id)),
            None => Ok(self.depth),
        }
    }
}

/// `true` iff the task may be chosen as somebody's parent.
pub fn can_have_children(task: &Task) -> bool {
    task.depth < MAX_TASK_DEPTH
}

/// Indexed, read-only view over a slice of tasks.
///
/// Keeps the slice for insertion-order semantics and maps for O(1) lookups.
/// When ids repeat, the first occurrence wins.
pub struct Snapshot<'a> {
    tasks: &'a [Task],
    by_id: HashMap<TaskId, &'a Task>,
    children: HashMap<TaskId, Vec<&'a Task>>,
}

impl<'a> Snapshot<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let mut by_id = HashMap::with_capacity(tasks.len());
        let mut children: HashMap<TaskId, Vec<&'a Task>> = HashMap::new();
        for t in tasks {
            by_id.entry(t.id).or_insert(t);
            if let Some(p) = t.parent_task_id {
                children.entry(p).or_default().push(t);
            }
        }
        Snapshot { tasks, by_id, children }
    }

    pub fn get(&self, id: TaskId) -> Option<&'a Task> {
        self.by_id.get(&id).copied()
    }

    /// Direct children of a task, in snapshot order.
    pub fn children(&self, id: TaskId) -> &[&'a Task] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth a task gets when placed under `parent`.
    ///
    /// An unresolvable parent yields depth 0 plus a warning; see
    /// [`DepthResolution::strict`] for the failing variant.
    pub fn compute_depth(&self, parent: Option<TaskId>) -> DepthResolution<'a> {
        match parent {
            None => DepthResolution {
                depth: 0,
                parent: None,
                warning: None,
            },
            Some(pid) => match self.get(pid) {
                // Stored depths may be hand-edited; never overflow on them.
                Some(p) => DepthResolution {
                    depth: p.depth.saturating_add(1),
                    parent: Some(p),
                    warning: None,
                },
                None => {
                    debug!(parent = pid, "parent not in snapshot, treating task as root");
                    DepthResolution {
                        depth: 0,
                        parent: None,
                        warning: Some(HierarchyWarning::UnresolvedParent(pid)),
                    }
                }
            },
        }
    }

    /// Tasks that may legally become the parent of a new task (`editing == None`)
    /// or of the task being edited.
    ///
    /// Order follows the snapshot.
    pub fn valid_parent_candidates(&self, project_id: ProjectId, editing: Option<TaskId>) -> Vec<&'a Task> {
        self.tasks
            .iter()
            .filter(|t| t.project_id == project_id && can_have_children(t))
            .filter(|t| match editing {
                Some(e) => t.id != e && !self.would_create_circular_reference(e, t.id),
                None => true,
            })
            .collect()
    }

    /// Whether making `prospective_parent` the parent of `task_id` closes a loop.
    ///
    /// Walks upward from the prospective parent. A walk longer than
    /// `MAX_TASK_DEPTH + 1` hops only happens on a corrupt snapshot and counts as
    /// a cycle.
    pub fn would_create_circular_reference(&self, task_id: TaskId, prospective_parent: TaskId) -> bool {
        let mut cur = Some(prospective_parent);
        let mut hops = 0;
        while let Some(id) = cur {
            if id == task_id {
                return true;
            }
            hops += 1;
            if hops > WALK_LIMIT {
                warn!(task = task_id, parent = prospective_parent, "parent chain exceeds depth limit, snapshot is corrupt");
                return true;
            }
            cur = self.get(id).and_then(|t| t.parent_task_id);
        }
        false
    }

    /// Names from the root down to `task_id`. Empty if the task is unknown.
    ///
    /// Follows at most `MAX_TASK_DEPTH + 1` parent hops and stops on a revisit.
    pub fn task_path(&self, task_id: TaskId) -> Vec<&'a str> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = self.get(task_id);
        while let Some(t) = cur {
            if names.len() as u32 > WALK_LIMIT || !seen.insert(t.id) {
                break;
            }
            names.push(t.name.as_str());
            cur = t.parent_task_id.and_then(|p| self.get(p));
        }
        names.reverse();
        names
    }

    /// All descendants of a task, breadth first, bounded by the depth limit.
    pub fn descendants(&self, task_id: TaskId) -> Vec<&'a Task> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([task_id]);
        let mut level = vec![task_id];
        for _ in 0..WALK_LIMIT {
            let mut next = Vec::new();
            for id in &level {
                for c in self.children(*id) {
                    if seen.insert(c.id) {
                        next.push(c.id);
                        out.push(*c);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            level = next;
        }
        out
    }

    /// Number of levels below a task (0 for a leaf).
    pub fn subtree_height(&self, task_id: TaskId) -> u32 {
        let mut height = 0;
        let mut seen = HashSet::from([task_id]);
        let mut level = vec![task_id];
        while height <= WALK_LIMIT {
            let next: Vec<TaskId> = level
                .iter()
                .flat_map(|id| self.children(*id))
                .filter(|c| seen.insert(c.id))
                .map(|c| c.id)
                .collect();
            if next.is_empty() {
                break;
            }
            height += 1;
            level = next;
        }
        height
    }

    /// Validate placing a task (new when `task_id` is `None`) under `parent`
    /// within `project_id`. Returns the depth the task would get.
    pub fn plan_parent_assignment(
        &self,
        task_id: Option<TaskId>,
        project_id: ProjectId,
        parent: Option<TaskId>,
    ) -> Result<u32, HierarchyError> {
        let resolution = self.compute_depth(parent);
        let Some(parent_task) = resolution.parent else {
            // Root placement, or an unresolved parent id.
            return resolution.strict();
        };
        let pid = parent_task.id;
        if parent_task.project_id != project_id {
            return Err(HierarchyError::CrossProjectParent {
                parent: pid,
                parent_project: parent_task.project_id,
                project: project_id,
            });
        }
        if let Some(tid) = task_id {
            if self.would_create_circular_reference(tid, pid) {
                return Err(HierarchyError::CircularReference { task: tid, parent: pid });
            }
        }
        if !can_have_children(parent_task) {
            return Err(HierarchyError::ParentAtMaxDepth(pid));
        }
        let depth = resolution.depth;
        if let Some(tid) = task_id {
            if depth + self.subtree_height(tid) > MAX_TASK_DEPTH {
                return Err(HierarchyError::SubtreeTooDeep { task: tid, parent: pid });
            }
        }
        Ok(depth)
    }

    /// Scan the snapshot for broken links and stale depths.
    pub fn audit(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        for t in self.tasks {
            if let Some(pid) = t.parent_task_id {
                match self.get(pid) {
                    None => issues.push(IntegrityIssue::UnresolvedParent { task: t.id, parent: pid }),
                    Some(p) if p.project_id != t.project_id => {
                        issues.push(IntegrityIssue::CrossProjectParent { task: t.id, parent: pid })
                    }
                    Some(_) => {}
                }
            }
            match self.chain_depth(t) {
                ChainDepth::OnCycle => issues.push(IntegrityIssue::Cycle { task: t.id }),
                ChainDepth::BelowCycle => {}
                ChainDepth::Depth(expected) => {
                    if expected > MAX_TASK_DEPTH {
                        issues.push(IntegrityIssue::DepthExceeded { task: t.id, depth: expected });
                    }
                    if expected != t.depth {
                        issues.push(IntegrityIssue::DepthMismatch {
                            task: t.id,
                            stored: t.depth,
                            expected,
                        });
                    }
                }
            }
        }
        issues
    }

    // Unbounded walk guarded by a visited set; the audit must see through
    // chains that are already too deep.
    fn chain_depth(&self, task: &Task) -> ChainDepth {
        let mut seen = HashSet::from([task.id]);
        let mut depth = 0;
        let mut cur = task;
        while let Some(p) = cur.parent_task_id.and_then(|pid| self.get(pid)) {
            if !seen.insert(p.id) {
                return if p.id == task.id {
                    ChainDepth::OnCycle
                } else {
                    ChainDepth::BelowCycle
                };
            }
            depth += 1;
            cur = p;
        }
        ChainDepth::Depth(depth)
    }
}

enum ChainDepth {
    Depth(u32),
    OnCycle,
    BelowCycle,
}

/// A problem found by [`Snapshot::audit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    UnresolvedParent { task: TaskId, parent: TaskId },
    CrossProjectParent { task: TaskId, parent: TaskId },
    DepthMismatch { task: TaskId, stored: u32, expected: u32 },
    DepthExceeded { task: TaskId, depth: u32 },
    Cycle { task: TaskId },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::UnresolvedParent { task, parent } => {
                write!(f, "task {task}: parent {parent} does not exist")
            }
            IntegrityIssue::CrossProjectParent { task, parent } => {
                write!(f, "task {task}: parent {parent} belongs to another project")
            }
            IntegrityIssue::DepthMismatch { task, stored, expected } => {
                write!(f, "task {task}: stored depth {stored}, expected {expected}")
            }
            IntegrityIssue::DepthExceeded { task, depth } => {
                write!(f, "task {task}: depth {depth} exceeds maximum {MAX_TASK_DEPTH}")
            }
            IntegrityIssue::Cycle { task } => write!(f, "task {task}: parent chain loops back to itself"),
        }
    }
}

/// Recompute `depth` for every descendant of `root_id` from the root's current
/// depth. Returns how many tasks changed.
pub fn rebase_depths(tasks: &mut [Task], root_id: TaskId) -> usize {
    let updates: HashMap<TaskId, u32> = {
        let snap = Snapshot::new(tasks);
        let Some(root) = snap.get(root_id) else {
            return 0;
        };
        let mut out = HashMap::new();
        let mut seen = HashSet::from([root_id]);
        let mut level = vec![(root.id, root.depth)];
        for _ in 0..WALK_LIMIT {
            let mut next = Vec::new();
            for (id, depth) in &level {
                for c in snap.children(*id) {
                    if seen.insert(c.id) {
                        next.push((c.id, depth.saturating_add(1)));
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            out.extend(next.iter().copied());
            level = next;
        }
        out
    };

    let mut changed = 0;
    for t in tasks.iter_mut() {
        if let Some(&d) = updates.get(&t.id) {
            if t.depth != d {
                t.depth = d;
                changed += 1;
            }
        }
    }
    changed
}

/// A candidate paired with its display path.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayEntry<'a> {
    pub task: &'a Task,
    pub path: Vec<&'a str>,
}

impl DisplayEntry<'_> {
    pub fn label(&self) -> String {
        self.path.join(" / ")
    }
}

/// Arrange candidates root-major: each root followed by its direct children
/// that are also candidates. Children whose root is not a candidate are dropped.
pub fn group_for_display<'a>(candidates: &[&'a Task]) -> Vec<DisplayEntry<'a>> {
    let mut out = Vec::new();
    for root in candidates.iter().filter(|t| t.is_root()) {
        out.push(DisplayEntry {
            task: *root,
            path: vec![root.name.as_str()],
        });
        for child in candidates.iter().filter(|c| c.parent_task_id == Some(root.id)) {
            out.push(DisplayEntry {
                task: *child,
                path: vec![root.name.as_str(), child.name.as_str()],
            });
        }
    }
    out
}
