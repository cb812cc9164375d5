//! Enumerations and field types for task management.
//!
//! Status, priority and category are closed sets. Each carries a display label
//! and an `ALL` table so the rendering side and the CLI share one source of truth.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task workflow status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    InReview,
    Blocked,
    Done,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Todo,
        Status::InProgress,
        Status::InReview,
        Status::Blocked,
        Status::Done,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::InReview => "In Review",
            Status::Blocked => "Blocked",
            Status::Done => "Done",
        }
    }
}

/// Priority classification for task importance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

/// Kind of work a task represents, used for time reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Development,
    Design,
    Testing,
    Documentation,
    Meeting,
    Research,
    Support,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Development,
        Category::Design,
        Category::Testing,
        Category::Documentation,
        Category::Meeting,
        Category::Research,
        Category::Support,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Development => "Development",
            Category::Design => "Design",
            Category::Testing => "Testing",
            Category::Documentation => "Documentation",
            Category::Meeting => "Meeting",
            Category::Research => "Research",
            Category::Support => "Support",
        }
    }
}

/// Kebab-case key of a value enum, as accepted on the command line.
pub fn value_key<T: ValueEnum>(v: T) -> String {
    v.to_possible_value()
        .map(|p| p.get_name().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_labels_are_unique() {
        let status: HashSet<_> = Status::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(status.len(), Status::ALL.len());
        let priority: HashSet<_> = Priority::ALL.iter().map(|p| p.label()).collect();
        assert_eq!(priority.len(), Priority::ALL.len());
        let category: HashSet<_> = Category::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(category.len(), Category::ALL.len());
    }

    #[test]
    fn test_all_tables_match_value_variants() {
        assert_eq!(Status::ALL.as_slice(), Status::value_variants());
        assert_eq!(Priority::ALL.as_slice(), Priority::value_variants());
        assert_eq!(Category::ALL.as_slice(), Category::value_variants());
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"in-progress\"");
        let s: Status = serde_json::from_str("\"in-review\"").unwrap();
        assert_eq!(s, Status::InReview);
        assert_eq!(value_key(Status::InReview), "in-review");
    }
}
