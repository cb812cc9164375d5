//! Formatting and input parsing helpers shared by the command handlers.

use chrono::{Duration, Local, NaiveDate};

use crate::db::Database;
use crate::task::Task;

/// Parse a due date.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD"
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
        return None;
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let days = (d - today).num_days();
            match days {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {}d", n),
                n => format!("{}d late", -n),
            }
        }
    }
}

pub fn format_hours(h: Option<f64>) -> String {
    match h {
        Some(h) => format!("{:.1}h", h),
        None => "-".into(),
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Print tasks as a table, optionally indenting names by depth.
pub fn print_table(db: &Database, tasks: &[&Task], indent: bool) {
    println!(
        "{:<5} {:<14} {:<12} {:<8} {:<14} {:<10} {:<6} {}",
        "ID", "Project", "Status", "Priority", "Category", "Due", "Est", "Name"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        let project = db.project(t.project_id).map(|p| p.name.as_str()).unwrap_or("-");
        let pad = if indent { "  ".repeat(t.depth as usize) } else { String::new() };
        println!(
            "{:<5} {:<14} {:<12} {:<8} {:<14} {:<10} {:<6} {}{}",
            t.id,
            truncate(project, 14),
            t.status.label(),
            t.priority.label(),
            t.category.label(),
            format_due_relative(t.due_date, today),
            format_hours(t.estimated_hours),
            pad,
            t.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_due_input() {
        let today = day(2025, 3, 10);
        assert_eq!(parse_due_input("today", today), Some(today));
        assert_eq!(parse_due_input(" Tomorrow ", today), Some(day(2025, 3, 11)));
        assert_eq!(parse_due_input("in 5d", today), Some(day(2025, 3, 15)));
        assert_eq!(parse_due_input("in 2w", today), Some(day(2025, 3, 24)));
        assert_eq!(parse_due_input("2025-12-01", today), Some(day(2025, 12, 1)));
        assert_eq!(parse_due_input("in a while", today), None);
        assert_eq!(parse_due_input("someday", today), None);
    }

    #[test]
    fn test_format_due_relative() {
        let today = day(2025, 3, 10);
        assert_eq!(format_due_relative(None, today), "-");
        assert_eq!(format_due_relative(Some(today), today), "today");
        assert_eq!(format_due_relative(Some(day(2025, 3, 11)), today), "tomorrow");
        assert_eq!(format_due_relative(Some(day(2025, 3, 14)), today), "in 4d");
        assert_eq!(format_due_relative(Some(day(2025, 3, 8)), today), "2d late");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer name", 6), "a lon…");
    }
}
