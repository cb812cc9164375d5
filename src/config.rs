//! Runtime configuration: where the database lives and how loudly to log.
//!
//! Precedence for the database path: `--db`, then `TT_DB`, then
//! `$TT_HOME/tasks.json`, then `$HOME/.tt/tasks.json`.
//! Log filter: `TT_LOG`, then `RUST_LOG`, then the `-v` count.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;

pub const DB_FILE_NAME: &str = "tasks.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_filter: String,
}

impl Config {
    /// Resolve from command-line flags and the process environment.
    pub fn resolve(db_flag: Option<PathBuf>, verbose: u8) -> Self {
        Self::from_vars(db_flag, verbose, |k| std::env::var(k).ok())
    }

    fn from_vars(db_flag: Option<PathBuf>, verbose: u8, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |k: &str| var(k).filter(|v| !v.trim().is_empty());

        let db_path = db_flag.or_else(|| non_empty("TT_DB").map(PathBuf::from)).unwrap_or_else(|| {
            let dir = match non_empty("TT_HOME") {
                Some(home) => PathBuf::from(home),
                None => PathBuf::from(non_empty("HOME").unwrap_or_else(|| ".".to_string())).join(".tt"),
            };
            dir.join(DB_FILE_NAME)
        });
        let data_dir = db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let log_filter = non_empty("TT_LOG")
            .or_else(|| non_empty("RUST_LOG"))
            .unwrap_or_else(|| {
                let level = match verbose {
                    0 => "warn",
                    1 => "info",
                    _ => "debug",
                };
                level.to_string()
            });

        Config {
            data_dir,
            db_path,
            log_filter,
        }
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_data_dir(&self) -> Result<(), AppError> {
        if !self.data_dir.exists() {
            debug!(dir = %self.data_dir.display(), "creating data directory");
            std::fs::create_dir_all(&self.data_dir).map_err(|source| AppError::DataDir {
                path: self.data_dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn test_flag_wins() {
        let cfg = Config::from_vars(Some(PathBuf::from("/tmp/x/db.json")), 0, vars(&[("TT_DB", "/other.json")]));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/x/db.json"));
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_env_precedence() {
        let cfg = Config::from_vars(None, 0, vars(&[("TT_DB", "/a/b.json"), ("TT_HOME", "/h")]));
        assert_eq!(cfg.db_path, PathBuf::from("/a/b.json"));

        let cfg = Config::from_vars(None, 0, vars(&[("TT_HOME", "/h"), ("HOME", "/home/me")]));
        assert_eq!(cfg.db_path, PathBuf::from("/h/tasks.json"));

        let cfg = Config::from_vars(None, 0, vars(&[("HOME", "/home/me")]));
        assert_eq!(cfg.db_path, PathBuf::from("/home/me/.tt/tasks.json"));
    }

    #[test]
    fn test_bare_file_name_uses_current_dir() {
        let cfg = Config::from_vars(Some(PathBuf::from("tasks.json")), 0, vars(&[]));
        assert_eq!(cfg.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(Config::from_vars(None, 0, vars(&[])).log_filter, "warn");
        assert_eq!(Config::from_vars(None, 1, vars(&[])).log_filter, "info");
        assert_eq!(Config::from_vars(None, 3, vars(&[])).log_filter, "debug");
        assert_eq!(Config::from_vars(None, 2, vars(&[("TT_LOG", "tt=trace")])).log_filter, "tt=trace");
        assert_eq!(Config::from_vars(None, 0, vars(&[("RUST_LOG", "info")])).log_filter, "info");
    }
}
