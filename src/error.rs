//! Application-level error type returned by every command handler.

use std::path::PathBuf;

use crate::db::StoreError;
use crate::hierarchy::HierarchyError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    /// A task or project identifier did not resolve.
    #[error("{0}")]
    Lookup(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("cannot create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} integrity issue(s) found")]
    Integrity(usize),
}
