//! # tt - project task tracking CLI
//!
//! Tracks tasks per project in a three-level hierarchy (root, child,
//! grandchild) and keeps that hierarchy consistent on every write.
//!
//! ## Hierarchy rules
//!
//! - A root task has depth 0; a child sits one level below its parent.
//! - Depth never exceeds [`hierarchy::MAX_TASK_DEPTH`] (2), so tasks at depth 2
//!   cannot take children.
//! - A parent must belong to the same project.
//! - Re-parenting that would make a task its own ancestor is rejected.
//!
//! ## Quick Start
//!
//! ```bash
//! tt project add "Website" --client Acme
//! tt add "Backend" --project Website
//! tt add "API" --project Website --parent Backend
//! tt candidates --project Website --grouped
//! tt list --tree
//! tt check
//! ```
//!
//! Data is stored in `~/.tt/tasks.json` unless `--db`, `TT_DB` or `TT_HOME`
//! say otherwise. Set `TT_LOG` (or pass `-v`) for diagnostics on stderr.

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod fields;
pub mod hierarchy;
pub mod task;

use cli::Cli;
use cmd::*;
use config::Config;
use db::Database;
use error::AppError;

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    let config = Config::resolve(cli.db.clone(), cli.verbose);
    init_tracing(&config.log_filter);

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &Config) -> Result<(), AppError> {
    match command {
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
        Commands::Labels => {
            cmd_labels();
            Ok(())
        }
        Commands::Project { action } => with_db(config, |db, db_path| match action {
            ProjectAction::Add { name, client } => cmd_project_add(db, db_path, name, client).map(|_| ()),
            ProjectAction::List => {
                cmd_project_list(db);
                Ok(())
            }
        }),
        Commands::Add(args) => with_db(config, |db, db_path| cmd_add(db, db_path, args).map(|_| ())),
        Commands::List { project, status, all, tree } => {
            with_db(config, |db, _| cmd_list(db, project, status, all, tree))
        }
        Commands::View { id } => with_db(config, |db, _| cmd_view(db, id)),
        Commands::Update(args) => with_db(config, |db, db_path| cmd_update(db, db_path, args)),
        Commands::Candidates { project, editing, grouped } => {
            with_db(config, |db, _| cmd_candidates(db, project, editing, grouped))
        }
        Commands::Path { id } => with_db(config, |db, _| cmd_path(db, id)),
        Commands::Check => with_db(config, |db, _| cmd_check(db)),
    }
}

/// Load the database, creating its directory first, and hand it to `f`.
fn with_db<F>(config: &Config, f: F) -> Result<(), AppError>
where
    F: FnOnce(&mut Database, &Path) -> Result<(), AppError>,
{
    config.ensure_data_dir()?;
    let db_path = config.db_path.as_path();
    let mut db = Database::load(db_path)?;
    tracing::debug!(path = %db_path.display(), "using database");
    f(&mut db, db_path)
}
