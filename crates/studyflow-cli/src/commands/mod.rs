pub mod config;
pub mod deck;
pub mod feed;
pub mod goal;
pub mod stats;
pub mod task;
pub mod timer;

use std::sync::Arc;

use serde::Serialize;
use studyflow_core::{Config, CoreError, Database, SystemClock, UserId, Workspace};
use tracing::debug;

/// Run `f` against the user's workspace as one database transaction.
///
/// Load, command and save happen under one SQLite write lock, so concurrent
/// `studyflow` processes for the same user run one after another. Nothing is
/// written when `f` fails or only reads.
pub fn with_workspace<T>(
    user: Option<String>,
    f: impl FnOnce(&Workspace, &Config) -> Result<T, CoreError>,
) -> Result<T, CoreError> {
    let config = Config::load()?;
    let user = user.map(UserId::new).unwrap_or_else(|| config.default_user());
    let mut db = Database::open()?;
    debug!(user = %user, "opening workspace");
    db.with_workspace(user, config.author(), Arc::new(SystemClock), |ws| {
        f(ws, &config)
    })
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CoreError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn list_users() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    print_json(&db.users()?)?;
    Ok(())
}
