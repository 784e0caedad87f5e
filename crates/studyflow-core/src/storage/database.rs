//! SQLite-backed workspace snapshots.
//!
//! Each user's [`UserState`] is stored as one JSON document. A command runs
//! inside a single `BEGIN IMMEDIATE` transaction: load, run against a
//! [`Workspace`], write back. SQLite allows one such transaction at a time
//! per file, so two processes acting for the same user are serialized just
//! like two threads sharing a `Workspace`. A failed command rolls back and a
//! command that changed nothing writes nothing.
//! There is no durability promise beyond that.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::data_dir;
use crate::clock::Clock;
use crate::error::{DatabaseError, Result};
use crate::feed::Author;
use crate::workspace::{UserId, UserState, Workspace};

/// How long a command waits for another process's transaction to finish.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database holding per-user snapshots.
pub struct Database {
    conn: Connection,
}

/// A user with a stored snapshot and when it was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub user: UserId,
    pub updated_at: DateTime<Utc>,
}

impl Database {
    /// Open the database at `<data_dir>/studyflow.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("studyflow.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS workspaces (
                user_id     TEXT PRIMARY KEY,
                state       TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Stored state for `user`, or an empty one for a first-time user.
    ///
    /// A plain read; use [`with_workspace`](Self::with_workspace) to change it.
    pub fn load_state(&self, user: &UserId) -> Result<UserState> {
        load_state(&self.conn, user)
    }

    /// Run `f` against `user`'s workspace as one exclusive unit.
    ///
    /// The snapshot is loaded and written back inside one immediate
    /// transaction, so concurrent callers (other handles, other processes)
    /// wait for it to finish and then see its result. Nothing is written
    /// when `f` fails or leaves the state as it found it.
    pub fn with_workspace<T, F>(
        &mut self,
        user: UserId,
        author: Author,
        clock: Arc<dyn Clock>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&Workspace) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let state = load_state(&tx, &user)?;
        let before = serde_json::to_string(&state)?;
        let workspace = Workspace::with_state(user, author, clock, state);

        // Dropping `tx` on error rolls back.
        let out = f(&workspace)?;

        let after = serde_json::to_string(&workspace.snapshot()?)?;
        if after != before {
            tx.execute(
                "INSERT INTO workspaces (user_id, state, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
                params![workspace.user().as_str(), after, Utc::now().to_rfc3339()],
            )?;
            debug!(user = %workspace.user(), "workspace saved");
        } else {
            debug!(user = %workspace.user(), "workspace unchanged; nothing written");
        }
        tx.commit()?;
        Ok(out)
    }

    pub fn users(&self) -> Result<Vec<StoredUser>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, updated_at FROM workspaces ORDER BY user_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut users = Vec::new();
        for row in rows {
            let (user, updated_at) = row?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map_err(|e| DatabaseError::QueryFailed(format!("updated_at of {user}: {e}")))?
                .with_timezone(&Utc);
            users.push(StoredUser {
                user: UserId::new(user),
                updated_at,
            });
        }
        Ok(users)
    }
}

fn load_state(conn: &Connection, user: &UserId) -> Result<UserState> {
    let json: Option<String> = conn
        .query_row(
            "SELECT state FROM workspaces WHERE user_id = ?1",
            params![user.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    match json {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => {
            debug!(user = %user, "no stored workspace; starting empty");
            Ok(UserState::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CoreError;
    use crate::task::TaskDraft;
    use crate::timer::SessionMode;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::at_epoch())
    }

    #[test]
    fn missing_user_loads_empty_state() {
        let db = Database::open_memory().unwrap();
        let state = db.load_state(&UserId::new("nobody")).unwrap();
        assert!(state.tasks.is_empty());
        assert!(state.active.is_none());
    }

    #[test]
    fn workspace_survives_save_and_reload() {
        let mut db = Database::open_memory().unwrap();
        let author = Author::new("Ken", "✏️");

        let task = db
            .with_workspace(UserId::new("ken"), author.clone(), clock(), |ws| {
                ws.add_deck("Biology", 120)?;
                let task = ws.create_task(TaskDraft::new("Cells", "Biology"))?;
                ws.start(task.id, SessionMode::Open)?;
                Ok(task)
            })
            .unwrap();

        let active = db
            .with_workspace(UserId::new("ken"), author, clock(), |ws| ws.active_session())
            .unwrap()
            .unwrap();
        assert_eq!(active.task_id, task.id);
        let users: Vec<UserId> = db.users().unwrap().into_iter().map(|u| u.user).collect();
        assert_eq!(users, vec![UserId::new("ken")]);
    }

    #[test]
    fn failed_command_rolls_back() {
        let mut db = Database::open_memory().unwrap();
        let author = Author::new("Ken", "✏️");
        let err = db
            .with_workspace(UserId::new("ken"), author, clock(), |ws| {
                ws.add_deck("Biology", 120)?;
                ws.create_task(TaskDraft::new("Cells", "Chemistry"))
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Deck", .. }));
        assert!(db.load_state(&UserId::new("ken")).unwrap().decks.is_empty());
        assert!(db.users().unwrap().is_empty());
    }

    #[test]
    fn read_only_command_writes_nothing() {
        let mut db = Database::open_memory().unwrap();
        let author = Author::new("Ken", "✏️");
        db.with_workspace(UserId::new("ken"), author.clone(), clock(), |ws| {
            ws.add_deck("Biology", 120).map(|_| ())
        })
        .unwrap();
        let stamp = db.users().unwrap()[0].updated_at;

        db.with_workspace(UserId::new("ken"), author.clone(), clock(), |ws| ws.status())
            .unwrap();
        db.with_workspace(UserId::new("ken"), author.clone(), clock(), |ws| ws.decks())
            .unwrap();
        assert_eq!(db.users().unwrap()[0].updated_at, stamp);

        // a first-time user who only reads gets no row at all
        db.with_workspace(UserId::new("guest"), author, clock(), |ws| ws.tasks())
            .unwrap();
        assert_eq!(db.users().unwrap().len(), 1);
    }
}
