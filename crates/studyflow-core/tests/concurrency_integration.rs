//! Integration tests for the per-user exclusion around start/stop.
//!
//! The first half races threads on one in-process `Workspace`. The second
//! half gives every actor its own `Database` handle on one SQLite file, which
//! is how separate `studyflow` processes meet.

use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use studyflow_core::{
    Author, Clock, CoreError, Database, ManualClock, SessionMode, StopRequest, TaskDraft, TaskId,
    TaskStore, UserId, UserState, Workspace,
};
use tempfile::TempDir;

fn shared_workspace() -> (Arc<Workspace>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_epoch());
    let ws = Workspace::with_state(
        UserId::new("tabs"),
        Author::new("Mio", "📖"),
        clock.clone(),
        UserState::default(),
    );
    ws.add_deck("Reading", 50).unwrap();
    (Arc::new(ws), clock)
}

#[test]
fn racing_starts_leave_exactly_one_session() {
    let (ws, _clock) = shared_workspace();
    let id = ws.create_task(TaskDraft::new("Essay", "Reading")).unwrap().id;

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let ws = Arc::clone(&ws);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ws.start(id, SessionMode::Open)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let started = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(CoreError::Conflict(_))))
        .count();

    assert_eq!(started, 1);
    assert_eq!(conflicts, threads - 1);
    assert!(ws.active_session().unwrap().is_some());
}

#[test]
fn racing_stops_fan_out_once() {
    let (ws, clock) = shared_workspace();
    let task = ws.create_task(TaskDraft::new("Summary", "Reading")).unwrap();
    ws.start(task.id, SessionMode::Open).unwrap();
    clock.advance_secs(900);

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let ws = Arc::clone(&ws);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ws.stop(StopRequest::default())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(CoreError::NoActiveSession))));

    assert_eq!(ws.task(task.id).unwrap().duration_secs, 900);
    assert_eq!(ws.posts().unwrap().len(), 1);
}

fn author() -> Author {
    Author::new("Mio", "📖")
}

fn user() -> UserId {
    UserId::new("tabs")
}

/// A database file with one deck and `count` tasks.
fn seeded_db(dir: &TempDir, clock: &Arc<ManualClock>, count: usize) -> Vec<TaskId> {
    let mut db = Database::open_at(&dir.path().join("studyflow.db")).unwrap();
    db.with_workspace(user(), author(), clock.clone(), |ws| {
        ws.add_deck("Reading", 50)?;
        (0..count)
            .map(|i| ws.create_task(TaskDraft::new(format!("Chapter {i}"), "Reading")).map(|t| t.id))
            .collect()
    })
    .unwrap()
}

fn handle(path: &Path) -> Database {
    Database::open_at(path).unwrap()
}

#[test]
fn second_handle_cannot_replace_a_running_session() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::at_epoch());
    let ids = seeded_db(&dir, &clock, 2);
    let path = dir.path().join("studyflow.db");

    let mut first = handle(&path);
    let mut second = handle(&path);
    first
        .with_workspace(user(), author(), clock.clone(), |ws| ws.start(ids[0], SessionMode::Open))
        .unwrap();
    let err = second
        .with_workspace(user(), author(), clock.clone(), |ws| ws.start(ids[1], SessionMode::Open))
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let stored = handle(&path).load_state(&user()).unwrap();
    assert_eq!(stored.active.map(|a| a.task_id), Some(ids[0]));
}

#[test]
fn racing_handles_start_exactly_one_session() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::at_epoch());
    let threads = 6;
    let ids = seeded_db(&dir, &clock, threads);
    let path = dir.path().join("studyflow.db");

    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let path = path.clone();
            let clock = clock.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut db = handle(&path);
                barrier.wait();
                db.with_workspace(user(), author(), clock, |ws| ws.start(id, SessionMode::Open))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(CoreError::Conflict(_)))));

    let stored = handle(&path).load_state(&user()).unwrap();
    assert!(stored.active.is_some());
}

#[test]
fn concurrent_status_cannot_undo_a_stop() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::at_epoch());
    let ids = seeded_db(&dir, &clock, 1);
    let path = dir.path().join("studyflow.db");

    handle(&path)
        .with_workspace(user(), author(), clock.clone(), |ws| ws.start(ids[0], SessionMode::Open))
        .unwrap();

    // The reader loads the running session, then lingers before finishing.
    let (loaded_tx, loaded_rx) = mpsc::channel();
    let reader = {
        let path = path.clone();
        let clock = clock.clone();
        thread::spawn(move || {
            handle(&path).with_workspace(user(), author(), clock, |ws| {
                let status = ws.status();
                loaded_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(200));
                status
            })
        })
    };

    loaded_rx.recv().unwrap();
    clock.advance_secs(600);
    let done = handle(&path)
        .with_workspace(user(), author(), clock.clone(), |ws| ws.stop(StopRequest::default()))
        .unwrap();
    assert_eq!(done.duration_secs, 600);
    reader.join().unwrap().unwrap();

    let stored: UserState = handle(&path).load_state(&user()).unwrap();
    assert!(stored.active.is_none());
    assert_eq!(stored.feed.len(), 1);
    let task = stored.tasks.list().into_iter().next().cloned().unwrap();
    assert_eq!(task.duration_secs, 600);
    assert_eq!(task.sessions[0].started_at, clock.now() - chrono::Duration::seconds(600));
}

#[test]
fn reads_leave_the_stored_snapshot_untouched() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::at_epoch());
    let ids = seeded_db(&dir, &clock, 1);
    let path = dir.path().join("studyflow.db");
    let stamp = handle(&path).users().unwrap()[0].updated_at;

    let mut db = handle(&path);
    db.with_workspace(user(), author(), clock.clone(), |ws| ws.status()).unwrap();
    db.with_workspace(user(), author(), clock.clone(), |ws| ws.task(ids[0])).unwrap();
    db.with_workspace(user(), author(), clock.clone(), |ws| ws.posts()).unwrap();

    assert_eq!(handle(&path).users().unwrap()[0].updated_at, stamp);
}
