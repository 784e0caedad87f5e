//! Per-user context.
//!
//! [`UserState`] is everything one user owns: tasks, decks, feed, goals and
//! the active-session slot. Core operations take it explicitly; there is no
//! ambient global.
//!
//! [`Workspace`] wraps one user's state in a mutex and exposes one method per
//! user action. Each method holds the lock for its whole duration, which is
//! the single-writer section that keeps `start`/`stop` atomic even when two
//! requests for the same user race.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::deck::{Deck, DeckRegistry};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::feed::{Author, Feed, Post, PostId};
use crate::goals::Goals;
use crate::stats::{AnalyticsReport, StudyAnalyzer};
use crate::task::{MemoryTaskStore, Task, TaskDraft, TaskId, TaskPatch, TaskStore};
use crate::timer::{self, ActiveSession, Completion, SessionMode, StopRequest};

/// Opaque user reference. The core never authenticates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything one user owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserState {
    #[serde(default)]
    pub tasks: MemoryTaskStore,
    #[serde(default)]
    pub decks: DeckRegistry,
    #[serde(default)]
    pub feed: Feed,
    #[serde(default)]
    pub goals: Goals,
    /// The at-most-one running session
    #[serde(default)]
    pub active: Option<ActiveSession>,
}

impl UserState {
    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<Task> {
        let deck = self.decks.require(&draft.deck)?;
        let id = TaskId::next(self.tasks.last_id(), now);
        let task = Task::from_draft(id, draft, deck, now)?;
        self.tasks.upsert(task.clone());
        Ok(task)
    }

    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch, now: DateTime<Utc>) -> Result<Task> {
        let mut task = self.require_task(id)?.clone();
        let deck = self.decks.require(&task.deck)?;
        task.apply_patch(patch, deck, now)?;
        self.tasks.upsert(task.clone());
        Ok(task)
    }

    /// Mark a task done (or reopen it). Independent of tracked time.
    pub fn set_completed(&mut self, id: TaskId, completed: bool, now: DateTime<Utc>) -> Result<Task> {
        if completed && self.is_active_target(id) {
            return Err(CoreError::conflict(format!(
                "task {id} has a running session; stop it first"
            )));
        }
        let mut task = self.require_task(id)?.clone();
        task.completed = completed;
        task.updated_at = now;
        self.tasks.upsert(task.clone());
        Ok(task)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        if self.is_active_target(id) {
            return Err(CoreError::conflict(format!(
                "task {id} has a running session; stop it first"
            )));
        }
        self.tasks
            .delete(id)
            .ok_or_else(|| CoreError::not_found("Task", id))
    }

    fn require_task(&self, id: TaskId) -> Result<&Task> {
        self.tasks
            .get(id)
            .ok_or_else(|| CoreError::not_found("Task", id))
    }

    fn is_active_target(&self, id: TaskId) -> bool {
        self.active.as_ref().is_some_and(|a| a.task_id == id)
    }
}

/// One user's state behind a lock, plus who they are and what time it is.
pub struct Workspace {
    user: UserId,
    author: Author,
    clock: Arc<dyn Clock>,
    state: Mutex<UserState>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("user", &self.user)
            .field("author", &self.author)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Empty workspace on the system clock.
    pub fn new(user: UserId, author: Author) -> Self {
        Self::with_state(user, author, Arc::new(SystemClock), UserState::default())
    }

    pub fn with_state(user: UserId, author: Author, clock: Arc<dyn Clock>, state: UserState) -> Self {
        Self {
            user,
            author,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Copy of the current state, e.g. for persisting.
    pub fn snapshot(&self) -> Result<UserState> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, UserState>> {
        self.state.lock().map_err(|_| CoreError::StatePoisoned)
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn start(&self, task_id: TaskId, mode: SessionMode) -> Result<Event> {
        let mut state = self.lock()?;
        let event = timer::start(&mut state, task_id, mode, self.clock.now())?;
        info!(user = %self.user, ?event, "timer event");
        Ok(event)
    }

    pub fn elapsed(&self) -> Result<u64> {
        let state = self.lock()?;
        timer::elapsed(&state, self.clock.now())
    }

    pub fn status(&self) -> Result<Event> {
        let state = self.lock()?;
        Ok(timer::snapshot(&state, self.clock.now()))
    }

    pub fn stop(&self, request: StopRequest) -> Result<Completion> {
        let mut state = self.lock()?;
        let completion = timer::stop(&mut state, &self.author, request, self.clock.now())?;
        info!(user = %self.user, event = ?completion.event(), "timer event");
        Ok(completion)
    }

    pub fn discard_orphan(&self) -> Result<Event> {
        let mut state = self.lock()?;
        let event = timer::discard_orphan(&mut state, self.clock.now())?;
        info!(user = %self.user, ?event, "timer event");
        Ok(event)
    }

    pub fn active_session(&self) -> Result<Option<ActiveSession>> {
        Ok(self.lock()?.active.clone())
    }

    // ── Tasks & decks ────────────────────────────────────────────────

    pub fn add_deck(&self, name: &str, total_pages: u32) -> Result<Deck> {
        let mut state = self.lock()?;
        let deck = state.decks.add(name, total_pages)?;
        info!(user = %self.user, deck = %deck.name, total_pages, "deck added");
        Ok(deck)
    }

    pub fn decks(&self) -> Result<Vec<Deck>> {
        Ok(self.lock()?.decks.list().to_vec())
    }

    pub fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        let mut state = self.lock()?;
        let task = state.create_task(draft, self.clock.now())?;
        info!(user = %self.user, task = %task.id, name = %task.name, "task created");
        Ok(task)
    }

    pub fn task(&self, id: TaskId) -> Result<Task> {
        let state = self.lock()?;
        state.require_task(id).cloned()
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        let state = self.lock()?;
        Ok(state.tasks.list().into_iter().cloned().collect())
    }

    pub fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let mut state = self.lock()?;
        let task = state.update_task(id, patch, self.clock.now())?;
        debug!(user = %self.user, task = %id, "task updated");
        Ok(task)
    }

    pub fn set_completed(&self, id: TaskId, completed: bool) -> Result<Task> {
        let mut state = self.lock()?;
        let task = state.set_completed(id, completed, self.clock.now())?;
        info!(user = %self.user, task = %id, completed, "task completion changed");
        Ok(task)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<Task> {
        let mut state = self.lock()?;
        let task = state
            .delete_task(id)
            .inspect_err(|e| warn!(user = %self.user, task = %id, error = %e, "delete rejected"))?;
        info!(user = %self.user, task = %id, "task deleted");
        Ok(task)
    }

    // ── Feed ─────────────────────────────────────────────────────────

    pub fn publish(&self, text: &str) -> Result<PostId> {
        let mut state = self.lock()?;
        let post = self.author.post(text.trim(), self.clock.now());
        state.feed.publish(post)
    }

    pub fn like(&self, id: PostId) -> Result<u64> {
        self.lock()?.feed.like(id)
    }

    pub fn comment(&self, id: PostId, text: &str) -> Result<usize> {
        self.lock()?.feed.comment(id, text)
    }

    pub fn posts(&self) -> Result<Vec<Post>> {
        Ok(self.lock()?.feed.posts().to_vec())
    }

    // ── Goals & analytics ────────────────────────────────────────────

    pub fn set_goals(&self, long_term: Option<&str>, short_term: Option<&str>) -> Result<Goals> {
        let mut state = self.lock()?;
        state.goals.update(long_term, short_term);
        Ok(state.goals.clone())
    }

    pub fn goals(&self) -> Result<Goals> {
        Ok(self.lock()?.goals.clone())
    }

    pub fn analytics(&self, analyzer: &StudyAnalyzer) -> Result<AnalyticsReport> {
        let state = self.lock()?;
        Ok(analyzer.analyze(state.tasks.list()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn workspace() -> (Workspace, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let ws = Workspace::with_state(
            UserId::new("u1"),
            Author::new("Yuki", "📚"),
            clock.clone(),
            UserState::default(),
        );
        ws.add_deck("Physics", 250).unwrap();
        (ws, clock)
    }

    #[test]
    fn task_ids_are_unique_even_at_the_same_instant() {
        let (ws, _clock) = workspace();
        let a = ws.create_task(TaskDraft::new("Mechanics", "Physics")).unwrap();
        let b = ws.create_task(TaskDraft::new("Waves", "Physics")).unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.id > a.id);
    }

    #[test]
    fn create_task_for_unknown_deck() {
        let (ws, _clock) = workspace();
        let err = ws.create_task(TaskDraft::new("Organic", "Chemistry")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Deck", .. }));
        assert!(ws.tasks().unwrap().is_empty());
    }

    #[test]
    fn active_task_cannot_be_deleted_or_completed() {
        let (ws, clock) = workspace();
        let task = ws.create_task(TaskDraft::new("Optics", "Physics")).unwrap();
        ws.start(task.id, SessionMode::Open).unwrap();

        assert!(matches!(ws.delete_task(task.id), Err(CoreError::Conflict(_))));
        assert!(matches!(ws.set_completed(task.id, true), Err(CoreError::Conflict(_))));

        clock.advance_secs(90);
        ws.stop(StopRequest::default()).unwrap();
        assert!(ws.set_completed(task.id, true).unwrap().completed);
        ws.delete_task(task.id).unwrap();
        assert!(matches!(ws.task(task.id), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn completion_without_tracked_time_is_allowed() {
        let (ws, _clock) = workspace();
        let task = ws.create_task(TaskDraft::new("Review", "Physics")).unwrap();
        let done = ws.set_completed(task.id, true).unwrap();
        assert!(done.completed);
        assert_eq!(done.duration_secs, 0);
        let reopened = ws.set_completed(task.id, false).unwrap();
        assert!(!reopened.completed);
    }

    #[test]
    fn user_posts_are_attributed_to_author() {
        let (ws, _clock) = workspace();
        let id = ws.publish("  今日も頑張る  ").unwrap();
        ws.like(id).unwrap();
        ws.comment(id, "ファイト").unwrap();
        let posts = ws.posts().unwrap();
        assert_eq!(posts[0].author, "Yuki");
        assert_eq!(posts[0].text, "今日も頑張る");
        assert_eq!(posts[0].likes, 1);
        assert_eq!(posts[0].comments.len(), 1);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let (ws, clock) = workspace();
        let task = ws.create_task(TaskDraft::new("Thermo", "Physics").with_pages(10, 40)).unwrap();
        ws.start(task.id, SessionMode::pomodoro(25)).unwrap();
        clock.advance_secs(30);
        ws.set_goals(Some("合格"), None).unwrap();

        let json = serde_json::to_string(&ws.snapshot().unwrap()).unwrap();
        let restored: UserState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.active, ws.active_session().unwrap());
        assert_eq!(restored.tasks.get(task.id), Some(&task));
        assert_eq!(restored.goals.long_term.as_deref(), Some("合格"));
    }
}
