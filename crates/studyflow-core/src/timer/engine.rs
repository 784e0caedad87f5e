//! Session timer.
//!
//! Governs the single active study session of one user. All state lives in
//! [`UserState::active`]; nothing about a running session is cached besides
//! its start timestamp, so elapsed and remaining time are recomputed on every
//! observation.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Active --stop--> Idle (+ completion fan-out)
//!                   |
//!                   +--discard_orphan--> Idle   (only when the task is gone)
//! ```
//!
//! Every command takes the user's state explicitly; callers that may run
//! concurrently go through [`crate::Workspace`], which serializes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fanout::{self, Completion, StoppedSession};
use crate::clock::secs_between;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::feed::Author;
use crate::task::{normalize_memo, validate_concentration, TaskId, TaskStore};
use crate::workspace::UserState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Active,
}

/// How the session was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SessionMode {
    /// Open-ended stopwatch
    Open,
    /// Pomodoro-style session with a planned length. Informational only:
    /// the timer never stops itself.
    Timed { planned_secs: u64 },
}

impl SessionMode {
    pub fn pomodoro(minutes: u32) -> Self {
        SessionMode::Timed {
            planned_secs: u64::from(minutes) * 60,
        }
    }
}

/// The at-most-one in-flight study interval for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub task_id: TaskId,
    pub started_at: DateTime<Utc>,
    pub mode: SessionMode,
}

impl ActiveSession {
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        secs_between(self.started_at, now)
    }

    /// Time left of the planned length, saturating at zero. `None` for open sessions.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        match self.mode {
            SessionMode::Open => None,
            SessionMode::Timed { planned_secs } => {
                Some(planned_secs.saturating_sub(self.elapsed_secs(now)))
            }
        }
    }

    /// Whether a timed session has run past its plan.
    pub fn overrun(&self, now: DateTime<Utc>) -> bool {
        match self.mode {
            SessionMode::Open => false,
            SessionMode::Timed { planned_secs } => self.elapsed_secs(now) > planned_secs,
        }
    }
}

/// Rating and memo supplied when stopping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopRequest {
    pub concentration: Option<u8>,
    pub memo: Option<String>,
}

/// Begin a session for `task_id`.
///
/// # Errors
/// - `Conflict` if a session is already running (it is never replaced)
/// - `NotFound` if the task does not exist
/// - `Validation` if the task is completed or the planned length is zero
pub fn start(
    state: &mut UserState,
    task_id: TaskId,
    mode: SessionMode,
    now: DateTime<Utc>,
) -> Result<Event> {
    if let Some(active) = &state.active {
        warn!(running = %active.task_id, requested = %task_id, "start rejected: session already active");
        return Err(CoreError::conflict(format!(
            "a session for task {} is already active",
            active.task_id
        )));
    }
    let task = state
        .tasks
        .get(task_id)
        .ok_or_else(|| CoreError::not_found("Task", task_id))?;
    if task.completed {
        return Err(ValidationError::InvalidValue {
            field: "task",
            message: format!("task {task_id} is already completed"),
        }
        .into());
    }
    if let SessionMode::Timed { planned_secs: 0 } = mode {
        return Err(ValidationError::OutOfRange {
            field: "planned_secs",
            value: 0,
            min: 1,
            max: i64::MAX,
        }
        .into());
    }

    let task_name = task.name.clone();
    state.active = Some(ActiveSession {
        task_id,
        started_at: now,
        mode,
    });
    info!(task = %task_id, ?mode, "study session started");

    Ok(Event::SessionStarted {
        task_id,
        task_name,
        mode,
        at: now,
    })
}

/// Seconds since the active session started. Never cached.
pub fn elapsed(state: &UserState, now: DateTime<Utc>) -> Result<u64> {
    let active = state.active.as_ref().ok_or(CoreError::NoActiveSession)?;
    Ok(active.elapsed_secs(now))
}

/// Full snapshot of the timer, derived from the current state.
pub fn snapshot(state: &UserState, now: DateTime<Utc>) -> Event {
    match &state.active {
        None => Event::StateSnapshot {
            state: TimerState::Idle,
            task_id: None,
            task_name: None,
            started_at: None,
            elapsed_secs: 0,
            mode: None,
            remaining_secs: None,
            overrun: false,
            at: now,
        },
        Some(active) => {
            let task_name = state.tasks.get(active.task_id).map(|t| t.name.clone());
            debug!(task = %active.task_id, found = task_name.is_some(), "timer snapshot");
            Event::StateSnapshot {
                state: TimerState::Active,
                task_id: Some(active.task_id),
                task_name,
                started_at: Some(active.started_at),
                elapsed_secs: active.elapsed_secs(now),
                mode: Some(active.mode),
                remaining_secs: active.remaining_secs(now),
                overrun: active.overrun(now),
                at: now,
            }
        }
    }
}

/// End the active session and fan the result out.
///
/// The session is cleared only after the fan-out succeeded, so either both
/// happen or neither does.
///
/// # Errors
/// - `NoActiveSession` when idle
/// - `Validation` for a rating outside 1-10
/// - `NotFound` if the task vanished since `start`; the session stays put
pub fn stop(
    state: &mut UserState,
    author: &Author,
    request: StopRequest,
    now: DateTime<Utc>,
) -> Result<Completion> {
    let active = state.active.clone().ok_or(CoreError::NoActiveSession)?;
    let concentration = request
        .concentration
        .map(validate_concentration)
        .transpose()?;

    let stopped = StoppedSession {
        task_id: active.task_id,
        started_at: active.started_at,
        duration_secs: active.elapsed_secs(now),
        concentration,
        memo: normalize_memo(request.memo),
    };

    let completion = fanout::apply(&mut state.tasks, &mut state.feed, author, stopped, now)
        .inspect_err(|e| warn!(task = %active.task_id, error = %e, "stop aborted; session kept"))?;
    state.active = None;

    info!(
        task = %completion.task.id,
        duration_secs = completion.duration_secs,
        total_secs = completion.task.duration_secs,
        "study session stopped"
    );
    Ok(completion)
}

/// Drop a session whose task no longer exists.
///
/// This is recovery from a failed [`stop`], not a way to cancel live work:
/// while the task exists the call is rejected.
pub fn discard_orphan(state: &mut UserState, now: DateTime<Utc>) -> Result<Event> {
    let active = state.active.as_ref().ok_or(CoreError::NoActiveSession)?;
    if state.tasks.get(active.task_id).is_some() {
        return Err(CoreError::conflict(format!(
            "task {} still exists; stop the session instead",
            active.task_id
        )));
    }

    let Some(discarded) = state.active.take() else {
        return Err(CoreError::NoActiveSession);
    };
    warn!(task = %discarded.task_id, "discarded orphaned session");
    Ok(Event::SessionDiscarded {
        task_id: discarded.task_id,
        started_at: discarded.started_at,
        elapsed_secs: discarded.elapsed_secs(now),
        at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskDraft};
    use chrono::Duration;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::default() + Duration::seconds(secs)
    }

    fn state_with_task() -> (UserState, TaskId) {
        let mut state = UserState::default();
        state.decks.add("English", 100).unwrap();
        let deck = state.decks.require("English").unwrap().clone();
        let task = Task::from_draft(TaskId(1), TaskDraft::new("Reading", "English"), &deck, t(0)).unwrap();
        state.tasks.upsert(task);
        (state, TaskId(1))
    }

    fn author() -> Author {
        Author::new("taro", "📚")
    }

    #[test]
    fn start_elapsed_stop() {
        let (mut state, id) = state_with_task();
        start(&mut state, id, SessionMode::Open, t(0)).unwrap();
        assert_eq!(elapsed(&state, t(300)).unwrap(), 300);
        // derived, not cached
        assert_eq!(elapsed(&state, t(301)).unwrap(), 301);

        let done = stop(&mut state, &author(), StopRequest::default(), t(300)).unwrap();
        assert_eq!(done.duration_secs, 300);
        assert_eq!(done.task.duration_secs, 300);
        assert!(state.active.is_none());
        assert!(matches!(elapsed(&state, t(400)), Err(CoreError::NoActiveSession)));
    }

    #[test]
    fn second_start_conflicts_without_side_effects() {
        let (mut state, id) = state_with_task();
        start(&mut state, id, SessionMode::Open, t(0)).unwrap();
        let before = state.active.clone();
        let err = start(&mut state, id, SessionMode::pomodoro(25), t(10)).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(state.active, before);
    }

    #[test]
    fn start_unknown_or_completed_task() {
        let (mut state, id) = state_with_task();
        assert!(matches!(
            start(&mut state, TaskId(99), SessionMode::Open, t(0)),
            Err(CoreError::NotFound { .. })
        ));

        let mut task = state.tasks.get(id).unwrap().clone();
        task.completed = true;
        state.tasks.upsert(task);
        assert!(matches!(
            start(&mut state, id, SessionMode::Open, t(0)),
            Err(CoreError::Validation(_))
        ));
        assert!(state.active.is_none());
    }

    #[test]
    fn zero_length_plan_is_rejected() {
        let (mut state, id) = state_with_task();
        let err = start(&mut state, id, SessionMode::Timed { planned_secs: 0 }, t(0)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn timed_session_reports_remaining_and_overrun() {
        let (mut state, id) = state_with_task();
        start(&mut state, id, SessionMode::pomodoro(25), t(0)).unwrap();
        let active = state.active.as_ref().unwrap();
        assert_eq!(active.remaining_secs(t(600)), Some(900));
        assert!(!active.overrun(t(1500)));
        assert_eq!(active.remaining_secs(t(1800)), Some(0));
        assert!(active.overrun(t(1800)));
        // still running: a plan never auto-stops
        assert!(state.active.is_some());
    }

    #[test]
    fn invalid_rating_leaves_session_running() {
        let (mut state, id) = state_with_task();
        start(&mut state, id, SessionMode::Open, t(0)).unwrap();
        let req = StopRequest {
            concentration: Some(11),
            memo: None,
        };
        assert!(stop(&mut state, &author(), req, t(60)).is_err());
        assert!(state.active.is_some());
        assert!(state.feed.is_empty());
        assert_eq!(state.tasks.get(id).unwrap().duration_secs, 0);
    }

    #[test]
    fn snapshot_idle_and_active() {
        let (mut state, id) = state_with_task();
        match snapshot(&state, t(0)) {
            Event::StateSnapshot { state, elapsed_secs, .. } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(elapsed_secs, 0);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }

        start(&mut state, id, SessionMode::Open, t(0)).unwrap();
        match snapshot(&state, t(42)) {
            Event::StateSnapshot {
                state,
                task_name,
                elapsed_secs,
                remaining_secs,
                ..
            } => {
                assert_eq!(state, TimerState::Active);
                assert_eq!(task_name.as_deref(), Some("Reading"));
                assert_eq!(elapsed_secs, 42);
                assert_eq!(remaining_secs, None);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[test]
    fn discard_orphan_requires_missing_task() {
        let (mut state, id) = state_with_task();
        assert!(matches!(discard_orphan(&mut state, t(0)), Err(CoreError::NoActiveSession)));

        start(&mut state, id, SessionMode::Open, t(0)).unwrap();
        assert!(matches!(discard_orphan(&mut state, t(5)), Err(CoreError::Conflict(_))));
        assert!(state.active.is_some());

        state.tasks.delete(id);
        let event = discard_orphan(&mut state, t(5)).unwrap();
        assert!(matches!(event, Event::SessionDiscarded { elapsed_secs: 5, .. }));
        assert!(state.active.is_none());
    }
}
