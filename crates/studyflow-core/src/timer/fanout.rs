//! Completion fan-out.
//!
//! One stopped session produces three writes: the task's accumulated
//! duration (plus a session record for analytics), a post at the head of the
//! feed, and the updated task handed back to the caller. Every check happens
//! before the first write and the writes themselves cannot fail, so the
//! unit is applied whole or not at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::feed::{Author, FeedSink, PostId};
use crate::task::{Task, TaskId, TaskStore};

/// What the timer hands over when a session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoppedSession {
    pub task_id: TaskId,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub concentration: Option<u8>,
    pub memo: Option<String>,
}

/// Result of a successful stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub task: Task,
    pub post_id: PostId,
    /// Length of the session that just ended
    pub duration_secs: u64,
    pub stopped_at: DateTime<Utc>,
}

impl Completion {
    pub fn event(&self) -> Event {
        Event::SessionStopped {
            task_id: self.task.id,
            duration_secs: self.duration_secs,
            total_secs: self.task.duration_secs,
            post_id: self.post_id,
            at: self.stopped_at,
        }
    }
}

/// Apply the fan-out for one stopped session.
///
/// # Errors
/// `NotFound` if the task was deleted while the session ran; nothing is written.
pub fn apply<S, F>(
    tasks: &mut S,
    feed: &mut F,
    author: &Author,
    stopped: StoppedSession,
    now: DateTime<Utc>,
) -> Result<Completion>
where
    S: TaskStore + ?Sized,
    F: FeedSink + ?Sized,
{
    let mut task = tasks
        .get(stopped.task_id)
        .cloned()
        .ok_or_else(|| CoreError::not_found("Task", stopped.task_id))?;

    // `completed` is deliberately left alone: stopping is not finishing.
    task.record_session(
        stopped.started_at,
        stopped.duration_secs,
        stopped.concentration,
        stopped.memo,
        now,
    );
    let text = post_text(&task.name, stopped.duration_secs);

    tasks.upsert(task.clone());
    let post_id = feed.prepend(author.post(text, now));
    debug!(task = %task.id, post = post_id, "fan-out applied");

    Ok(Completion {
        task,
        post_id,
        duration_secs: stopped.duration_secs,
        stopped_at: now,
    })
}

/// `"{name}: {minutes} min studied"`, minutes truncated. Sub-minute sessions
/// still post (as `0 min`) so every stop yields exactly one post.
pub fn post_text(task_name: &str, duration_secs: u64) -> String {
    format!("{task_name}: {} min studied", duration_secs / 60)
}
