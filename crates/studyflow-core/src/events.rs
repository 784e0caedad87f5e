use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::PostId;
use crate::task::TaskId;
use crate::timer::{SessionMode, TimerState};

/// Every timer state change produces an Event.
/// The CLI prints them; the workspace logs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        task_id: TaskId,
        task_name: String,
        mode: SessionMode,
        at: DateTime<Utc>,
    },
    SessionStopped {
        task_id: TaskId,
        duration_secs: u64,
        /// Task total after this session
        total_secs: u64,
        post_id: PostId,
        at: DateTime<Utc>,
    },
    /// An orphaned session (its task was deleted) was dropped without fan-out.
    SessionDiscarded {
        task_id: TaskId,
        started_at: DateTime<Utc>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        task_id: Option<TaskId>,
        task_name: Option<String>,
        started_at: Option<DateTime<Utc>>,
        elapsed_secs: u64,
        mode: Option<SessionMode>,
        remaining_secs: Option<u64>,
        overrun: bool,
        at: DateTime<Utc>,
    },
}
