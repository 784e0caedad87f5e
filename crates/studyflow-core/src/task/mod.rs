//! Study tasks.
//!
//! A task is a unit of study work tied to a deck. It accumulates time across
//! any number of start/stop cycles:
//!
//! ```text
//!   created ──start──> active ──stop──> idle ──start──> active ...
//!      |                                  |
//!      +──────────── complete ────────────+──> completed (no new sessions)
//! ```
//!
//! Completion is a separate user action and is independent of how much time
//! was tracked. `duration_secs` is only ever written by the completion
//! fan-out in [`crate::timer`].

mod store;

pub use store::{MemoryTaskStore, TaskStore};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::deck::Deck;
use crate::error::{Result, ValidationError};

pub const MIN_CONCENTRATION: u8 = 1;
pub const MAX_CONCENTRATION: u8 = 10;

/// Task identifier. Assigned from the creation time in milliseconds and
/// bumped past the previous id when two tasks share a millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Next id after `last`, derived from `now`.
    pub fn next(last: Option<TaskId>, now: DateTime<Utc>) -> TaskId {
        let from_clock = now.timestamp_millis().max(0) as u64;
        match last {
            Some(TaskId(prev)) if prev >= from_clock => TaskId(prev + 1),
            _ => TaskId(from_clock),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(TaskId)
            .map_err(|e| ValidationError::InvalidValue {
                field: "task id",
                message: e.to_string(),
            })
    }
}

/// Pages covered by a task: `1 <= start <= current <= end <= deck total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub current: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, current: u32, end: u32, total: u32) -> Result<Self, ValidationError> {
        if start < 1 || start > current || current > end || end > total {
            return Err(ValidationError::PageRange {
                start,
                current,
                end,
                total,
            });
        }
        Ok(Self { start, current, end })
    }

    /// Same range with the bookmark moved.
    pub fn with_current(self, current: u32, total: u32) -> Result<Self, ValidationError> {
        Self::new(self.start, current, self.end, total)
    }

    /// Percentage of the range already read.
    pub fn progress_pct(&self) -> u8 {
        if self.end == self.start {
            return 100;
        }
        let done = (self.current - self.start) as u64 * 100;
        (done / (self.end - self.start) as u64) as u8
    }
}

/// One stopped session, as appended by the completion fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Name of the deck this task studies
    pub deck: String,
    pub due: Option<NaiveDate>,
    pub pages: Option<PageRange>,
    /// Explicit progress (0-100); superseded by `pages` when present
    #[serde(default)]
    pub progress: u8,
    pub completed: bool,
    /// Accumulated study time in seconds
    pub duration_secs: u64,
    /// Concentration rating (1-10) recorded at the last stop
    pub concentration: Option<u8>,
    /// Memo recorded at the last stop
    pub memo: Option<String>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a task from user input, validating against its deck.
    pub fn from_draft(id: TaskId, draft: TaskDraft, deck: &Deck, now: DateTime<Utc>) -> Result<Self> {
        let name = required_text(&draft.name, "task name")?;
        let pages = match draft.pages {
            Some((start, end)) => {
                let current = draft.current_page.unwrap_or(start);
                Some(PageRange::new(start, current, end, deck.total_pages)?)
            }
            None if draft.current_page.is_some() => {
                return Err(ValidationError::InvalidValue {
                    field: "current_page",
                    message: "a page range is required to set the current page".into(),
                }
                .into());
            }
            None => None,
        };
        let progress = match draft.progress {
            Some(p) => validate_progress(p)?,
            None => 0,
        };

        Ok(Task {
            id,
            name,
            deck: deck.name.clone(),
            due: draft.due,
            pages,
            progress,
            completed: false,
            duration_secs: 0,
            concentration: None,
            memo: None,
            sessions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Effective progress: derived from the page range when one is set.
    pub fn progress_pct(&self) -> u8 {
        self.pages
            .map(|p| p.progress_pct())
            .unwrap_or(self.progress)
    }

    /// True once any time has been tracked, regardless of `completed`.
    pub fn is_studied(&self) -> bool {
        self.duration_secs > 0
    }

    /// Apply a user edit. Fields are validated before anything is written.
    pub fn apply_patch(&mut self, patch: TaskPatch, deck: &Deck, now: DateTime<Utc>) -> Result<()> {
        let name = patch
            .name
            .as_deref()
            .map(|n| required_text(n, "task name"))
            .transpose()?;
        let pages = match (patch.current_page, self.pages) {
            (Some(current), Some(range)) => Some(range.with_current(current, deck.total_pages)?),
            (Some(_), None) => {
                return Err(ValidationError::InvalidValue {
                    field: "current_page",
                    message: "task has no page range".into(),
                }
                .into());
            }
            (None, range) => range,
        };
        let progress = patch.progress.map(validate_progress).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(due) = patch.due {
            self.due = due;
        }
        if let Some(progress) = progress {
            self.progress = progress;
        }
        self.pages = pages;
        self.updated_at = now;
        Ok(())
    }

    /// Fold one stopped session into the task. Last stop wins for rating and memo.
    pub(crate) fn record_session(
        &mut self,
        started_at: DateTime<Utc>,
        duration_secs: u64,
        concentration: Option<u8>,
        memo: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.duration_secs = self.duration_secs.saturating_add(duration_secs);
        self.sessions.push(SessionRecord {
            started_at,
            duration_secs,
        });
        self.concentration = concentration;
        self.memo = memo;
        self.updated_at = now;
    }
}

/// User input for a new task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub deck: String,
    pub due: Option<NaiveDate>,
    /// `(start, end)` pages
    pub pages: Option<(u32, u32)>,
    /// Defaults to the start page
    pub current_page: Option<u32>,
    pub progress: Option<u8>,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, deck: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deck: deck.into(),
            ..Self::default()
        }
    }

    pub fn with_pages(mut self, start: u32, end: u32) -> Self {
        self.pages = Some((start, end));
        self
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }
}

/// Editable task fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the due date
    pub due: Option<Option<NaiveDate>>,
    pub current_page: Option<u32>,
    pub progress: Option<u8>,
}

pub fn validate_concentration(rating: u8) -> Result<u8, ValidationError> {
    if !(MIN_CONCENTRATION..=MAX_CONCENTRATION).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "concentration",
            value: rating as i64,
            min: MIN_CONCENTRATION as i64,
            max: MAX_CONCENTRATION as i64,
        });
    }
    Ok(rating)
}

/// Trimmed memo; blank memos become `None`.
pub fn normalize_memo(memo: Option<String>) -> Option<String> {
    memo.map(|m| m.trim().to_string()).filter(|m| !m.is_empty())
}

fn validate_progress(progress: u8) -> Result<u8, ValidationError> {
    if progress > 100 {
        return Err(ValidationError::OutOfRange {
            field: "progress",
            value: progress as i64,
            min: 0,
            max: 100,
        });
    }
    Ok(progress)
}

fn required_text(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(value.to_string())
}
