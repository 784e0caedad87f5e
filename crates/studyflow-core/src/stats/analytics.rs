//! Study analytics.
//!
//! Pure aggregation over a user's tasks. Only tasks with tracked time
//! ("has been studied") feed the totals; whether they are marked completed
//! does not matter. Nothing here is stored, the report is rebuilt on demand.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::task::Task;

/// Aggregates for a user with at least one studied task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySummary {
    pub total_secs: u64,
    /// Mean concentration over studied tasks that recorded one.
    /// `None` means no data, never zero.
    pub average_concentration: Option<f64>,
    /// Tasks marked completed, across the whole store
    pub completed_count: usize,
    pub studied_task_count: usize,
    pub session_count: usize,
    /// Seconds per local calendar date, keyed by session start
    pub by_date: BTreeMap<NaiveDate, u64>,
    /// Seconds per deck name
    pub by_deck: BTreeMap<String, u64>,
}

impl StudySummary {
    pub fn concentration_label(&self) -> String {
        match self.average_concentration {
            Some(avg) => format!("{avg:.1}"),
            None => "no data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyticsReport {
    /// No task has any tracked time yet
    InsufficientData { completed_count: usize },
    Ready(StudySummary),
}

impl AnalyticsReport {
    pub fn summary(&self) -> Option<&StudySummary> {
        match self {
            AnalyticsReport::Ready(summary) => Some(summary),
            AnalyticsReport::InsufficientData { .. } => None,
        }
    }
}

/// Builds [`AnalyticsReport`]s in a fixed local time zone.
#[derive(Debug, Clone)]
pub struct StudyAnalyzer {
    offset: FixedOffset,
}

impl Default for StudyAnalyzer {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl StudyAnalyzer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Offset given in minutes east of UTC.
    ///
    /// # Errors
    /// `OutOfRange` unless `minutes` is within ±23:59.
    pub fn with_offset_minutes(minutes: i32) -> Result<Self, ValidationError> {
        offset_from_minutes(minutes).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn analyze<'a, I>(&self, tasks: I) -> AnalyticsReport
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut total_secs = 0u64;
        let mut completed_count = 0usize;
        let mut studied_task_count = 0usize;
        let mut session_count = 0usize;
        let mut ratings: Vec<u8> = Vec::new();
        let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        let mut by_deck: BTreeMap<String, u64> = BTreeMap::new();

        for task in tasks {
            if task.completed {
                completed_count += 1;
            }
            if !task.is_studied() {
                continue;
            }

            studied_task_count += 1;
            total_secs += task.duration_secs;
            *by_deck.entry(task.deck.clone()).or_insert(0) += task.duration_secs;
            if let Some(rating) = task.concentration {
                ratings.push(rating);
            }

            for session in task.sessions.iter().filter(|s| s.duration_secs > 0) {
                session_count += 1;
                let date = session.started_at.with_timezone(&self.offset).date_naive();
                *by_date.entry(date).or_insert(0) += session.duration_secs;
            }
        }

        if studied_task_count == 0 {
            return AnalyticsReport::InsufficientData { completed_count };
        }

        let average_concentration = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64)
        };

        AnalyticsReport::Ready(StudySummary {
            total_secs,
            average_concentration,
            completed_count,
            studied_task_count,
            session_count,
            by_date,
            by_deck,
        })
    }
}

pub const MAX_OFFSET_MINUTES: i32 = 23 * 60 + 59;

/// `FixedOffset` for a minutes-east-of-UTC value, rejecting anything past a day.
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, ValidationError> {
    let out_of_range = || ValidationError::OutOfRange {
        field: "utc_offset_minutes",
        value: i64::from(minutes),
        min: -i64::from(MAX_OFFSET_MINUTES),
        max: i64::from(MAX_OFFSET_MINUTES),
    };
    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
        return Err(out_of_range());
    }
    FixedOffset::east_opt(minutes * 60).ok_or_else(out_of_range)
}
