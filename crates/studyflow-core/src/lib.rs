//! # StudyFlow Core Library
//!
//! Core business logic for StudyFlow, a study tracker built around tasks,
//! a start/stop session timer, a small social feed and analytics. The
//! `studyflow` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Session Timer**: at most one active session per user; elapsed time is
//!   always derived from the start timestamp, never stored
//! - **Completion Fan-out**: a stop updates the task, records the session and
//!   posts to the feed as one unit
//! - **Workspace**: per-user state behind a mutex; one method per user action
//! - **Storage**: SQLite snapshots per user and TOML configuration
//!
//! ## Key Components
//!
//! - [`Workspace`]: entry point for every user action
//! - [`UserState`]: the state core operations are passed explicitly
//! - [`StudyAnalyzer`]: derives totals and breakdowns from tasks
//! - [`Database`]: workspace persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod deck;
pub mod error;
pub mod events;
pub mod feed;
pub mod goals;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;
pub mod workspace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use deck::{Deck, DeckRegistry};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use feed::{Author, Feed, FeedSink, NewPost, Post, PostId};
pub use goals::Goals;
pub use stats::{AnalyticsReport, StudyAnalyzer, StudySummary};
pub use storage::{Config, Database, StoredUser};
pub use task::{MemoryTaskStore, PageRange, SessionRecord, Task, TaskDraft, TaskId, TaskPatch, TaskStore};
pub use timer::{ActiveSession, Completion, SessionMode, StopRequest, TimerState};
pub use workspace::{UserId, UserState, Workspace};
