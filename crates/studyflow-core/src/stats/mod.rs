//! Statistics module for StudyFlow.
//!
//! Derives totals, concentration averages and per-date / per-deck breakdowns
//! from the task store. Rendering charts is left to the caller.

mod analytics;

pub use analytics::{offset_from_minutes, AnalyticsReport, StudyAnalyzer, StudySummary, MAX_OFFSET_MINUTES};
