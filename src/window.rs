use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;

/// Trailing interval `[now - days, now]` a run considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl AnalysisWindow {
    pub fn ending_at(now: DateTime<FixedOffset>, days_to_consider: u32) -> Self {
        Self {
            start: now - Duration::days(i64::from(days_to_consider)),
            end: now,
        }
    }

    /// True once a timestamp falls before the window; scanning stops there.
    pub fn is_before_start(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        *timestamp < self.start
    }
}
