use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;

use crate::window::AnalysisWindow;

/// Length of a "day" when deciding regularity.
pub const REGULAR_DAY_SECONDS: i64 = 62400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitStats {
    pub count: u64,
    pub earliest: DateTime<FixedOffset>,
    pub latest: DateTime<FixedOffset>,
}

impl HitStats {
    pub fn elapsed_seconds(&self) -> i64 {
        (self.latest - self.earliest).num_seconds().abs()
    }

    pub fn is_regular(&self, regular_interval_days: u32) -> bool {
        self.elapsed_seconds() / REGULAR_DAY_SECONDS >= i64::from(regular_interval_days)
    }
}

/// Accumulated readership for one configured report.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub label: String,
    pub hits: HashMap<String, HitStats>,
    pub total: u64,
    pub regular_total: u64,
}

impl Report {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Fold one matched hit in. Records arrive newest first, so `latest` is
    /// fixed at first sight while `earliest` and `count` follow every hit.
    pub fn record_hit(&mut self, key: &str, weight: u64, timestamp: DateTime<FixedOffset>) {
        match self.hits.get_mut(key) {
            Some(stats) => {
                stats.earliest = timestamp;
                stats.count = weight;
            }
            None => {
                self.hits.insert(
                    key.to_string(),
                    HitStats {
                        count: weight,
                        earliest: timestamp,
                        latest: timestamp,
                    },
                );
            }
        }
    }

    pub fn summarize(&mut self, regular_interval_days: u32) {
        self.total = self.hits.values().map(|stats| stats.count).sum();
        self.regular_total = self
            .hits
            .values()
            .filter(|stats| stats.is_regular(regular_interval_days))
            .map(|stats| stats.count)
            .sum();
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            label: self.label.clone(),
            total: self.total,
            regular_total: self.regular_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub label: String,
    pub total: u64,
    pub regular_total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub window: AnalysisWindow,
    pub reports: Vec<ReportSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn at(days_ago: i64) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-10-18T00:00:00+00:00").unwrap() - Duration::days(days_ago)
    }

    #[test]
    fn first_hit_fixes_latest_later_hits_move_earliest() {
        let mut report = Report::new("feed");
        report.record_hit("a", 1, at(1));
        report.record_hit("a", 1, at(3));
        report.record_hit("a", 1, at(5));

        let stats = report.hits["a"];
        assert_eq!(stats.latest, at(1));
        assert_eq!(stats.earliest, at(5));
    }

    #[test]
    fn count_is_overwritten_not_summed() {
        let mut report = Report::new("feed");
        report.record_hit("Feedly", 40, at(1));
        report.record_hit("Feedly", 37, at(2));

        assert_eq!(report.hits["Feedly"].count, 37);
        report.summarize(1);
        assert_eq!(report.total, 37);
    }

    #[test]
    fn three_days_apart_is_regular() {
        let mut report = Report::new("feed");
        report.record_hit("203.0.113.7", 1, at(2));
        report.record_hit("203.0.113.7", 1, at(5));

        let stats = report.hits["203.0.113.7"];
        assert_eq!(stats.elapsed_seconds(), 259200);
        assert!(stats.is_regular(1));
        assert!(stats.is_regular(4));
        assert!(!stats.is_regular(5));

        report.summarize(1);
        assert_eq!((report.total, report.regular_total), (1, 1));
    }

    #[test]
    fn single_hit_is_never_regular() {
        let mut report = Report::new("feed");
        report.record_hit("a", 12, at(1));
        assert_eq!(report.hits["a"].elapsed_seconds(), 0);

        for days in [1, 2, 14] {
            report.summarize(days);
            assert_eq!((report.total, report.regular_total), (12, 0));
        }
    }

    #[test]
    fn regular_day_is_shorter_than_a_calendar_day() {
        let mut report = Report::new("feed");
        let latest = at(1);
        report.record_hit("a", 1, latest);
        report.record_hit("a", 1, latest - Duration::seconds(REGULAR_DAY_SECONDS));
        report.summarize(1);
        assert_eq!(report.regular_total, 1);
    }

    #[test]
    fn regulars_never_exceed_total() {
        let mut report = Report::new("feed");
        report.record_hit("a", 1, at(1));
        report.record_hit("b", 5, at(1));
        report.record_hit("b", 5, at(4));
        report.record_hit("c", 1, at(2));
        report.record_hit("c", 1, at(2) - Duration::hours(1));
        report.summarize(1);

        assert_eq!(report.total, 7);
        assert_eq!(report.regular_total, 5);
        assert!(report.regular_total <= report.total);
        assert_eq!(
            report.summary(),
            ReportSummary {
                label: "feed".to_string(),
                total: 7,
                regular_total: 5,
            }
        );
    }
}
