use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::config::{ReportConfig, TestType};
use crate::record::LogRecord;

/// A report filter with its pattern compiled.
#[derive(Debug, Clone)]
pub enum ReportMatcher {
    Path(String),
    PathRegex(Regex),
    RefererRegex(Regex),
    AgentRegex(Regex),
    Never,
}

fn compile(report: &ReportConfig) -> Result<Regex> {
    RegexBuilder::new(&report.test)
        .ignore_whitespace(true)
        .build()
        .with_context(|| format!("Invalid pattern for report '{}'", report.label))
}

impl ReportMatcher {
    pub fn compile(report: &ReportConfig) -> Result<Self> {
        Ok(match report.test_type {
            TestType::Path => Self::Path(report.test.clone()),
            TestType::PathRegex => Self::PathRegex(compile(report)?),
            TestType::RefererRegex => Self::RefererRegex(compile(report)?),
            TestType::AgentRegex => Self::AgentRegex(compile(report)?),
            TestType::Unknown => {
                warn!(action = "compile", component = "report_matcher", label = %report.label, "Unknown test_type, report will never match");
                Self::Never
            }
        })
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        match self {
            Self::Path(path) => record.path == *path,
            Self::PathRegex(re) => re.is_match(&record.path),
            Self::RefererRegex(re) => re.is_match(&record.referer),
            Self::AgentRegex(re) => re.is_match(&record.agent),
            Self::Never => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record() -> LogRecord {
        LogRecord {
            timestamp: DateTime::parse_from_rfc3339("2026-10-17T00:00:00+00:00").unwrap(),
            status: Some(200),
            client: "192.0.2.10".to_string(),
            agent: "NetNewsWire (RSS Reader; https://netnewswire.com/)".to_string(),
            path: "/blog/atom.xml".to_string(),
            referer: "https://news.ycombinator.com/item?id=1".to_string(),
        }
    }

    fn matcher(test_type: TestType, test: &str) -> ReportMatcher {
        ReportMatcher::compile(&ReportConfig {
            label: "test".to_string(),
            test_type,
            test: test.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn path_is_exact() {
        assert!(matcher(TestType::Path, "/blog/atom.xml").matches(&record()));
        assert!(!matcher(TestType::Path, "/blog/atom").matches(&record()));
        assert!(!matcher(TestType::Path, "/BLOG/atom.xml").matches(&record()));
    }

    #[test]
    fn path_regex_is_free_spacing() {
        let m = matcher(
            TestType::PathRegex,
            r"^/blog/   # section
              (?: atom | rss ) \.xml $",
        );
        assert!(m.matches(&record()));
        assert!(!matcher(TestType::PathRegex, r"^/feed").matches(&record()));
    }

    #[test]
    fn referer_and_agent_regex() {
        assert!(matcher(TestType::RefererRegex, r"ycombinator\.com").matches(&record()));
        assert!(!matcher(TestType::RefererRegex, r"google\.").matches(&record()));
        assert!(matcher(TestType::AgentRegex, r"NetNewsWire").matches(&record()));
        assert!(!matcher(TestType::AgentRegex, r"Feedly").matches(&record()));
    }

    #[test]
    fn unknown_type_never_matches() {
        assert!(!matcher(TestType::Unknown, "").matches(&record()));
    }

    #[test]
    fn bad_pattern_names_the_report() {
        let err = ReportMatcher::compile(&ReportConfig {
            label: "Broken".to_string(),
            test_type: TestType::AgentRegex,
            test: "(".to_string(),
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("Broken"));
    }
}
