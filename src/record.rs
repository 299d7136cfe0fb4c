use chrono::{DateTime, FixedOffset};
use regex::Regex;

const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One parsed access-log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<FixedOffset>,
    /// `None` when the status field is not numeric (e.g. `-`).
    pub status: Option<u16>,
    pub client: String,
    pub agent: String,
    pub path: String,
    pub referer: String,
}

impl LogRecord {
    /// Only successful and redirected requests count as reads.
    pub fn is_countable(&self) -> bool {
        matches!(self.status, Some(status) if status < 400)
    }
}

/// Combined/common log format parser. Compile once, reuse for every line.
pub struct LineParser {
    re: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self, regex::Error> {
        // host ident user [time] "request" status bytes ["referer" "agent"]
        let re = Regex::new(
            r#"^(\S+) \S+ \S+ \[([^\]]+)\] "(?:[^"\s]+ )?([^"\s]*)(?:[^"\\]|\\.)*" (\S+) \S+(?: "((?:[^"\\]|\\.)*)" "((?:[^"\\]|\\.)*)")?"#,
        )?;
        Ok(Self { re })
    }

    pub fn parse(&self, line: &str) -> Option<LogRecord> {
        let caps = self.re.captures(line)?;
        let timestamp = DateTime::parse_from_str(caps.get(2)?.as_str(), TIMESTAMP_FORMAT).ok()?;

        Some(LogRecord {
            timestamp,
            status: caps.get(4).and_then(|m| m.as_str().parse().ok()),
            client: caps[1].to_string(),
            path: caps[3].to_string(),
            referer: caps.get(5).map_or_else(String::new, |m| unescape(m.as_str())),
            agent: caps.get(6).map_or_else(String::new, |m| unescape(m.as_str())),
        })
    }
}

/// Undo the `\"` and `\\` escaping servers apply inside quoted fields.
fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(next) => {
                    out.push(ch);
                    out.push(next);
                }
                None => out.push(ch),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
