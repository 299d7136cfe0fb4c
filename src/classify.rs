use regex::Regex;

use crate::record::LogRecord;

/// Generic automation terms, then known crawlers and HTTP tools.
const BOT_PATTERNS: &[&str] = &[
    r"[Bb]ot\b",
    r"[Cc]rawler",
    r"[Ss]pider",
    r"[Ff]etcher",
    r"Slurp",
    r"ia_archiver",
    r"facebookexternalhit",
    r"Feedfetcher",
    r"Mediapartners",
    r"AdsBot",
    r"YandexBot",
    r"Baiduspider",
    r"bingbot",
    r"DuckDuckBot",
    r"Applebot",
    r"AhrefsBot",
    r"SemrushBot",
    r"MJ12bot",
    r"PetalBot",
    r"\bcurl/",
    r"\bWget/",
    r"python-requests",
    r"Go-http-client",
    r"libwww-perl",
];

// The prefix is empty or ends in a non-word, non-comma character, so the
// count is never a tail of a longer or comma-grouped number.
const SUBSCRIBER_PATTERN: &str =
    r"^((?:.*[^\w,])?)(\d{1,3}(?:,\d{3})+|\d+)\s+(?:subscriber|reader)s?\b";

/// How a single request should be counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Skip,
    Count { key: String, weight: u64 },
}

pub struct HitClassifier {
    subscribers: Regex,
    bots: Vec<Regex>,
}

impl HitClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        let subscribers = Regex::new(SUBSCRIBER_PATTERN)?;
        let bots = BOT_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { subscribers, bots })
    }

    /// Aggregators reporting a subscriber count are keyed by their agent
    /// prefix and weighted by that count. Everything else is one reader per
    /// client address unless the agent looks like a bot.
    pub fn classify(&self, record: &LogRecord) -> Hit {
        if let Some(caps) = self.subscribers.captures(&record.agent) {
            return match caps[2].replace(',', "").parse::<u64>() {
                Ok(weight) if weight > 0 => Hit::Count {
                    key: caps[1].trim_end().to_string(),
                    weight,
                },
                // A zero or overflowing count carries no readers we can use.
                _ => Hit::Skip,
            };
        }

        if self.is_bot(&record.agent) {
            return Hit::Skip;
        }

        Hit::Count {
            key: record.client.clone(),
            weight: 1,
        }
    }

    pub fn is_bot(&self, agent: &str) -> bool {
        self.bots.iter().any(|re| re.is_match(agent))
    }
}
