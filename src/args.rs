use chrono::{DateTime, FixedOffset};
use clap::Parser;
use std::path::PathBuf;

use crate::sources::SourceOrder;

#[derive(Parser, Debug)]
#[command(
    name = "readercount",
    about = "Estimate current readership from web server access logs",
    version,
    long_about = None
)]
pub struct Args {
    /// Access log files or directories containing them
    #[arg(value_name = "LOG", required_unless_present = "init")]
    pub logs: Vec<PathBuf>,

    /// Path to configuration file (default: readercount.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of days of logs to consider
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Days between first and last visit for a regular reader
    #[arg(short, long)]
    pub regular_days: Option<u32>,

    /// How to decide which log file is newest
    #[arg(short, long, value_enum, default_value_t = SourceOrder::Name)]
    pub order: SourceOrder,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Analyze as if it were this time (RFC 3339)
    #[arg(long, value_parser = parse_now)]
    pub now: Option<DateTime<FixedOffset>>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Initialize readercount.toml with example reports
    #[arg(long)]
    pub init: bool,
}

fn parse_now(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
}
