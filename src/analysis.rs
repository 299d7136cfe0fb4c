use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::classify::{Hit, HitClassifier};
use crate::config::Config;
use crate::matcher::ReportMatcher;
use crate::record::{LineParser, LogRecord};
use crate::source::{RecordSource, ScanEvent, ScanStats};
use crate::sources;
use crate::stats::{AnalysisResult, Report};
use crate::utils::format_number;
use crate::window::AnalysisWindow;
use crate::Args;

/// Everything compiled once per run: line grammar, bot list and report
/// filters.
pub struct Analyzer {
    parser: LineParser,
    classifier: HitClassifier,
    matchers: Vec<ReportMatcher>,
    config: Config,
}

/// Reports as they stand after ingestion, before summarizing.
#[derive(Debug)]
pub struct Ingested {
    pub reports: Vec<Report>,
    pub scan: ScanStats,
    pub skipped: u64,
    pub sources_read: usize,
}

impl Analyzer {
    pub fn new(config: Config) -> Result<Self> {
        let matchers = config
            .reports
            .iter()
            .map(ReportMatcher::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            parser: LineParser::new().context("Failed to compile log line grammar")?,
            classifier: HitClassifier::new().context("Failed to compile bot patterns")?,
            matchers,
            config,
        })
    }

    pub fn window(&self, now: DateTime<FixedOffset>) -> AnalysisWindow {
        AnalysisWindow::ending_at(now, self.config.days_to_consider)
    }

    /// Scan `sources` newest first. The first record older than the window
    /// ends the whole scan, not just the current file.
    pub fn ingest(&self, sources: &[PathBuf], window: &AnalysisWindow) -> Result<Ingested> {
        let mut ingested = Ingested {
            reports: self
                .config
                .reports
                .iter()
                .map(|report| Report::new(report.label.as_str()))
                .collect(),
            scan: ScanStats::default(),
            skipped: 0,
            sources_read: 0,
        };

        for path in sources {
            let start_time = Instant::now();
            let mut source = RecordSource::open(path, &self.parser, window)?;
            ingested.sources_read += 1;

            let window_exhausted = loop {
                match source.next_event()? {
                    ScanEvent::Record(record) => {
                        if !self.ingest_record(&record, &mut ingested.reports) {
                            ingested.skipped += 1;
                        }
                    }
                    ScanEvent::EndOfWindow => break true,
                    ScanEvent::EndOfSource => break false,
                }
            };

            let stats = source.stats();
            info!(
                action = "scan",
                component = "record_source",
                path = ?source.path(),
                bytes_read = stats.bytes_read,
                lines = stats.lines,
                unparsed = stats.unparsed,
                rejected_status = stats.rejected_status,
                in_window = stats.in_window,
                duration_ms = start_time.elapsed().as_millis(),
                "Scanned log source"
            );
            ingested.scan.merge(&stats);

            if window_exhausted {
                info!(
                    action = "stop",
                    component = "ingest",
                    remaining_sources = sources.len() - ingested.sources_read,
                    "Reached window start, skipping remaining sources"
                );
                break;
            }
        }

        Ok(ingested)
    }

    /// Returns false when the hit was classified as not countable.
    fn ingest_record(&self, record: &LogRecord, reports: &mut [Report]) -> bool {
        let Hit::Count { key, weight } = self.classifier.classify(record) else {
            return false;
        };

        for (matcher, report) in self.matchers.iter().zip(reports.iter_mut()) {
            if matcher.matches(record) {
                report.record_hit(&key, weight, record.timestamp);
            }
        }
        true
    }

    pub fn summarize(&self, reports: &mut [Report], max_workers: Option<usize>) -> Result<()> {
        let start_time = Instant::now();
        let max_workers = max_workers.unwrap_or_else(|| std::cmp::min(num_cpus::get(), 8));
        let regular_interval_days = self.config.regular_interval_days;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .build()
            .context("Failed to build worker pool")?;
        pool.install(|| {
            reports
                .par_iter_mut()
                .for_each(|report| report.summarize(regular_interval_days));
        });

        info!(
            action = "complete",
            component = "summarize",
            report_count = reports.len(),
            worker_count = max_workers,
            duration_ms = start_time.elapsed().as_millis(),
            "Reports summarized"
        );
        Ok(())
    }

    pub fn analyze(
        &self,
        sources: &[PathBuf],
        now: DateTime<FixedOffset>,
        max_workers: Option<usize>,
    ) -> Result<AnalysisResult> {
        let window = self.window(now);
        let mut ingested = self.ingest(sources, &window)?;
        self.summarize(&mut ingested.reports, max_workers)?;

        info!(
            action = "complete",
            component = "ingest",
            sources_read = ingested.sources_read,
            lines = ingested.scan.lines,
            in_window = ingested.scan.in_window,
            skipped = ingested.skipped,
            "Ingestion finished"
        );

        Ok(AnalysisResult {
            window,
            reports: ingested.reports.iter().map(Report::summary).collect(),
        })
    }
}

pub fn analyze_access_logs(args: &Args) -> Result<AnalysisResult> {
    let total_start_time = Instant::now();
    info!(
        action = "start",
        component = "analysis",
        "Starting readership analysis"
    );

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(days) = args.days {
        config.days_to_consider = days;
    }
    if let Some(regular_days) = args.regular_days {
        config.regular_interval_days = regular_days;
    }
    config.validate()?;

    let sources = sources::order_sources(sources::collect_sources(&args.logs)?, args.order)?;
    let now = args.now.unwrap_or_else(|| Local::now().fixed_offset());

    let analyzer = Analyzer::new(config)?;
    let result = analyzer.analyze(&sources, now, args.workers)?;

    info!(
        action = "complete",
        component = "analysis",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Analysis completed successfully"
    );
    Ok(result)
}

pub fn print_analysis_results(result: &AnalysisResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!(
        "\n--- Readership from {} to {} ---",
        result.window.start.format("%B %-d, %Y %H:%M"),
        result.window.end.format("%B %-d, %Y %H:%M")
    );

    if result.reports.is_empty() {
        println!("No reports configured.");
        return Ok(());
    }

    let label_width = result
        .reports
        .iter()
        .map(|report| report.label.chars().count())
        .max()
        .unwrap_or(0)
        .max("Report".len());

    println!(
        "{:<label_width$}  {:>10}  {:>10}",
        "Report", "Readers", "Regulars"
    );
    for report in &result.reports {
        println!(
            "{:<label_width$}  {:>10}  {:>10}",
            report.label,
            format_number(report.total),
            format_number(report.regular_total)
        );
    }

    Ok(())
}
