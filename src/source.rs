use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::record::{LineParser, LogRecord};
use crate::window::AnalysisWindow;

const CHUNK_SIZE: usize = 64 * 1024;

/// What the next step of a backward scan produced.
#[derive(Debug)]
pub enum ScanEvent {
    Record(LogRecord),
    /// A record older than the window start was reached. Nothing older,
    /// in this source or any later one, may be consumed.
    EndOfWindow,
    EndOfSource,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Bytes pulled from the file (decompressed for gzip).
    pub bytes_read: u64,
    pub lines: u64,
    pub unparsed: u64,
    pub rejected_status: u64,
    pub in_window: u64,
}

impl ScanStats {
    pub fn merge(&mut self, other: &ScanStats) {
        self.bytes_read += other.bytes_read;
        self.lines += other.lines;
        self.unparsed += other.unparsed;
        self.rejected_status += other.rejected_status;
        self.in_window += other.in_window;
    }
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Lines of a seekable reader, last line first, read in fixed-size chunks
/// from the end.
pub struct ReverseLines<R> {
    reader: R,
    pos: u64,
    pending: Vec<u8>,
    chunk_size: usize,
    bytes_read: u64,
}

impl<R: Read + Seek> ReverseLines<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        Self::with_chunk_size(reader, CHUNK_SIZE)
    }

    pub fn with_chunk_size(mut reader: R, chunk_size: usize) -> io::Result<Self> {
        let pos = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            reader,
            pos,
            pending: Vec::new(),
            chunk_size: chunk_size.max(1),
            bytes_read: 0,
        })
    }

    /// Offset of the first byte not yet read.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(newline) = self.pending.iter().rposition(|&b| b == b'\n') {
                let line = self.pending.split_off(newline + 1);
                self.pending.truncate(newline);
                return Ok(Some(line));
            }

            if self.pos == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            let len = (self.chunk_size as u64).min(self.pos) as usize;
            self.pos -= len as u64;
            self.reader.seek(SeekFrom::Start(self.pos))?;

            let mut chunk = vec![0; len];
            self.reader.read_exact(&mut chunk)?;
            self.bytes_read += len as u64;
            chunk.extend_from_slice(&self.pending);
            self.pending = chunk;
        }
    }
}

enum Lines {
    Backward(ReverseLines<File>),
    /// Gzip streams cannot seek, so the whole file is decoded up front.
    Buffered(Vec<Vec<u8>>),
}

/// Lines of one log file, handed out newest (last) first.
pub struct RecordSource<'a> {
    path: PathBuf,
    lines: Lines,
    parser: &'a LineParser,
    window: &'a AnalysisWindow,
    stats: ScanStats,
}

impl<'a> RecordSource<'a> {
    pub fn open(path: &Path, parser: &'a LineParser, window: &'a AnalysisWindow) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open log source {}", path.display()))?;

        let mut stats = ScanStats::default();
        let lines = if is_gzip(path) {
            let lines = BufReader::new(GzDecoder::new(file))
                .split(b'\n')
                .collect::<io::Result<Vec<_>>>()
                .with_context(|| format!("Failed to read log source {}", path.display()))?;
            stats.bytes_read = lines.iter().map(|line| line.len() as u64 + 1).sum();
            debug!(action = "open", component = "record_source", path = ?path, line_count = lines.len(), "Decompressed log source");
            Lines::Buffered(lines)
        } else {
            let reverse = ReverseLines::new(file)
                .with_context(|| format!("Failed to read log source {}", path.display()))?;
            debug!(action = "open", component = "record_source", path = ?path, size = reverse.position(), "Opened log source");
            Lines::Backward(reverse)
        };

        Ok(Self {
            path: path.to_path_buf(),
            lines,
            parser,
            window,
            stats,
        })
    }

    pub fn from_lines(
        path: &Path,
        lines: Vec<Vec<u8>>,
        parser: &'a LineParser,
        window: &'a AnalysisWindow,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: Lines::Buffered(lines),
            parser,
            window,
            stats: ScanStats::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn next_raw_line(&mut self) -> Result<Option<Vec<u8>>> {
        match &mut self.lines {
            Lines::Buffered(lines) => Ok(lines.pop()),
            Lines::Backward(reverse) => {
                let line = reverse
                    .next_line()
                    .with_context(|| format!("Failed to read log source {}", self.path.display()))?;
                self.stats.bytes_read = reverse.bytes_read();
                Ok(line)
            }
        }
    }

    /// Advance to the next countable record, skipping unparseable lines and
    /// error statuses.
    pub fn next_event(&mut self) -> Result<ScanEvent> {
        while let Some(raw) = self.next_raw_line()? {
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            self.stats.lines += 1;

            let Some(record) = self.parser.parse(line) else {
                self.stats.unparsed += 1;
                continue;
            };

            if !record.is_countable() {
                self.stats.rejected_status += 1;
                continue;
            }

            if self.window.is_before_start(&record.timestamp) {
                return Ok(ScanEvent::EndOfWindow);
            }

            self.stats.in_window += 1;
            return Ok(ScanEvent::Record(record));
        }

        Ok(ScanEvent::EndOfSource)
    }
}
