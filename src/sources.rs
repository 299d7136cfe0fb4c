use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

/// How to decide which log file is newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SourceOrder {
    /// Rotation suffix: access.log, access.log.1, access.log.2.gz, ...
    #[default]
    Name,
    /// Most recently modified first
    Mtime,
}

/// Rotation number of a logrotate-style name; the live file is 0.
pub fn rotation_index(path: &Path) -> u64 {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);

    name.rsplit_once('.')
        .and_then(|(_, suffix)| suffix.parse().ok())
        .unwrap_or(0)
}

fn is_access_log(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().contains("access"))
}

/// Expand directories into the access logs they hold.
pub fn collect_sources(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let entries = fs::read_dir(input)
                .with_context(|| format!("Failed to list log directory {}", input.display()))?;
            for entry in entries {
                let path = entry
                    .with_context(|| format!("Failed to list log directory {}", input.display()))?
                    .path();
                if path.is_file() && is_access_log(&path) {
                    sources.push(path);
                }
            }
        } else {
            sources.push(input.clone());
        }
    }

    Ok(sources)
}

/// Sort newest first so the scan can stop at the first out-of-window record.
pub fn order_sources(mut sources: Vec<PathBuf>, order: SourceOrder) -> Result<Vec<PathBuf>> {
    match order {
        SourceOrder::Name => {
            sources.sort_by(|a, b| {
                rotation_index(a)
                    .cmp(&rotation_index(b))
                    .then_with(|| a.cmp(b))
            });
        }
        SourceOrder::Mtime => {
            let mut stamped = sources
                .into_iter()
                .map(|path| {
                    let modified = fs::metadata(&path)
                        .and_then(|meta| meta.modified())
                        .with_context(|| {
                            format!("Failed to read modification time of {}", path.display())
                        })?;
                    Ok((modified, path))
                })
                .collect::<Result<Vec<(SystemTime, PathBuf)>>>()?;
            stamped.sort_by(|(a_time, a), (b_time, b)| {
                b_time.cmp(a_time).then_with(|| a.cmp(b))
            });
            sources = stamped.into_iter().map(|(_, path)| path).collect();
        }
    }

    info!(action = "order", component = "log_sources", order = ?order, source_count = sources.len(), "Ordered log sources");
    Ok(sources)
}
