use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "readercount.toml";

// Include example configuration at compile time
const EXAMPLE_CONFIG: &str = include_str!("../readercount.example.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Path,
    PathRegex,
    RefererRegex,
    AgentRegex,
    /// Anything else. Loads fine, never matches.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportConfig {
    pub label: String,
    pub test_type: TestType,
    pub test: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub regular_interval_days: u32,
    pub days_to_consider: u32,
    pub reports: Vec<ReportConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            regular_interval_days: 1,
            days_to_consider: 14,
            reports: Vec::new(),
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.days_to_consider == 0 {
            anyhow::bail!("days_to_consider must be greater than 0");
        }
        if self.regular_interval_days == 0 {
            anyhow::bail!("regular_interval_days must be greater than 0");
        }
        Ok(())
    }

    /// Load from `path`, or from `readercount.toml` in the working directory
    /// when no path is given. A missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let start_time = Instant::now();

        let config = match path {
            Some(path) => {
                info!(action = "load", component = "config", file_path = ?path, "Loading configuration");
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::parse(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => {
                let default_file = Path::new(DEFAULT_CONFIG_FILE);
                if default_file.exists() {
                    info!(action = "load", component = "default_config", file_path = ?default_file, "Loading configuration from default file");
                    let content = fs::read_to_string(default_file).with_context(|| {
                        format!("Failed to read config file {}", default_file.display())
                    })?;
                    Self::parse(&content).with_context(|| {
                        format!("Invalid config file {}", default_file.display())
                    })?
                } else {
                    info!(
                        action = "load",
                        component = "default_config",
                        "No configuration file found, using defaults"
                    );
                    Self::default()
                }
            }
        };

        info!(
            action = "complete",
            component = "config",
            report_count = config.reports.len(),
            days_to_consider = config.days_to_consider,
            regular_interval_days = config.regular_interval_days,
            duration_ms = start_time.elapsed().as_millis(),
            "Configuration loaded"
        );
        Ok(config)
    }
}

pub fn init_default_config() -> Result<()> {
    let default_file = Path::new(DEFAULT_CONFIG_FILE);

    if default_file.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            DEFAULT_CONFIG_FILE
        );
    }

    fs::write(default_file, EXAMPLE_CONFIG)?;
    println!("Created {} with example reports", DEFAULT_CONFIG_FILE);

    Ok(())
}
