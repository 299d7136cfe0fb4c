pub mod analysis;
pub mod args;
pub mod classify;
pub mod config;
pub mod matcher;
pub mod record;
pub mod source;
pub mod sources;
pub mod stats;
pub mod utils;
pub mod window;

pub use analysis::{analyze_access_logs, Analyzer};
pub use args::Args;
pub use config::{init_default_config, Config, ReportConfig, TestType};
pub use stats::{AnalysisResult, ReportSummary};
pub use window::AnalysisWindow;
