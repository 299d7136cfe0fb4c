use anyhow::Result;
use clap::Parser;
use tracing::error;

use readercount::analysis::print_analysis_results;
use readercount::utils::{setup_logging, validate_args};
use readercount::{analyze_access_logs, init_default_config, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    if args.init {
        return init_default_config();
    }

    validate_args(&args)?;

    match analyze_access_logs(&args) {
        Ok(result) => print_analysis_results(&result, args.json),
        Err(e) => {
            error!(action = "abort", component = "analysis", error = %e, "Analysis failed");
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
