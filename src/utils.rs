use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if let Some(days) = args.days {
        if days == 0 {
            anyhow::bail!("--days must be greater than 0");
        }
    }

    if let Some(regular_days) = args.regular_days {
        if regular_days == 0 {
            anyhow::bail!("--regular-days must be greater than 0");
        }
    }

    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be greater than 0");
        }
    }

    Ok(())
}
