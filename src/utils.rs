use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise `info` with `--verbose`, `error`
/// without.
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

pub fn format_number(num: usize) -> String {
    num.to_string()
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be greater than 0");
        }
    }

    if args.init && !args.check_uswds.is_empty() {
        anyhow::bail!("--init cannot be combined with --check-uswds");
    }

    if let Some(domain) = args.check_uswds.iter().find(|d| d.trim().is_empty()) {
        anyhow::bail!("--check-uswds needs a domain, got {:?}", domain);
    }

    Ok(())
}

pub fn worker_count(requested: Option<usize>) -> usize {
    requested.unwrap_or_else(|| std::cmp::min(num_cpus::get(), 8))
}
