use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dotgov-gatherer",
    about = "Gather .gov domains from public feeds and reconcile them into one report",
    version,
    long_about = None
)]
pub struct Args {
    /// Path to a configuration file (defaults to ./gatherer.toml, then built-in defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip persisting the report to the configured sink
    #[arg(long)]
    pub no_sink: bool,

    /// Also write the report to this local file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the raw CSV report to stdout
    #[arg(long)]
    pub print: bool,

    /// Fetch sources one after another instead of concurrently
    #[arg(long)]
    pub sequential: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Check a domain's homepage for the U.S. Web Design Standards instead of gathering
    #[arg(long, value_name = "DOMAIN")]
    pub check_uswds: Vec<String>,

    /// Initialize gatherer.toml with the default configuration
    #[arg(long)]
    pub init: bool,
}
