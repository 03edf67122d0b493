use anyhow::{Context, Result};
use clap::Parser;
use dotgov_gatherer::censys::CensysClient;
use dotgov_gatherer::http::HttpTransport;
use dotgov_gatherer::sink::{build_sink, ReportSink};
use dotgov_gatherer::summary::print_run_summary;
use dotgov_gatherer::utils::{setup_logging, validate_args, worker_count};
use dotgov_gatherer::uswds::check_uswds;
use dotgov_gatherer::{init_default_config, Args, Config, Pipeline};
use tracing::{error, info};

fn check_domains(config: &Config, domains: &[String]) -> Result<bool> {
    let transport = HttpTransport::new(&config.fetch).context("Failed to build HTTP client")?;
    let mut all_ok = true;

    for domain in domains {
        match check_uswds(&transport, domain) {
            Ok(result) => println!("{}", serde_json::to_string(&result)?),
            Err(e) => {
                error!(action = "failed", component = "uswds_check", domain = domain.as_str(), error = %e, "Check failed");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

fn gather(args: &Args, config: &Config) -> Result<bool> {
    let workers = worker_count(args.workers);
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
        .context("Failed to configure worker pool")?;
    info!(action = "configure", component = "pipeline", worker_count = workers, "Using workers for reconciliation");

    let transport = HttpTransport::new(&config.fetch).context("Failed to build HTTP client")?;
    let recon = CensysClient::new(transport.clone(), &config.censys);

    let mut sink_error = None;
    let sink: Option<Box<dyn ReportSink>> = match (&config.sink, args.no_sink) {
        (Some(sink_config), false) => match build_sink(sink_config, &config.fetch) {
            Ok(sink) => Some(sink),
            Err(e) => {
                error!(action = "configure", component = "persist", error = %e, "Sink unavailable, report will not be persisted");
                sink_error = Some(e);
                None
            }
        },
        _ => None,
    };

    let mut pipeline = Pipeline::new(config, &transport, &recon).parallel(!args.sequential);
    if let Some(sink) = sink.as_deref() {
        pipeline = pipeline.with_sink(sink);
    }

    let mut report = pipeline.run().context("Gatherer run failed")?;
    if let Some(e) = sink_error {
        report.persisted = Some(Err(e));
    }

    if let Some(path) = &args.output {
        report.write_local_copy(path);
    }

    if args.print {
        print!("{}", report.csv);
        println!("{}", report.status());
    } else {
        print_run_summary(&report);
    }

    Ok(report.status() == "success")
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);
    validate_args(&args)?;

    if args.init {
        return init_default_config();
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    let outcome = if args.check_uswds.is_empty() {
        gather(&args, &config)
    } else {
        check_domains(&config, &args.check_uswds)
    };

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(2),
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
