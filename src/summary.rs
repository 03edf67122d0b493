use crate::pipeline::RunReport;
use crate::utils::format_number;

pub fn print_run_summary(report: &RunReport) {
    println!("\n--- .gov Domain Gathering ---");

    for (source, count) in &report.source_counts {
        println!("{:<8} {:>10} entries", source.as_str(), format_number(*count));
    }

    println!(
        "Total unique domains found: {}",
        format_number(report.records.len())
    );

    let base_domains: std::collections::HashSet<&str> = report
        .records
        .iter()
        .map(|r| r.base_domain.as_str())
        .collect();
    println!("Distinct base domains: {}", format_number(base_domains.len()));

    let in_every_source = report
        .records
        .iter()
        .filter(|r| r.in_eot2016 && r.in_dap && r.in_parents && r.in_censys)
        .count();
    println!("Present in every source: {}", format_number(in_every_source));

    match &report.local_copy {
        Some(Ok(receipt)) => println!("Local copy written to {}", receipt.location),
        Some(Err(e)) => println!("{}", e),
        None => {}
    }

    match &report.persisted {
        Some(Ok(receipt)) => match &receipt.revision {
            Some(revision) => println!(
                "Persisted to {} ({}): {}",
                receipt.location, revision, report.status()
            ),
            None => println!("Persisted to {}: {}", receipt.location, report.status()),
        },
        Some(Err(e)) => println!("{}: {}", e, report.status()),
        None => println!("Report not persisted: {}", report.status()),
    }
}
