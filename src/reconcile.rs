use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

use crate::domain::{base_domain, DomainRecord};
use crate::sources::SourceLists;

/// Deduplicated union of every source list, in sorted order.
pub fn master_set(lists: &SourceLists) -> Vec<&str> {
    let unique: HashSet<&str> = lists
        .iter()
        .flat_map(|list| list.domains.iter().map(String::as_str))
        .collect();

    let mut domains: Vec<&str> = unique.into_iter().collect();
    domains.sort_unstable();
    domains
}

/// One record per domain in the master set, flagged with per-source
/// membership.
pub fn reconcile(lists: &SourceLists) -> Vec<DomainRecord> {
    let start_time = Instant::now();
    info!(action = "start", component = "reconciliation", "Starting reconciliation");

    let eot2016 = membership(&lists.eot2016.domains);
    let dap = membership(&lists.dap.domains);
    let parents = membership(&lists.parents.domains);
    let censys = membership(&lists.censys.domains);

    let domains = master_set(lists);
    let records: Vec<DomainRecord> = domains
        .par_iter()
        .map(|&domain| DomainRecord {
            domain: domain.to_string(),
            base_domain: base_domain(domain),
            in_eot2016: eot2016.contains(domain),
            in_dap: dap.contains(domain),
            in_parents: parents.contains(domain),
            in_censys: censys.contains(domain),
        })
        .collect();

    info!(
        action = "complete",
        component = "reconciliation",
        domain_count = records.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Reconciliation completed"
    );
    records
}

fn membership(domains: &[String]) -> HashSet<&str> {
    domains.iter().map(String::as_str).collect()
}
