use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::domain::DomainRecord;
use crate::error::{PersistError, PipelineError};
use crate::reconcile::reconcile;
use crate::report::to_csv;
use crate::sink::{persist, FileSink, PersistReceipt, ReportSink};
use crate::sources::{fetch_all, ReconService, Source, Transport};

/// Result of one run. Present whenever every source was fetched, whether or
/// not persisting succeeded.
#[derive(Debug)]
pub struct RunReport {
    pub records: Vec<DomainRecord>,
    pub csv: String,
    pub source_counts: Vec<(Source, usize)>,
    pub persisted: Option<Result<PersistReceipt, PersistError>>,
    /// Outcome of the extra local copy requested with `--output`.
    pub local_copy: Option<Result<PersistReceipt, PersistError>>,
}

impl RunReport {
    /// `"failed"` if the sink write or the local copy failed, `"success"`
    /// otherwise.
    pub fn status(&self) -> &'static str {
        match (&self.persisted, &self.local_copy) {
            (Some(Err(_)), _) | (_, Some(Err(_))) => "failed",
            _ => "success",
        }
    }

    /// Write the CSV to `path` as well. A failure is recorded on the report
    /// rather than returned; the computed report stays valid.
    pub fn write_local_copy(&mut self, path: &Path) -> bool {
        let outcome = persist(&self.csv, &FileSink::new(path.to_path_buf()));
        let written = outcome.is_ok();
        self.local_copy = Some(outcome);
        written
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    transport: &'a dyn Transport,
    recon: &'a dyn ReconService,
    sink: Option<&'a dyn ReportSink>,
    parallel: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, transport: &'a dyn Transport, recon: &'a dyn ReconService) -> Self {
        Self {
            config,
            transport,
            recon,
            sink: None,
            parallel: true,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn ReportSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Fetch, reconcile, serialize, then persist. A fetch failure aborts the
    /// run before anything is written.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let start_time = Instant::now();
        info!(action = "start", component = "pipeline", parallel = self.parallel, "Starting gatherer run");

        let lists = fetch_all(self.config, self.transport, self.recon, self.parallel)?;
        let source_counts = lists.iter().map(|list| (list.source, list.len())).collect();

        let records = reconcile(&lists);
        drop(lists);

        let csv = to_csv(&records)?;
        let persisted = self.sink.map(|sink| persist(&csv, sink));

        let report = RunReport {
            records,
            csv,
            source_counts,
            persisted,
            local_copy: None,
        };

        info!(
            action = "complete",
            component = "pipeline",
            domain_count = report.records.len(),
            status = report.status(),
            duration_ms = start_time.elapsed().as_millis(),
            "Gatherer run completed"
        );
        Ok(report)
    }
}
