use std::collections::HashSet;
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{FetchCause, FetchError};

/// The four upstream feeds of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Eot2016,
    Dap,
    Parents,
    Censys,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Eot2016, Source::Dap, Source::Parents, Source::Censys];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Eot2016 => "eot2016",
            Source::Dap => "dap",
            Source::Parents => "parents",
            Source::Censys => "censys",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceList {
    pub source: Source,
    pub domains: Vec<String>,
}

impl SourceList {
    pub fn new(source: Source, domains: Vec<String>) -> Self {
        Self { source, domains }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// One list per source, fetched fresh for every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLists {
    pub eot2016: SourceList,
    pub dap: SourceList,
    pub parents: SourceList,
    pub censys: SourceList,
}

impl SourceLists {
    pub fn from_domains<S: Into<String>>(
        eot2016: impl IntoIterator<Item = S>,
        dap: impl IntoIterator<Item = S>,
        parents: impl IntoIterator<Item = S>,
        censys: impl IntoIterator<Item = S>,
    ) -> Self {
        let list = |source, domains: Vec<String>| SourceList::new(source, domains);
        Self {
            eot2016: list(Source::Eot2016, eot2016.into_iter().map(Into::into).collect()),
            dap: list(Source::Dap, dap.into_iter().map(Into::into).collect()),
            parents: list(Source::Parents, parents.into_iter().map(Into::into).collect()),
            censys: list(Source::Censys, censys.into_iter().map(Into::into).collect()),
        }
    }

    pub fn get(&self, source: Source) -> &SourceList {
        match source {
            Source::Eot2016 => &self.eot2016,
            Source::Dap => &self.dap,
            Source::Parents => &self.parents,
            Source::Censys => &self.censys,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceList> {
        Source::ALL.into_iter().map(move |source| self.get(source))
    }
}

/// Plain-text HTTP GET.
pub trait Transport: Sync {
    fn get_text(&self, url: &str) -> Result<String, FetchCause>;
}

/// Network reconnaissance lookup (certificate search and the like).
pub trait ReconService: Sync {
    fn search(&self, query: &str) -> Result<Vec<String>, FetchCause>;
}

/// Split a body on `'\n'`, keeping every token.
///
/// Header lines, `'\r'` and the empty token after a trailing newline all
/// survive.
pub fn split_lines(body: &str) -> Vec<String> {
    body.split('\n').map(str::to_string).collect()
}

/// Values of `column_name` from a CSV body with a header row.
pub fn csv_column(body: &str, column_name: &str) -> Result<Vec<String>, FetchCause> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FetchCause::Csv(e.to_string()))?;
    let index = headers
        .iter()
        .position(|h| h == column_name)
        .ok_or_else(|| FetchCause::MissingColumn(column_name.to_string()))?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FetchCause::Csv(e.to_string()))?;
        values.push(record.get(index).unwrap_or_default().to_string());
    }
    Ok(values)
}

/// Dedupe in first-seen order and keep entries containing `query`.
pub fn filter_recon_results(results: Vec<String>, query: &str) -> Vec<String> {
    let mut seen = HashSet::with_capacity(results.len());
    results
        .into_iter()
        .filter(|name| name.contains(query))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

pub fn fetch_line_delimited(
    transport: &dyn Transport,
    source: Source,
    url: &str,
) -> Result<SourceList, FetchError> {
    let start_time = Instant::now();
    info!(action = "start", component = "source_fetch", source = source.as_str(), url = url, "Fetching line-delimited feed");

    let body = transport
        .get_text(url)
        .map_err(|cause| FetchError::new(source, cause))?;
    let domains = split_lines(&body);

    info!(
        action = "complete",
        component = "source_fetch",
        source = source.as_str(),
        domain_count = domains.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Fetched line-delimited feed"
    );
    Ok(SourceList::new(source, domains))
}

pub fn fetch_csv_column(
    transport: &dyn Transport,
    source: Source,
    url: &str,
    column_name: &str,
) -> Result<SourceList, FetchError> {
    let start_time = Instant::now();
    info!(action = "start", component = "source_fetch", source = source.as_str(), url = url, column = column_name, "Fetching CSV feed");

    let body = transport
        .get_text(url)
        .map_err(|cause| FetchError::new(source, cause))?;
    let domains = csv_column(&body, column_name).map_err(|cause| FetchError::new(source, cause))?;

    info!(
        action = "complete",
        component = "source_fetch",
        source = source.as_str(),
        domain_count = domains.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Fetched CSV feed"
    );
    Ok(SourceList::new(source, domains))
}

pub fn fetch_network_recon(recon: &dyn ReconService, query: &str) -> Result<SourceList, FetchError> {
    let start_time = Instant::now();
    info!(action = "start", component = "source_fetch", source = "censys", query = query, "Running network reconnaissance query");

    let results = recon
        .search(query)
        .map_err(|cause| FetchError::new(Source::Censys, cause))?;
    let raw_count = results.len();
    let domains = filter_recon_results(results, query);

    info!(
        action = "complete",
        component = "source_fetch",
        source = "censys",
        raw_count,
        domain_count = domains.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Network reconnaissance query completed"
    );
    Ok(SourceList::new(Source::Censys, domains))
}

/// Fetch every source. The first failure fails the whole call.
pub fn fetch_all(
    config: &Config,
    transport: &dyn Transport,
    recon: &dyn ReconService,
    parallel: bool,
) -> Result<SourceLists, FetchError> {
    let start_time = Instant::now();
    let sources = &config.sources;

    let eot2016 = || fetch_line_delimited(transport, Source::Eot2016, &sources.eot2016);
    let dap = || fetch_line_delimited(transport, Source::Dap, &sources.dap);
    let parents =
        || fetch_csv_column(transport, Source::Parents, &sources.parents, &sources.parents_column);
    let censys = || fetch_network_recon(recon, &config.censys.query);

    let result = if parallel {
        let ((eot2016, dap), (parents, censys)) =
            rayon::join(|| rayon::join(eot2016, dap), || rayon::join(parents, censys));
        assemble(eot2016, dap, parents, censys)
    } else {
        fetch_sequential(eot2016, dap, parents, censys)
    };

    match &result {
        Ok(lists) => info!(
            action = "complete",
            component = "source_fetch",
            parallel,
            eot2016 = lists.eot2016.len(),
            dap = lists.dap.len(),
            parents = lists.parents.len(),
            censys = lists.censys.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "All sources fetched"
        ),
        Err(e) => warn!(action = "abort", component = "source_fetch", source = e.feed.as_str(), error = %e, "Source fetch failed, aborting run"),
    }

    result
}

// Failures are reported in source order so the error is stable across runs.
fn assemble(
    eot2016: Result<SourceList, FetchError>,
    dap: Result<SourceList, FetchError>,
    parents: Result<SourceList, FetchError>,
    censys: Result<SourceList, FetchError>,
) -> Result<SourceLists, FetchError> {
    Ok(SourceLists {
        eot2016: eot2016?,
        dap: dap?,
        parents: parents?,
        censys: censys?,
    })
}

fn fetch_sequential(
    eot2016: impl FnOnce() -> Result<SourceList, FetchError>,
    dap: impl FnOnce() -> Result<SourceList, FetchError>,
    parents: impl FnOnce() -> Result<SourceList, FetchError>,
    censys: impl FnOnce() -> Result<SourceList, FetchError>,
) -> Result<SourceLists, FetchError> {
    let censys = censys()?;
    Ok(SourceLists {
        eot2016: eot2016()?,
        dap: dap()?,
        parents: parents()?,
        censys,
    })
}
