use crate::domain::DomainRecord;
use crate::error::ReportError;

pub const COLUMNS: [&str; 6] = ["Domain", "Base Domain", "censys", "dap", "eot2016", "parents"];

fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn parse_flag(row: usize, column: &'static str, value: &str) -> Result<bool, ReportError> {
    match value {
        "True" | "true" => Ok(true),
        "False" | "false" => Ok(false),
        other => Err(ReportError::InvalidFlag {
            row,
            column,
            value: other.to_string(),
        }),
    }
}

/// Serialize records as CSV, with a leading unnamed index column counting
/// rows from 0.
pub fn to_csv(records: &[DomainRecord]) -> Result<String, ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header = vec![""];
    header.extend(COLUMNS);
    writer.write_record(&header)?;

    for (index, record) in records.iter().enumerate() {
        writer.write_record([
            index.to_string().as_str(),
            record.domain.as_str(),
            record.base_domain.as_str(),
            flag(record.in_censys),
            flag(record.in_dap),
            flag(record.in_eot2016),
            flag(record.in_parents),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(csv::Error::from(e.into_error())))?;
    String::from_utf8(bytes).map_err(|_| ReportError::Encoding)
}

/// Parse a report produced by [`to_csv`]. Columns are matched by header
/// name, so their order and any index column do not matter.
pub fn parse_csv(text: &str) -> Result<Vec<DomainRecord>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let position = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(ReportError::MissingColumn(name))
    };
    let [domain, base, censys, dap, eot2016, parents] = [
        position(COLUMNS[0])?,
        position(COLUMNS[1])?,
        position(COLUMNS[2])?,
        position(COLUMNS[3])?,
        position(COLUMNS[4])?,
        position(COLUMNS[5])?,
    ];

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        records.push(DomainRecord {
            domain: field(domain).to_string(),
            base_domain: field(base).to_string(),
            in_censys: parse_flag(row, COLUMNS[2], field(censys))?,
            in_dap: parse_flag(row, COLUMNS[3], field(dap))?,
            in_eot2016: parse_flag(row, COLUMNS[4], field(eot2016))?,
            in_parents: parse_flag(row, COLUMNS[5], field(parents))?,
        });
    }
    Ok(records)
}
