use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use thiserror::Error;
use time::OffsetDateTime;
use wattlab_client::domain::{ApplianceId, ConsumptionSample, ConsumptionSeries};
use wattlab_client::AnalyticsError;

#[derive(Debug, Error)]
pub enum CsvIngestError {
    #[error("failed to open CSV file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}' in CSV header")]
    MissingColumn(&'static str),

    #[error("line {line}: invalid {column} '{value}': {reason}")]
    InvalidField {
        line: u64,
        column: &'static str,
        value: String,
        reason: String,
    },

    #[error("readings for {appliance_id}: {source}")]
    Series {
        appliance_id: ApplianceId,
        #[source]
        source: AnalyticsError,
    },
}

/// Column positions resolved once from the header row.
struct Columns {
    ts: usize,
    kwh: usize,
    appliance_id: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, CsvIngestError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Ok(Self {
            ts: find("ts").ok_or(CsvIngestError::MissingColumn("ts"))?,
            kwh: find("kwh").ok_or(CsvIngestError::MissingColumn("kwh"))?,
            appliance_id: find("appliance_id"),
        })
    }
}

fn parse_record(
    record: &StringRecord,
    columns: &Columns,
    default_id: &ApplianceId,
) -> Result<(ApplianceId, ConsumptionSample), CsvIngestError> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let field = |idx: usize| record.get(idx).unwrap_or("").trim();
    let invalid = |column, value: &str, reason: String| CsvIngestError::InvalidField {
        line,
        column,
        value: value.to_string(),
        reason,
    };

    let ts_str = field(columns.ts);
    let ts = OffsetDateTime::parse(ts_str, &time::format_description::well_known::Rfc3339)
        .map_err(|e| invalid("ts", ts_str, e.to_string()))?;

    let kwh_str = field(columns.kwh);
    let kwh: f64 = kwh_str
        .parse()
        .map_err(|e: std::num::ParseFloatError| invalid("kwh", kwh_str, e.to_string()))?;

    let appliance_id = match columns.appliance_id.map(field) {
        Some(id) if !id.is_empty() => ApplianceId::new(id),
        _ => default_id.clone(),
    };

    Ok((appliance_id, ConsumptionSample::new(ts, kwh)))
}

/// Read `ts,kwh[,appliance_id]` rows into one series per appliance.
///
/// Rows may appear in any order. Rows without an appliance id are
/// attributed to `default_id`.
pub fn read_series<R: Read>(
    reader: R,
    default_id: &ApplianceId,
) -> Result<BTreeMap<ApplianceId, ConsumptionSeries>, CsvIngestError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns = Columns::from_headers(rdr.headers()?)?;

    let mut grouped: BTreeMap<ApplianceId, Vec<ConsumptionSample>> = BTreeMap::new();
    for result in rdr.records() {
        let record = result?;
        let (appliance_id, sample) = match parse_record(&record, &columns, default_id) {
            Ok(parsed) => parsed,
            Err(e) => {
                metrics::counter!("consumption_csv_parse_errors_total").increment(1);
                return Err(e);
            }
        };
        grouped.entry(appliance_id).or_default().push(sample);
    }

    grouped
        .into_iter()
        .map(|(appliance_id, mut samples)| {
            samples.sort_by_key(|s| s.timestamp);
            match ConsumptionSeries::new(samples) {
                Ok(series) => Ok((appliance_id, series)),
                Err(source) => Err(CsvIngestError::Series {
                    appliance_id,
                    source,
                }),
            }
        })
        .collect()
}

/// [`read_series`] on a file; the file stem is the default appliance id.
pub fn read_series_file(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<ApplianceId, ConsumptionSeries>, CsvIngestError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| CsvIngestError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let default_id = ApplianceId::new(
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "appliance".to_string()),
    );
    read_series(file, &default_id)
}
