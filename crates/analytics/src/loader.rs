//! Delimited-file loader for raw visit records.
//! Expected columns: `user_id,timestamp,group,landing_page,converted`.

use chrono::NaiveDateTime;
use readout_core::config::InputConfig;
use readout_core::{GroupName, LandingPage, ReadoutError, ReadoutResult, VisitRecord};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// One row as it appears in the file, before label and timestamp parsing.
#[derive(Debug, Deserialize)]
struct RawRow {
    user_id: u64,
    timestamp: String,
    group: String,
    landing_page: String,
    converted: String,
}

/// Loads visit records from CSV-like sources.
pub struct RecordLoader {
    delimiter: u8,
    has_headers: bool,
    timestamp_format: String,
}

impl RecordLoader {
    pub fn new(config: &InputConfig) -> ReadoutResult<Self> {
        let delimiter = match config.delimiter.as_bytes() {
            [b] => *b,
            _ => {
                return Err(ReadoutError::Configuration(format!(
                    "input delimiter must be a single byte, got '{}'",
                    config.delimiter
                )))
            }
        };
        Ok(Self {
            delimiter,
            has_headers: config.has_headers,
            timestamp_format: config.timestamp_format.clone(),
        })
    }

    pub fn load_path(&self, path: &Path) -> ReadoutResult<Vec<VisitRecord>> {
        info!(path = %path.display(), "Loading visit records");
        let file = File::open(path)?;
        self.load_reader(file)
    }

    /// Parse every row from `reader`. The first malformed row fails the load.
    pub fn load_reader<R: Read>(&self, reader: R) -> ReadoutResult<Vec<VisitRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = if self.has_headers {
            Some(csv_reader.headers().map_err(ingest_error)?.clone())
        } else {
            None
        };

        let mut records = Vec::new();
        let mut row = csv::StringRecord::new();
        while csv_reader.read_record(&mut row).map_err(ingest_error)? {
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let raw: RawRow = row.deserialize(headers.as_ref()).map_err(|e| {
                metrics::counter!("readout.ingest.rejected").increment(1);
                ReadoutError::Ingest {
                    line,
                    message: e.to_string(),
                }
            })?;
            match self.parse_row(raw) {
                Ok(record) => records.push(record),
                Err(message) => {
                    metrics::counter!("readout.ingest.rejected").increment(1);
                    warn!(line, %message, "Rejected malformed visit row");
                    return Err(ReadoutError::Ingest { line, message });
                }
            }
        }

        metrics::counter!("readout.ingest.rows").increment(records.len() as u64);
        info!(rows = records.len(), "Visit records loaded");
        Ok(records)
    }

    fn parse_row(&self, raw: RawRow) -> Result<VisitRecord, String> {
        let timestamp = NaiveDateTime::parse_from_str(&raw.timestamp, &self.timestamp_format)
            .map_err(|e| format!("invalid timestamp '{}': {}", raw.timestamp, e))?;
        let group_name = GroupName::parse(&raw.group)
            .ok_or_else(|| format!("unknown group '{}'", raw.group))?;
        let landing_page = LandingPage::parse(&raw.landing_page)
            .ok_or_else(|| format!("unknown landing page '{}'", raw.landing_page))?;
        let converted = parse_flag(&raw.converted)
            .ok_or_else(|| format!("invalid converted flag '{}'", raw.converted))?;

        debug!(user_id = raw.user_id, %group_name, %landing_page, "Parsed visit row");
        Ok(VisitRecord {
            user_id: raw.user_id,
            timestamp,
            group_name,
            landing_page,
            converted,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn ingest_error(err: csv::Error) -> ReadoutError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    ReadoutError::Ingest {
        line,
        message: err.to_string(),
    }
}
