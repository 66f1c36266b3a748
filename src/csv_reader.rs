use std::fs;
use std::path::Path;

use csv::StringRecord;
use encoding_rs::Encoding;
use log::{debug, warn};

use crate::error::{DashboardError, Result};

/// The census file as read from disk: header names and untyped rows.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

/// Reads `path`, decoding it from the legacy encoding named by `label`
/// (a WHATWG label such as `windows-949` or `utf-8`).
pub fn read_data(path: &Path, label: &str) -> Result<RawTable> {
    let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        DashboardError::UnknownEncoding {
            label: label.to_string(),
        }
    })?;
    let bytes = fs::read(path)?;
    let (text, actual, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(DashboardError::Decode {
            path: path.to_path_buf(),
            encoding: actual.name(),
        });
    }
    if actual != encoding {
        warn!("{} carries a {} byte order mark, decoding as such", path.display(), actual.name());
    }
    debug!("decoded {} bytes of {} text from {}", bytes.len(), actual.name(), path.display());
    parse_records(&text)
}

pub fn parse_records(text: &str) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());
    let headers = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut records = Vec::<StringRecord>::new();
    for result in rdr.records() {
        records.push(result?);
    }
    Ok(RawTable { headers, records })
}
