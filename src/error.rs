use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("error reading the census file: {0}")]
    Io(#[from] io::Error),
    #[error("error parsing the census file: {0}")]
    Csv(#[from] csv::Error),
    #[error("unknown text encoding `{label}`")]
    UnknownEncoding { label: String },
    #[error("{path} is not valid {encoding} text")]
    Decode { path: PathBuf, encoding: &'static str },
    #[error("required columns not found ({}); available columns: {}", wanted.join(", "), available.join(", "))]
    MissingColumns {
        wanted: Vec<String>,
        available: Vec<String>,
    },
    #[error("no age columns found; available columns: {}", available.join(", "))]
    NoAgeColumns { available: Vec<String> },
    #[error("duplicate age {age} in columns `{first}` and `{second}`")]
    DuplicateAge {
        age: u32,
        first: String,
        second: String,
    },
    #[error("row {row}: column `{column}` holds `{value}`, not a population count")]
    ParseCount {
        row: usize,
        column: String,
        value: String,
    },
    #[error("select at least one region")]
    EmptySelection,
    #[error("error writing export: {0}")]
    Export(#[from] serde_json::Error),
}
