use std::collections::BTreeSet;
use std::path::Path;

use csv::StringRecord;
use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use serde::Serialize;

use crate::csv_reader::{read_data, RawTable};
use crate::error::{DashboardError, Result};
use crate::schema::{AgeColumn, SchemaResolution};

lazy_static! {
    // plain digits, or digits grouped in threes by commas
    static ref COUNT: Regex = Regex::new(r"^(?:\d+|\d{1,3}(?:,\d{3})+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopulationCounts {
    pub total: u64,
    pub native: u64,
    pub foreign: u64,
}

/// One administrative area row of the census file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CensusRecord {
    pub label: String,
    pub region: String,
    /// Counts in the order of `SchemaResolution::ages`.
    pub ages: Vec<u64>,
    pub counts: Option<PopulationCounts>,
}

impl CensusRecord {
    pub fn age_total(&self) -> u64 {
        self.ages.iter().sum()
    }
}

/// The census snapshot, loaded once and shared read-only by every view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CensusTable {
    pub schema: SchemaResolution,
    pub records: Vec<CensusRecord>,
}

impl CensusTable {
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let schema = SchemaResolution::resolve(&raw.headers)?;
        let records = raw
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| to_census_record(&schema, &raw.headers, i, record))
            .collect::<Result<Vec<_>>>()?;
        Ok(CensusTable { schema, records })
    }

    pub fn age_columns(&self) -> &[AgeColumn] {
        &self.schema.ages
    }

    /// Sorted, unique region names.
    pub fn regions(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.region.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Loads the census file at `path` and the names of its age columns.
pub fn load(path: &Path, encoding: &str) -> Result<(CensusTable, Vec<String>)> {
    let raw = read_data(path, encoding)?;
    let table = CensusTable::from_raw(&raw)?;
    let age_columns = table.age_columns().iter().map(|a| a.name.clone()).collect();
    info!(
        "loaded {} rows covering {} regions from {}",
        table.records.len(),
        table.regions().len(),
        path.display()
    );
    Ok((table, age_columns))
}

/// `서울특별시 종로구(1111000000)` becomes `서울특별시 종로구`.
pub fn derive_region(label: &str) -> String {
    label.split('(').next().unwrap_or_default().trim().to_string()
}

/// Parses a count written with thousands separators, e.g. `1,234,567`.
/// Misplaced separators and signs are rejected.
pub fn parse_count(value: &str) -> Option<u64> {
    let value = value.trim();
    if !COUNT.is_match(value) {
        return None;
    }
    value.replace(',', "").parse().ok()
}

fn to_census_record(
    schema: &SchemaResolution,
    headers: &[String],
    i: usize,
    record: &StringRecord,
) -> Result<CensusRecord> {
    // header is line 1
    let row = record.position().map(|p| p.line() as usize).unwrap_or(i + 2);
    let field = |index: usize| -> Result<u64> {
        let value = record.get(index).unwrap_or_default();
        parse_count(value).ok_or_else(|| DashboardError::ParseCount {
            row,
            column: headers[index].clone(),
            value: value.to_string(),
        })
    };

    let label = record.get(schema.label.index).unwrap_or_default().to_string();
    let ages = schema
        .ages
        .iter()
        .map(|a| field(a.index))
        .collect::<Result<Vec<_>>>()?;
    let counts = match &schema.counts {
        Some(columns) => Some(PopulationCounts {
            total: field(columns.total.index)?,
            native: field(columns.native.index)?,
            foreign: field(columns.foreign.index)?,
        }),
        None => None,
    };
    Ok(CensusRecord {
        region: derive_region(&label),
        label,
        ages,
        counts,
    })
}
