use std::collections::HashMap;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde::Serialize;

use crate::error::{DashboardError, Result};

const LABEL_COLUMNS: &'static [&'static str] = &["행정구역", "administrative_area_label"];
const TOTAL_COLUMN: &'static str = "totalPopulation";
const NATIVE_COLUMN: &'static str = "nativeCount";
const FOREIGN_COLUMN: &'static str = "foreignCount";

lazy_static! {
    // `2025년05월_계_0세` or a bare `0세`
    static ref AGE_COLUMN: Regex = Regex::new(r"^(?:(?P<prefix>.*)_계_)?(?P<age>\d+)세$").unwrap();
    static ref SNAPSHOT: Regex = Regex::new(r"(?P<year>\d{4})년\s*(?P<month>\d{1,2})월").unwrap();
}

/// How a column was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnSource {
    /// Matched one of the well-known column names exactly.
    Explicit,
    /// Found by the substring search over the headers.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub index: usize,
    pub name: String,
    pub source: ColumnSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeColumn {
    pub index: usize,
    pub name: String,
    pub age: u32,
}

impl AgeColumn {
    pub fn label(&self) -> String {
        age_label(self.age)
    }
}

pub fn age_label(age: u32) -> String {
    format!("{}세", age)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountColumns {
    pub total: ResolvedColumn,
    pub native: ResolvedColumn,
    pub foreign: ResolvedColumn,
}

/// Where each column the dashboards need lives in the census file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaResolution {
    pub label: ResolvedColumn,
    pub ages: Vec<AgeColumn>,
    /// All three of total/native/foreign, or none of them.
    pub counts: Option<CountColumns>,
    /// Count columns that could not be located when `counts` is `None`.
    pub missing_counts: Vec<String>,
    pub snapshot: Option<NaiveDate>,
    pub available: Vec<String>,
}

impl SchemaResolution {
    pub fn resolve(headers: &[String]) -> Result<Self> {
        let available = headers.to_vec();
        let label = find_explicit(headers, LABEL_COLUMNS).ok_or_else(|| {
            DashboardError::MissingColumns {
                wanted: LABEL_COLUMNS.iter().map(|c| c.to_string()).collect(),
                available: available.clone(),
            }
        })?;

        let ages = find_age_columns(headers)?;
        if ages.is_empty() {
            return Err(DashboardError::NoAgeColumns { available });
        }

        let mut taken: Vec<usize> = ages.iter().map(|a| a.index).collect();
        taken.push(label.index);
        let foreign = find_count(headers, FOREIGN_COLUMN, &taken, |h| {
            h.contains("외국인") && h.contains('계')
        });
        taken.extend(foreign.iter().map(|c| c.index));
        let native = find_count(headers, NATIVE_COLUMN, &taken, |h| {
            h.contains("내국인") && h.contains('계')
        });
        taken.extend(native.iter().map(|c| c.index));
        let total = find_count(headers, TOTAL_COLUMN, &taken, |h| {
            h.contains("총인구") || h.contains("총 계") || h.trim() == "계"
        });

        let mut missing_counts = Vec::new();
        if total.is_none() {
            missing_counts.push(format!("{} (총인구)", TOTAL_COLUMN));
        }
        if native.is_none() {
            missing_counts.push(format!("{} (내국인 계)", NATIVE_COLUMN));
        }
        if foreign.is_none() {
            missing_counts.push(format!("{} (외국인 계)", FOREIGN_COLUMN));
        }
        let counts = match (total, native, foreign) {
            (Some(total), Some(native), Some(foreign)) => Some(CountColumns {
                total,
                native,
                foreign,
            }),
            _ => None,
        };

        let snapshot = ages.iter().find_map(|a| snapshot_month(&a.name));

        info!(
            "schema: label `{}`, {} age columns, counts {}, snapshot {:?}",
            label.name,
            ages.len(),
            if counts.is_some() { "present" } else { "absent" },
            snapshot
        );
        Ok(SchemaResolution {
            label,
            ages,
            counts,
            missing_counts,
            snapshot,
            available,
        })
    }

    /// The total/native/foreign columns, or the "required columns not found"
    /// error naming what is missing and what the file actually has.
    pub fn require_counts(&self) -> Result<&CountColumns> {
        self.counts
            .as_ref()
            .ok_or_else(|| DashboardError::MissingColumns {
                wanted: self.missing_counts.clone(),
                available: self.available.clone(),
            })
    }

    pub fn age_column_names(&self) -> Vec<&str> {
        self.ages.iter().map(|a| a.name.as_str()).collect()
    }
}

fn find_explicit(headers: &[String], names: &[&str]) -> Option<ResolvedColumn> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.as_str() == *name)
            .map(|index| ResolvedColumn {
                index,
                name: headers[index].clone(),
                source: ColumnSource::Explicit,
            })
    })
}

fn find_count<P>(headers: &[String], explicit: &str, taken: &[usize], fallback: P) -> Option<ResolvedColumn>
where
    P: Fn(&str) -> bool,
{
    if let Some(column) = find_explicit(headers, &[explicit]) {
        return Some(column);
    }
    let index = headers
        .iter()
        .enumerate()
        .position(|(i, h)| !taken.contains(&i) && fallback(h.as_str()))?;
    debug!("`{}` resolved by search to `{}`", explicit, headers[index]);
    Some(ResolvedColumn {
        index,
        name: headers[index].clone(),
        source: ColumnSource::Fallback,
    })
}

fn find_age_columns(headers: &[String]) -> Result<Vec<AgeColumn>> {
    let mut seen: HashMap<u32, usize> = HashMap::new();
    let mut ages = Vec::new();
    for (index, header) in headers.iter().enumerate() {
        let Some(age) = parse_age(header) else {
            continue;
        };
        if let Some(&first) = seen.get(&age) {
            return Err(DashboardError::DuplicateAge {
                age,
                first: headers[first].clone(),
                second: header.clone(),
            });
        }
        seen.insert(age, index);
        ages.push(AgeColumn {
            index,
            name: header.clone(),
            age,
        });
    }
    Ok(ages)
}

/// The single-year age embedded in an age-bucket column name.
pub fn parse_age(header: &str) -> Option<u32> {
    AGE_COLUMN
        .captures(header.trim())
        .and_then(|caps| caps["age"].parse().ok())
}

/// The month a column such as `2025년05월_계_0세` was counted in.
pub fn snapshot_month(header: &str) -> Option<NaiveDate> {
    let caps = SNAPSHOT.captures(header)?;
    let year = caps["year"].parse().ok()?;
    let month = caps["month"].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn age_is_the_number_before_the_unit() {
        assert_eq!(parse_age("2025년05월_계_0세"), Some(0));
        assert_eq!(parse_age("2024년_계_37세"), Some(37));
        assert_eq!(parse_age("99세"), Some(99));
        assert_eq!(parse_age("2025년05월_계_100세 이상"), None);
        assert_eq!(parse_age("2025년05월_남_3세"), None);
        assert_eq!(parse_age("2025년05월_계_총인구수"), None);
    }

    #[test]
    fn snapshot_from_column_prefix() {
        assert_eq!(
            snapshot_month("2025년05월_계_0세"),
            NaiveDate::from_ymd_opt(2025, 5, 1)
        );
        assert_eq!(snapshot_month("0세"), None);
        assert_eq!(snapshot_month("2025년13월_계_0세"), None);
    }

    #[test]
    fn resolves_monthly_report_headers_by_search() {
        let schema = SchemaResolution::resolve(&headers(&[
            "행정구역",
            "2025년05월_계_총인구수",
            "2025년05월_계_연령구간인구수",
            "2025년05월_계_0세",
            "2025년05월_계_1세",
            "2025년05월_내국인 계",
            "2025년05월_외국인 계",
        ]))
        .unwrap();
        assert_eq!(schema.label.index, 0);
        assert_eq!(schema.age_column_names(), vec!["2025년05월_계_0세", "2025년05월_계_1세"]);
        let counts = schema.require_counts().unwrap();
        assert_eq!(counts.total.name, "2025년05월_계_총인구수");
        assert_eq!(counts.native.name, "2025년05월_내국인 계");
        assert_eq!(counts.foreign.name, "2025년05월_외국인 계");
        assert_eq!(counts.foreign.source, ColumnSource::Fallback);
        assert_eq!(schema.snapshot, NaiveDate::from_ymd_opt(2025, 5, 1));
    }

    #[test]
    fn explicit_names_win_over_search() {
        let schema = SchemaResolution::resolve(&headers(&[
            "administrative_area_label",
            "0세",
            "외국인 계",
            "foreignCount",
            "nativeCount",
            "totalPopulation",
        ]))
        .unwrap();
        let counts = schema.require_counts().unwrap();
        assert_eq!(counts.foreign.index, 3);
        assert_eq!(counts.foreign.source, ColumnSource::Explicit);
        assert_eq!(counts.total.index, 5);
    }

    #[test]
    fn missing_counts_list_available_columns() {
        let schema =
            SchemaResolution::resolve(&headers(&["행정구역", "2025년05월_계_0세", "2025년05월_계_총인구수"]))
                .unwrap();
        assert!(schema.counts.is_none());
        match schema.require_counts().unwrap_err() {
            DashboardError::MissingColumns { wanted, available } => {
                assert_eq!(wanted.len(), 2);
                assert!(wanted[0].starts_with("nativeCount"));
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn label_column_is_required() {
        let err = SchemaResolution::resolve(&headers(&["지역", "0세"])).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumns { .. }));
    }

    #[test]
    fn duplicate_ages_are_rejected() {
        let err = SchemaResolution::resolve(&headers(&["행정구역", "2024년_계_5세", "5세"])).unwrap_err();
        assert!(matches!(err, DashboardError::DuplicateAge { age: 5, .. }));
    }

    #[test]
    fn no_age_columns() {
        let err = SchemaResolution::resolve(&headers(&["행정구역", "총인구"])).unwrap_err();
        assert!(matches!(err, DashboardError::NoAgeColumns { .. }));
    }
}
