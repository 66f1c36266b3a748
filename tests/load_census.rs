use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use popdash::census::load;
use popdash::error::DashboardError;
use popdash::shaper::{rank_ages_by_region, rank_foreign_ratio, shape_age_distribution, top_n};
use tempfile::TempDir;

const MONTHLY_REPORT: &str = "\
행정구역,2025년05월_계_총인구수,2025년05월_계_0세,2025년05월_계_1세,2025년05월_내국인 계,2025년05월_외국인 계
\"서울특별시  (1100000000)\",\"10,000\",100,90,\"9,500\",500
\"서울특별시 종로구(1111000000)\",\"1,000\",10,9,950,50
\"부산광역시  (2600000000)\",\"8,000\",80,95,\"7,900\",100
";

fn write_cp949(dir: &TempDir, text: &str) -> PathBuf {
    let (bytes, _, had_errors) = encoding_rs::EUC_KR.encode(text);
    assert!(!had_errors);
    let path = dir.path().join("census.csv");
    fs::write(&path, &bytes).unwrap();
    path
}

#[test]
fn loads_legacy_encoded_monthly_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cp949(&dir, MONTHLY_REPORT);

    let (table, age_columns) = load(&path, "windows-949").unwrap();
    assert_eq!(age_columns, vec!["2025년05월_계_0세", "2025년05월_계_1세"]);
    assert_eq!(table.regions(), vec!["부산광역시", "서울특별시", "서울특별시 종로구"]);
    assert_eq!(table.schema.snapshot, NaiveDate::from_ymd_opt(2025, 5, 1));

    let selected = vec!["서울특별시".to_string(), "부산광역시".to_string()];
    let dist = shape_age_distribution(&table, &selected).unwrap();
    assert_eq!(dist.rows[0].label, "0세");
    assert_eq!(dist.rows[0].counts, vec![100, 80]);

    let foreign = top_n(rank_foreign_ratio(&table).unwrap(), 10);
    let names: Vec<&str> = foreign.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(names, vec!["서울특별시", "서울특별시 종로구", "부산광역시"]);
    assert_eq!(foreign[0].foreign_percent, 5.0);
    assert_eq!(foreign[2].foreign_percent, 1.25);

    let leaders = rank_ages_by_region(&table);
    assert_eq!(leaders[0].region, "서울특별시");
    assert_eq!(leaders[1].region, "부산광역시");
}

#[test]
fn report_without_foreign_counts_still_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cp949(
        &dir,
        "행정구역,2025년05월_계_총인구수,2025년05월_계_0세\n\"서울특별시  (1100000000)\",\"9,386,034\",\"41,234\"\n",
    );
    let (table, _) = load(&path, "windows-949").unwrap();
    assert_eq!(table.records[0].ages, vec![41234]);
    match rank_foreign_ratio(&table).unwrap_err() {
        DashboardError::MissingColumns { available, .. } => {
            assert_eq!(available[0], "행정구역");
            assert_eq!(available.len(), 3);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn wrong_encoding_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_cp949(&dir, MONTHLY_REPORT);
    let err = load(&path, "utf-8").unwrap_err();
    assert!(matches!(err, DashboardError::Decode { .. }));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(&dir.path().join("nope.csv"), "windows-949").unwrap_err();
    assert!(matches!(err, DashboardError::Io(_)));
}
