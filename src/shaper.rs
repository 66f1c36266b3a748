use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::census::CensusTable;
use crate::error::{DashboardError, Result};
use crate::schema::age_label;

/// Population count per age for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeSeries {
    pub region: String,
    pub points: Vec<(u32, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeRow {
    pub age: u32,
    pub label: String,
    /// One count per region of the owning `AgeDistribution`.
    pub counts: Vec<u64>,
}

/// Selected regions' age buckets, transposed so each row is one age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeDistribution {
    pub regions: Vec<String>,
    pub rows: Vec<AgeRow>,
}

impl AgeDistribution {
    pub fn series(&self, region: &str) -> Option<AgeSeries> {
        let column = self.regions.iter().position(|r| r == region)?;
        Some(AgeSeries {
            region: region.to_string(),
            points: self.rows.iter().map(|row| (row.age, row.counts[column])).collect(),
        })
    }

    pub fn all_series(&self) -> Vec<AgeSeries> {
        self.regions.iter().filter_map(|r| self.series(r)).collect()
    }

    pub fn max_count(&self) -> u64 {
        self.rows
            .iter()
            .flat_map(|row| row.counts.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

/// Sums every age bucket per selected region. Rows sharing a region (a city
/// and its sub-districts) are added together.
pub fn shape_age_distribution(table: &CensusTable, selected: &[String]) -> Result<AgeDistribution> {
    if selected.is_empty() {
        return Err(DashboardError::EmptySelection);
    }
    let mut regions: Vec<String> = Vec::new();
    for region in selected {
        if !regions.contains(region) && table.records.iter().any(|r| &r.region == region) {
            regions.push(region.clone());
        }
    }

    let mut sums = vec![vec![0u64; table.age_columns().len()]; regions.len()];
    for record in &table.records {
        let Some(column) = regions.iter().position(|r| *r == record.region) else {
            continue;
        };
        for (sum, count) in sums[column].iter_mut().zip(&record.ages) {
            *sum += count;
        }
    }

    let rows = table
        .age_columns()
        .iter()
        .enumerate()
        .map(|(i, age)| AgeRow {
            age: age.age,
            label: age.label(),
            counts: sums.iter().map(|per_region| per_region[i]).collect(),
        })
        .collect();
    debug!("age distribution for {:?}", regions);
    Ok(AgeDistribution { regions, rows })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PyramidRow {
    pub age: u32,
    pub label: String,
    pub left: i64,
    pub right: i64,
}

/// Mirrored single-region view: the left side is the negated right side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pyramid {
    pub region: String,
    pub rows: Vec<PyramidRow>,
}

impl Pyramid {
    pub fn max_magnitude(&self) -> u64 {
        self.rows.iter().map(|r| r.right.unsigned_abs()).max().unwrap_or(0)
    }
}

/// Only defined when exactly one region is shown.
pub fn pyramid(distribution: &AgeDistribution) -> Option<Pyramid> {
    if distribution.regions.len() != 1 {
        return None;
    }
    let rows = distribution
        .rows
        .iter()
        .map(|row| {
            let count = i64::try_from(row.counts[0]).unwrap_or(i64::MAX);
            PyramidRow {
                age: row.age,
                label: row.label.clone(),
                left: -count,
                right: count,
            }
        })
        .collect();
    Some(Pyramid {
        region: distribution.regions[0].clone(),
        rows,
    })
}

/// The region whose population has the highest share at one age.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeLeader {
    pub age: u32,
    pub label: String,
    pub region: String,
    /// Index of the winning row in `CensusTable::records`.
    pub row: usize,
    pub share: f64,
    pub share_percent: f64,
}

/// For each age, the row with the largest bucket/total share. Rows whose age
/// buckets sum to zero have no share and never lead; ties keep the first row.
pub fn rank_ages_by_region(table: &CensusTable) -> Vec<AgeLeader> {
    let totals: Vec<u64> = table.records.iter().map(|r| r.age_total()).collect();
    let skipped = totals.iter().filter(|t| **t == 0).count();
    if skipped > 0 {
        debug!("{} rows with zero population left out of the age ranking", skipped);
    }

    let mut leaders = Vec::new();
    for (i, column) in table.age_columns().iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for (row, record) in table.records.iter().enumerate() {
            if totals[row] == 0 {
                continue;
            }
            let share = record.ages[i] as f64 / totals[row] as f64;
            if best.map_or(true, |(_, max)| share > max) {
                best = Some((row, share));
            }
        }
        if let Some((row, share)) = best {
            leaders.push(AgeLeader {
                age: column.age,
                label: age_label(column.age),
                region: table.records[row].region.clone(),
                row,
                share,
                share_percent: round_percent(share),
            });
        }
    }
    leaders
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignRatio {
    pub region: String,
    pub total: u64,
    pub native: u64,
    pub foreign: u64,
    pub ratio: f64,
    pub foreign_percent: f64,
    pub native_percent: f64,
}

/// Regions by descending foreign/total ratio, first row per region only.
/// Regions with a zero total are left out.
pub fn rank_foreign_ratio(table: &CensusTable) -> Result<Vec<ForeignRatio>> {
    table.schema.require_counts()?;
    let mut seen = HashSet::new();
    let mut ranking = Vec::new();
    for record in &table.records {
        if !seen.insert(record.region.as_str()) {
            continue;
        }
        let Some(counts) = record.counts else {
            continue;
        };
        if counts.total == 0 {
            debug!("{} has no population, left out of the foreign ranking", record.region);
            continue;
        }
        let ratio = counts.foreign as f64 / counts.total as f64;
        ranking.push(ForeignRatio {
            region: record.region.clone(),
            total: counts.total,
            native: counts.native,
            foreign: counts.foreign,
            ratio,
            foreign_percent: round_percent(ratio),
            native_percent: round_percent(counts.native as f64 / counts.total as f64),
        });
    }
    ranking.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    Ok(ranking)
}

pub fn top_n<T>(mut ranking: Vec<T>, n: usize) -> Vec<T> {
    ranking.truncate(n);
    ranking
}

/// A fraction as a percentage rounded to two decimals.
pub fn round_percent(fraction: f64) -> f64 {
    (fraction * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reader::parse_records;

    fn table(text: &str) -> CensusTable {
        CensusTable::from_raw(&parse_records(text).unwrap()).unwrap()
    }

    fn seoul_busan() -> CensusTable {
        table(
            "행정구역,0세,1세,totalPopulation,nativeCount,foreignCount\n\
             Seoul (11),100,90,\"10,000\",\"9,500\",500\n\
             Busan (26),80,95,\"8,000\",\"7,900\",100\n",
        )
    }

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn distribution_transposes_by_age() {
        let dist = shape_age_distribution(&seoul_busan(), &regions(&["Seoul", "Busan"])).unwrap();
        assert_eq!(dist.regions, regions(&["Seoul", "Busan"]));
        assert_eq!(dist.rows[0].age, 0);
        assert_eq!(dist.rows[0].label, "0세");
        assert_eq!(dist.rows[0].counts, vec![100, 80]);
        assert_eq!(dist.rows[1].counts, vec![90, 95]);
        assert_eq!(dist.max_count(), 100);
        assert_eq!(dist.series("Busan").unwrap().points, vec![(0, 80), (1, 95)]);
    }

    #[test]
    fn duplicate_region_rows_are_summed() {
        let t = table(
            "행정구역,0세,1세\n\
             Seoul (11),100,90\n\
             Seoul (11a),5,7\n\
             Busan (26),80,95\n",
        );
        let dist = shape_age_distribution(&t, &regions(&["Seoul"])).unwrap();
        for (i, row) in dist.rows.iter().enumerate() {
            let raw: u64 = t
                .records
                .iter()
                .filter(|r| r.region == "Seoul")
                .map(|r| r.ages[i])
                .sum();
            assert_eq!(row.counts, vec![raw]);
        }
        assert_eq!(dist.rows[0].counts, vec![105]);
    }

    #[test]
    fn unknown_and_repeated_selections_are_dropped() {
        let dist =
            shape_age_distribution(&seoul_busan(), &regions(&["Busan", "Daegu", "Busan"])).unwrap();
        assert_eq!(dist.regions, regions(&["Busan"]));
    }

    #[test]
    fn empty_selection_is_an_error() {
        let err = shape_age_distribution(&seoul_busan(), &[]).unwrap_err();
        assert!(matches!(err, DashboardError::EmptySelection));
    }

    #[test]
    fn pyramid_mirrors_single_region() {
        let dist = shape_age_distribution(&seoul_busan(), &regions(&["Seoul"])).unwrap();
        let pyr = pyramid(&dist).unwrap();
        assert_eq!(pyr.region, "Seoul");
        for (row, source) in pyr.rows.iter().zip(&dist.rows) {
            assert_eq!(row.left, -row.right);
            assert_eq!(row.right as u64, source.counts[0]);
        }
        assert_eq!(pyr.max_magnitude(), 100);

        let both = shape_age_distribution(&seoul_busan(), &regions(&["Seoul", "Busan"])).unwrap();
        assert!(pyramid(&both).is_none());
    }

    #[test]
    fn age_leaders_pick_highest_share() {
        let t = seoul_busan();
        let leaders = rank_ages_by_region(&t);
        assert_eq!(leaders.len(), 2);
        // Seoul 100/190 vs Busan 80/175 at age 0
        assert_eq!(leaders[0].region, "Seoul");
        assert_eq!(leaders[1].region, "Busan");
        assert_eq!(leaders[0].share_percent, 52.63);
        for (i, leader) in leaders.iter().enumerate() {
            let record = &t.records[leader.row];
            assert_eq!(record.region, leader.region);
            let recovered = leader.share * record.age_total() as f64;
            assert!((recovered - record.ages[i] as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn age_leader_can_be_a_later_row_of_a_region() {
        let t = table(
            "행정구역,0세,1세\n\
             Seoul (11),10,90\n\
             Busan (26),50,50\n\
             Seoul (11a),9,1\n",
        );
        let leaders = rank_ages_by_region(&t);
        assert_eq!(leaders[0].region, "Seoul");
        assert_eq!(leaders[0].row, 2);
        assert_eq!(leaders[0].share_percent, 90.0);
        assert_eq!(leaders[1].row, 0);
        for (i, leader) in leaders.iter().enumerate() {
            let record = &t.records[leader.row];
            let recovered = leader.share * record.age_total() as f64;
            assert!((recovered - record.ages[i] as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn age_leader_ties_keep_first_row_and_skip_empty_rows() {
        let t = table(
            "행정구역,0세,1세\n\
             Empty,0,0\n\
             A,1,1\n\
             B,2,2\n",
        );
        let leaders = rank_ages_by_region(&t);
        assert_eq!(leaders.len(), 2);
        assert!(leaders.iter().all(|l| l.region == "A"));
        assert_eq!(leaders[0].share_percent, 50.0);

        let nobody = table("행정구역,0세\nEmpty,0\n");
        assert!(rank_ages_by_region(&nobody).is_empty());
    }

    #[test]
    fn foreign_ratio_ranks_descending() {
        let ranking = rank_foreign_ratio(&seoul_busan()).unwrap();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].region, "Seoul");
        assert_eq!(ranking[0].foreign_percent, 5.0);
        assert_eq!(ranking[0].native_percent, 95.0);
        assert_eq!(ranking[1].region, "Busan");
        assert_eq!(ranking[1].foreign_percent, 1.25);
    }

    #[test]
    fn foreign_ratio_dedups_and_skips_zero_totals() {
        let t = table(
            "행정구역,0세,totalPopulation,nativeCount,foreignCount\n\
             A (1),1,100,90,10\n\
             B (2),1,100,50,50\n\
             A (1a),1,100,10,90\n\
             Ghost (3),0,0,0,0\n\
             C (4),1,200,180,20\n",
        );
        let ranking = rank_foreign_ratio(&t).unwrap();
        let names: Vec<&str> = ranking.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(ranking[1].foreign, 10);
        assert!(ranking.windows(2).all(|w| w[0].ratio >= w[1].ratio));
        assert_eq!(top_n(ranking, 1).len(), 1);
    }

    #[test]
    fn foreign_ratio_needs_count_columns() {
        let t = table("행정구역,0세\nA,1\n");
        let err = rank_foreign_ratio(&t).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumns { .. }));
    }

    #[test]
    fn percent_rounds_to_two_decimals() {
        assert_eq!(round_percent(0.0125), 1.25);
        assert_eq!(round_percent(1.0 / 3.0), 33.33);
        assert_eq!(round_percent(0.0), 0.0);
    }
}
