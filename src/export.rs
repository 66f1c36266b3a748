use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::Serialize;

use crate::error::Result;
use crate::shaper::{AgeDistribution, AgeLeader, ForeignRatio, Pyramid};

/// A derived view as shown on screen.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ExportView<'a> {
    AgeDistribution(&'a AgeDistribution),
    Pyramid(&'a Pyramid),
    AgeLeaders(&'a [AgeLeader]),
    ForeignRatio(&'a [ForeignRatio]),
}

impl<'a> ExportView<'a> {
    fn slug(&self) -> &'static str {
        match self {
            ExportView::AgeDistribution(_) => "age_distribution",
            ExportView::Pyramid(_) => "pyramid",
            ExportView::AgeLeaders(_) => "age_leaders",
            ExportView::ForeignRatio(_) => "foreign_ratio",
        }
    }
}

#[derive(Serialize)]
struct Export<'a> {
    page: &'static str,
    exported_at: NaiveDateTime,
    snapshot: Option<NaiveDate>,
    data: &'a ExportView<'a>,
}

/// Writes `view` as pretty JSON into `dir` and returns the file's path.
pub fn export_view(
    dir: &Path,
    view: &ExportView,
    snapshot: Option<NaiveDate>,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "popdash_{}_{}.json",
        view.slug(),
        now.format("%Y%m%dT%H%M%S")
    ));
    let mut writer = BufWriter::new(File::create(&path)?);
    let export = Export {
        page: view.slug(),
        exported_at: now,
        snapshot,
        data: view,
    };
    serde_json::to_writer_pretty(&mut writer, &export)?;
    writer.flush()?;
    info!("exported {} to {}", view.slug(), path.display());
    Ok(path)
}
