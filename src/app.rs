use std::fmt;

use chrono::NaiveDateTime;
use crossterm::event::KeyCode;
use log::{info, warn};
use tui::widgets::ListState;

use crate::census::CensusTable;
use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::export::{export_view, ExportView};
use crate::shaper::{
    pyramid, rank_ages_by_region, rank_foreign_ratio, shape_age_distribution, top_n,
    AgeDistribution, AgeLeader, ForeignRatio, Pyramid,
};

pub const MENU_TITLES: [&'static str; 4] = ["Distribution", "Leaders", "Foreign", "Quit"];

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MenuItem {
    Distribution,
    AgeLeaders,
    ForeignRatio,
}

impl From<MenuItem> for usize {
    fn from(input: MenuItem) -> usize {
        match input {
            MenuItem::Distribution => 0,
            MenuItem::AgeLeaders => 1,
            MenuItem::ForeignRatio => 2,
        }
    }
}

impl MenuItem {
    fn next(self) -> MenuItem {
        match self {
            MenuItem::Distribution => MenuItem::AgeLeaders,
            MenuItem::AgeLeaders => MenuItem::ForeignRatio,
            MenuItem::ForeignRatio => MenuItem::Distribution,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ChartMode {
    Line,
    Bar,
}

impl fmt::Display for ChartMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChartMode::Line => write!(f, "Line"),
            ChartMode::Bar => write!(f, "Bar"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Action {
    Continue,
    Export,
    Quit,
}

/// Everything the screen shows. Views are derived from the shared table and
/// rebuilt whenever the selection changes.
pub struct App<'a> {
    pub table: &'a CensusTable,
    pub config: &'a Config,
    pub regions: Vec<String>,
    pub selected: Vec<String>,
    pub cursor: ListState,
    pub active_menu_item: MenuItem,
    pub chart_mode: ChartMode,
    pub distribution: Result<AgeDistribution>,
    pub leaders: Vec<AgeLeader>,
    pub foreign: Result<Vec<ForeignRatio>>,
    pub status: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(table: &'a CensusTable, config: &'a Config) -> Self {
        let regions = table.regions();
        let mut selected = Vec::new();
        if regions.contains(&config.default_region) {
            selected.push(config.default_region.clone());
        } else {
            warn!("default region {} not in the census file", config.default_region);
        }
        let mut cursor = ListState::default();
        let start = regions.iter().position(|r| selected.contains(r)).unwrap_or(0);
        if !regions.is_empty() {
            cursor.select(Some(start));
        }

        let foreign = rank_foreign_ratio(table).map(|ranking| top_n(ranking, config.top_n));
        if let Err(e) = &foreign {
            warn!("foreign ratio page unavailable: {}", e);
        }

        let mut app = App {
            table,
            config,
            regions,
            selected,
            cursor,
            active_menu_item: MenuItem::Distribution,
            chart_mode: ChartMode::Line,
            distribution: Err(DashboardError::EmptySelection),
            leaders: rank_ages_by_region(table),
            foreign,
            status: None,
        };
        app.refresh_distribution();
        app
    }

    pub fn on_key(&mut self, code: KeyCode) -> Action {
        self.status = None;
        match code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char('e') => return Action::Export,
            KeyCode::Char('d') => self.active_menu_item = MenuItem::Distribution,
            KeyCode::Char('l') => self.active_menu_item = MenuItem::AgeLeaders,
            KeyCode::Char('f') => self.active_menu_item = MenuItem::ForeignRatio,
            KeyCode::Tab => self.active_menu_item = self.active_menu_item.next(),
            KeyCode::Char('c') => {
                self.chart_mode = match self.chart_mode {
                    ChartMode::Line => ChartMode::Bar,
                    ChartMode::Bar => ChartMode::Line,
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('x') => {
                self.selected.clear();
                self.refresh_distribution();
            }
            _ => {}
        }
        Action::Continue
    }

    fn move_cursor(&mut self, step: isize) {
        if self.regions.is_empty() {
            return;
        }
        let len = self.regions.len() as isize;
        let current = self.cursor.selected().unwrap_or(0) as isize;
        self.cursor.select(Some((current + step).rem_euclid(len) as usize));
    }

    fn toggle_selected(&mut self) {
        let Some(region) = self.cursor.selected().and_then(|i| self.regions.get(i)) else {
            return;
        };
        if let Some(pos) = self.selected.iter().position(|r| r == region) {
            self.selected.remove(pos);
        } else {
            self.selected.push(region.clone());
        }
        self.refresh_distribution();
    }

    fn refresh_distribution(&mut self) {
        self.distribution = if self.selected.is_empty() {
            Err(DashboardError::EmptySelection)
        } else {
            shape_age_distribution(self.table, &self.selected)
        };
    }

    /// The mirrored view, shown in bar mode for a single region.
    pub fn pyramid(&self) -> Option<Pyramid> {
        match (&self.distribution, self.chart_mode) {
            (Ok(distribution), ChartMode::Bar) => pyramid(distribution),
            _ => None,
        }
    }

    /// Writes the current page to the export directory and reports the
    /// outcome on the status line.
    pub fn export_current(&mut self, now: NaiveDateTime) {
        let pyramid = self.pyramid();
        let view = match self.active_menu_item {
            MenuItem::Distribution => match (&pyramid, &self.distribution) {
                (Some(p), _) => Ok(ExportView::Pyramid(p)),
                (None, Ok(d)) => Ok(ExportView::AgeDistribution(d)),
                (None, Err(e)) => Err(e.to_string()),
            },
            MenuItem::AgeLeaders => Ok(ExportView::AgeLeaders(&self.leaders)),
            MenuItem::ForeignRatio => match &self.foreign {
                Ok(ranking) => Ok(ExportView::ForeignRatio(ranking)),
                Err(e) => Err(e.to_string()),
            },
        };
        let message = match view {
            Ok(view) => {
                match export_view(&self.config.export_dir, &view, self.table.schema.snapshot, now) {
                    Ok(path) => format!("exported to {}", path.display()),
                    Err(e) => {
                        warn!("export failed: {}", e);
                        format!("export failed: {}", e)
                    }
                }
            }
            Err(reason) => format!("nothing to export: {}", reason),
        };
        info!("{}", message);
        self.status = Some(message);
    }
}
