//! Regional population dashboards over a single census snapshot: age
//! distributions, population pyramids, and the regions leading each age and
//! the foreign-resident share.

pub mod app;
pub mod census;
pub mod config;
pub mod csv_reader;
pub mod error;
pub mod export;
pub mod schema;
pub mod shaper;
pub mod ui;
