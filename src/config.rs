use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use log::warn;

const CSV_FILE_PATH: &'static str = "202505_202505_연령별인구현황_월간.csv";
const CSV_ENCODING: &'static str = "windows-949";
const LOG_FILE_PATH: &'static str = "popdash.log";
const DEFAULT_REGION: &'static str = "서울특별시";
const TOP_N: usize = 10;
const TICK_RATE_MS: u64 = 200;

/// Runtime settings. Every field has a default and an environment override.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub csv_path: PathBuf,
    pub encoding: String,
    pub log_path: PathBuf,
    pub default_region: String,
    pub top_n: usize,
    pub tick_rate_ms: u64,
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            csv_path: PathBuf::from(CSV_FILE_PATH),
            encoding: String::from(CSV_ENCODING),
            log_path: PathBuf::from(LOG_FILE_PATH),
            default_region: String::from(DEFAULT_REGION),
            top_n: TOP_N,
            tick_rate_ms: TICK_RATE_MS,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup, so tests don't have to touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(path) = lookup("POPDASH_CSV") {
            config.csv_path = PathBuf::from(path);
        }
        if let Some(label) = lookup("POPDASH_ENCODING") {
            config.encoding = label;
        }
        if let Some(path) = lookup("POPDASH_LOG") {
            config.log_path = PathBuf::from(path);
        }
        if let Some(region) = lookup("POPDASH_DEFAULT_REGION") {
            config.default_region = region;
        }
        if let Some(dir) = lookup("POPDASH_EXPORT_DIR") {
            config.export_dir = PathBuf::from(dir);
        }
        config.top_n = parse_or(&lookup, "POPDASH_TOP_N", config.top_n);
        config.tick_rate_ms = parse_or(&lookup, "POPDASH_TICK_MS", config.tick_rate_ms);
        config
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring {}={:?}: not a number", key, raw);
            default
        }),
        None => default,
    }
}
