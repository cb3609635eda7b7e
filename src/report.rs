//! Per-URL result reports.

use crate::engine::{DayStats, MonthStats, Score};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Report writing errors.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("could not write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything computed for one URL in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlReport {
    pub url: String,
    pub generated_at: DateTime<Utc>,
    pub today: DayStats,
    pub month: MonthStats,
    pub score: Score,
}

/// Directory-safe form of a URL.
pub fn url_slug(url: &str) -> String {
    let trimmed = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// Write `report` to `<dir>/<url slug>/<timestamp>/checkmk.json`.
pub fn write_report<P: AsRef<Path>>(dir: P, report: &UrlReport) -> Result<PathBuf, ReportError> {
    let folder = dir
        .as_ref()
        .join(url_slug(&report.url))
        .join(report.generated_at.format("%Y-%m-%d_%H-%M-%S").to_string());
    std::fs::create_dir_all(&folder)?;

    let path = folder.join("checkmk.json");
    std::fs::write(&path, serde_json::to_vec_pretty(report)?)?;
    Ok(path)
}
