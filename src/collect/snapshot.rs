//! File-backed monitoring data.
//!
//! A snapshot holds graph readings or state timelines exported from the
//! monitoring server, the URL to service mapping and the last stored score
//! of each URL.

use super::{DayFetcher, FetchError, ScoreHistory, ServiceResolver};
use crate::engine::{DayData, DayWindow, Score, ServiceRef, SignalSeries, StateInterval};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Snapshot loading errors.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("could not read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no services known for {0}")]
    UnknownUrl(String),
}

/// One service's export for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDay {
    pub service: ServiceRef,
    /// Start of the exported 24h window.
    pub start: DateTime<Utc>,
    /// Graph readings, one per step. `null` marks a missing reading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrddata: Option<Vec<Option<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervals: Option<Vec<StateInterval>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Logical URL to the checks monitoring it.
    #[serde(default)]
    pub services: BTreeMap<String, Vec<ServiceRef>>,
    #[serde(default)]
    pub days: Vec<SnapshotDay>,
    /// Last stored score per logical URL.
    #[serde(default)]
    pub last_scores: BTreeMap<String, Score>,
}

impl Snapshot {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Services for `url`, failing when the URL has none.
    pub fn services_for(&self, url: &str) -> Result<Vec<ServiceRef>, SnapshotError> {
        let services = self.resolve(url);
        if services.is_empty() {
            return Err(SnapshotError::UnknownUrl(url.to_string()));
        }
        Ok(services)
    }

    fn find(&self, window: &DayWindow, service: &ServiceRef) -> Option<&SnapshotDay> {
        self.days
            .iter()
            .find(|d| d.start == window.start && &d.service == service)
    }
}

#[async_trait]
impl DayFetcher for Snapshot {
    async fn fetch(&self, window: &DayWindow, service: &ServiceRef) -> Result<DayData, FetchError> {
        let day = self
            .find(window, service)
            .ok_or_else(|| FetchError::Unavailable(format!("no export for {} at {}", service, window.start)))?;

        match (&day.rrddata, &day.intervals) {
            (Some(_), Some(_)) => Err(FetchError::Decode(format!(
                "export for {} has both readings and intervals",
                service
            ))),
            (Some(readings), None) => Ok(DayData::Series(vec![SignalSeries::from_readings(
                service.service.clone(),
                readings,
            )])),
            (None, Some(intervals)) => {
                if let Some(bad) = intervals.iter().find(|iv| iv.until < iv.from) {
                    return Err(FetchError::Decode(format!("interval ends before it starts at {}", bad.from)));
                }
                Ok(DayData::Intervals(intervals.clone()))
            }
            (None, None) => Ok(DayData::Unavailable),
        }
    }
}

impl ServiceResolver for Snapshot {
    fn resolve(&self, url: &str) -> Vec<ServiceRef> {
        self.services.get(url).cloned().unwrap_or_default()
    }
}

impl ScoreHistory for Snapshot {
    fn last_month_score(&self, url: &str) -> Option<Score> {
        self.last_scores.get(url).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Sample;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn window() -> DayWindow {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        DayWindow::for_offset(now, 0, 0)
    }

    const SNAPSHOT: &str = r#"{
        "services": {
            "https://www.example.org": [
                {"host": "web-f1", "service": "HTTP www.example.org", "site": "main"}
            ]
        },
        "days": [
            {
                "service": {"host": "web-f1", "service": "HTTP www.example.org", "site": "main"},
                "start": "2024-06-14T00:00:00Z",
                "rrddata": [1, 0, null, 0.5]
            }
        ],
        "last_scores": {
            "https://www.example.org": {"cmk1DayScore": 97.5, "cmk30DaysScore": 91.0}
        }
    }"#;

    fn load() -> Snapshot {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(SNAPSHOT.as_bytes()).unwrap();
        Snapshot::load(tmp.path()).unwrap()
    }

    #[test]
    fn test_load_and_resolve() {
        let snapshot = load();
        assert_eq!(snapshot.urls().collect::<Vec<_>>(), vec!["https://www.example.org"]);
        assert_eq!(snapshot.resolve("https://www.example.org").len(), 1);
        assert!(snapshot.resolve("https://unknown.example.org").is_empty());
        assert!(matches!(
            snapshot.services_for("https://unknown.example.org"),
            Err(SnapshotError::UnknownUrl(_))
        ));
        assert_eq!(
            snapshot.last_month_score("https://www.example.org").map(|s| s.month_score),
            Some(91.0)
        );
        assert!(snapshot.last_month_score("https://unknown.example.org").is_none());
    }

    #[test]
    fn test_fetch_converts_readings() {
        let snapshot = load();
        let service = snapshot.resolve("https://www.example.org").remove(0);
        let data = tokio_test::block_on(snapshot.fetch(&window(), &service)).unwrap();
        match data {
            DayData::Series(series) => assert_eq!(
                series[0].samples,
                vec![Sample::Ok, Sample::Down, Sample::Unknown, Sample::Ok]
            ),
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_fetch_missing_day_is_unavailable_error() {
        let snapshot = load();
        let service = snapshot.resolve("https://www.example.org").remove(0);
        let earlier = DayWindow::for_offset(window().end, -3, 0);
        let result = tokio_test::block_on(snapshot.fetch(&earlier, &service));
        assert!(matches!(result, Err(FetchError::Unavailable(_))));
    }

    #[test]
    fn test_invalid_file_is_json_error() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"{ not json").unwrap();
        assert!(matches!(Snapshot::load(tmp.path()), Err(SnapshotError::Json(_))));
    }
}
