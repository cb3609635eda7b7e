//! Value types flowing through a scoring pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score value meaning "not computable".
pub const SENTINEL_SCORE: f64 = -1.0;

/// One measurement of a monitored service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sample {
    Ok,
    Down,
    Unknown,
}

impl Sample {
    /// Convert a raw graph reading. Missing readings are unknown, zero is down.
    pub fn from_reading(reading: Option<f64>) -> Self {
        match reading {
            None => Sample::Unknown,
            Some(v) if v == 0.0 => Sample::Down,
            Some(_) => Sample::Ok,
        }
    }

    /// Unknown samples count as down for detection.
    pub fn is_down(self) -> bool {
        !matches!(self, Sample::Ok)
    }
}

impl From<bool> for Sample {
    fn from(up: bool) -> Self {
        if up {
            Sample::Ok
        } else {
            Sample::Down
        }
    }
}

/// Evenly spaced samples for one service over a 24h window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub service: String,
    pub samples: Vec<Sample>,
}

impl SignalSeries {
    pub fn new(service: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            service: service.into(),
            samples,
        }
    }

    pub fn from_readings(service: impl Into<String>, readings: &[Option<f64>]) -> Self {
        Self::new(
            service,
            readings.iter().copied().map(Sample::from_reading).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Monitoring state reported for a timeline interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Ok,
    Warn,
    Crit,
    Unknown,
    HostDown,
}

impl MonitorState {
    /// `ok` and scheduled `host_down` never count against availability.
    pub fn counts_as_down(self) -> bool {
        !matches!(self, MonitorState::Ok | MonitorState::HostDown)
    }
}

/// A `[from, until)` span of one monitoring state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateInterval {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub state: MonitorState,
    /// Share of the day the upstream reports for this interval, in percent.
    pub duration_percent: f64,
}

impl StateInterval {
    pub fn duration_secs(&self) -> i64 {
        (self.until - self.from).num_seconds().max(0)
    }
}

/// One underlying monitoring check backing a logical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRef {
    pub host: String,
    pub service: String,
    pub site: String,
}

impl std::fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.host, self.service, self.site)
    }
}

/// What one service's fetch produced for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DayData {
    Series(Vec<SignalSeries>),
    Intervals(Vec<StateInterval>),
    /// Fetch failed, timed out or returned nothing.
    Unavailable,
}

/// Incidents split by the time-of-day they started in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Incidents<T> {
    pub day: T,
    pub night: T,
}

/// Bucket detector output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats<T> {
    pub downtime_ratio: f64,
    pub incidents: Incidents<T>,
}

/// Interval detector output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub percentage_during_work: f64,
    pub percentage_outside_work: f64,
    pub total_down_percent: f64,
}

/// One calendar day of detector output for one (merged) service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayStats {
    /// No usable data for the day.
    Empty,
    Buckets(BucketStats<u32>),
    Intervals(IntervalStats),
}

impl DayStats {
    pub fn is_empty(&self) -> bool {
        matches!(self, DayStats::Empty)
    }
}

/// Month-level statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonthStats {
    Empty,
    /// Per-field mean over the days that had data.
    Buckets { stats: BucketStats<f64>, days: u32 },
    Intervals { stats: IntervalStats, days: u32 },
    /// Score slid forward from a stored month score.
    Sliding { score: f64 },
}

impl MonthStats {
    pub fn is_empty(&self) -> bool {
        matches!(self, MonthStats::Empty)
    }
}

/// Composite scores. Either field may be [`SENTINEL_SCORE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(rename = "cmk1DayScore")]
    pub day_score: f64,
    #[serde(rename = "cmk30DaysScore")]
    pub month_score: f64,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            day_score: SENTINEL_SCORE,
            month_score: SENTINEL_SCORE,
        }
    }
}

/// Whether a score value is a real score rather than the sentinel.
pub fn is_computable(score: f64) -> bool {
    score.is_finite() && score >= 0.0
}
