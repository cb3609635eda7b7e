//! Configuration module for cmkscore.
//!
//! Loads configuration from environment variables with sensible defaults.

use chrono::NaiveTime;
use std::env;
use std::time::Duration;

/// A clock-time range within a day, `[start, end)`.
///
/// When `end` is earlier than `start` the range wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ClockWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `seconds` since midnight falls inside the window.
    /// Values of 86400 and above wrap to the next day.
    pub fn contains_seconds(&self, seconds: u32) -> bool {
        let t = seconds % 86_400;
        let start = seconds_of_day(self.start);
        let end = seconds_of_day(self.end);
        if start <= end {
            t >= start && t < end
        } else {
            t >= start || t < end
        }
    }
}

fn seconds_of_day(t: NaiveTime) -> u32 {
    use chrono::Timelike;
    t.num_seconds_from_midnight()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// Incident weights applied by the bucket score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub day: f64,
    pub night: f64,
}

/// Engine configuration. Passed explicitly into every scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Expected samples per series. `None` picks the most common length.
    pub samples_per_day: Option<usize>,
    /// How long a recovery may last inside an incident before it ends it.
    pub gap_tolerance: Duration,
    /// Incidents starting in this window count as night incidents.
    pub night: ClockWindow,
    /// Offset of the work window from the start of the day.
    pub work_start: Duration,
    pub work_length: Duration,
    pub daily_weights: Weights,
    /// Applied to the averaged per-day incident rate scaled to a month.
    pub monthly_weights: Weights,
    pub month_days: u32,
    /// Local time offset east of UTC, applied once to the day boundary.
    pub utc_offset_minutes: i32,
    /// Cap scores at 100 in addition to the floor at 0.
    pub clamp_to_100: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            samples_per_day: Some(288),
            gap_tolerance: Duration::from_secs(30 * 60),
            night: ClockWindow::new(hm(2, 0), hm(7, 0)),
            work_start: Duration::from_secs(8 * 3600),
            work_length: Duration::from_secs(12 * 3600),
            daily_weights: Weights { day: 0.10, night: 0.05 },
            monthly_weights: Weights { day: 0.03, night: 0.01 },
            month_days: 30,
            utc_offset_minutes: 0,
            clamp_to_100: false,
        }
    }
}

impl ScoringConfig {
    /// Gap tolerance expressed in steps of `step_secs` seconds.
    pub fn gap_steps(&self, step_secs: u32) -> u32 {
        if step_secs == 0 {
            return 0;
        }
        (self.gap_tolerance.as_secs() / step_secs as u64) as u32
    }
}

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Snapshot file with pre-fetched monitoring data (default: "snapshot.json")
    pub snapshot_path: String,
    /// Directory receiving per-run report folders (default: "reports")
    pub report_dir: String,
    /// Upper bound on in-flight fetches (default: 8)
    pub max_concurrent_fetches: usize,
    /// Per-fetch timeout (default: 10s)
    pub fetch_timeout: Duration,
    pub scoring: ScoringConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            snapshot_path: "snapshot.json".to_string(),
            report_dir: "reports".to_string(),
            max_concurrent_fetches: 8,
            fetch_timeout: Duration::from_secs(10),
            scoring: ScoringConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CMKSCORE_SNAPSHOT`: snapshot file path
    /// - `CMKSCORE_REPORT_DIR`: report directory
    /// - `CMKSCORE_MAX_CONCURRENT_FETCHES`, `CMKSCORE_FETCH_TIMEOUT_SECS`
    /// - `CMKSCORE_SAMPLES_PER_DAY` (0 means majority length)
    /// - `CMKSCORE_GAP_MINUTES`
    /// - `CMKSCORE_NIGHT_START`, `CMKSCORE_NIGHT_END`, `CMKSCORE_WORK_START` (HH:MM)
    /// - `CMKSCORE_WORK_HOURS`, `CMKSCORE_UTC_OFFSET_MINUTES`, `CMKSCORE_CLAMP_TO_100`
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = env::var("CMKSCORE_SNAPSHOT") {
            cfg.snapshot_path = path;
        }
        if let Ok(dir) = env::var("CMKSCORE_REPORT_DIR") {
            cfg.report_dir = dir;
        }
        if let Some(n) = parse_var::<usize>("CMKSCORE_MAX_CONCURRENT_FETCHES") {
            cfg.max_concurrent_fetches = n.max(1);
        }
        if let Some(secs) = parse_var::<u64>("CMKSCORE_FETCH_TIMEOUT_SECS") {
            cfg.fetch_timeout = Duration::from_secs(secs);
        }

        let scoring = &mut cfg.scoring;
        if let Some(n) = parse_var::<usize>("CMKSCORE_SAMPLES_PER_DAY") {
            scoring.samples_per_day = (n > 0).then_some(n);
        }
        if let Some(minutes) = parse_var::<u64>("CMKSCORE_GAP_MINUTES") {
            scoring.gap_tolerance = Duration::from_secs(minutes * 60);
        }
        if let Some(t) = parse_clock("CMKSCORE_NIGHT_START") {
            scoring.night.start = t;
        }
        if let Some(t) = parse_clock("CMKSCORE_NIGHT_END") {
            scoring.night.end = t;
        }
        if let Some(t) = parse_clock("CMKSCORE_WORK_START") {
            scoring.work_start = Duration::from_secs(seconds_of_day(t) as u64);
        }
        if let Some(hours) = parse_var::<u64>("CMKSCORE_WORK_HOURS") {
            scoring.work_length = Duration::from_secs(hours.min(24) * 3600);
        }
        if let Some(offset) = parse_var::<i32>("CMKSCORE_UTC_OFFSET_MINUTES") {
            scoring.utc_offset_minutes = offset;
        }
        if let Some(clamp) = parse_var::<bool>("CMKSCORE_CLAMP_TO_100") {
            scoring.clamp_to_100 = clamp;
        }

        cfg
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, name);
            None
        }
    }
}

fn parse_clock(name: &str) -> Option<NaiveTime> {
    let raw = env::var(name).ok()?;
    match NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
        Ok(t) => Some(t),
        Err(_) => {
            tracing::warn!("Ignoring invalid clock time {:?} for {}", raw, name);
            None
        }
    }
}
