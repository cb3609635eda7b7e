//! Incident detection for one day of monitoring data.
//!
//! Two strategies share one entry point and are picked by the shape of the
//! fetched data: sampled series are scanned bucket by bucket, state
//! timelines are integrated against the work window.

use chrono::Duration as ChronoDuration;

use super::models::{BucketStats, DayData, DayStats, Incidents, IntervalStats, SignalSeries, StateInterval};
use super::normalize::{merge_intervals, merge_series};
use super::window::{DayWindow, SECONDS_PER_DAY};
use crate::config::ScoringConfig;

/// One day of data for a logical service, grouped by strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum DayInput {
    Series(Vec<SignalSeries>),
    /// One timeline per underlying service.
    Intervals(Vec<Vec<StateInterval>>),
}

impl DayInput {
    /// Group per-service fetch results. The first available shape decides the
    /// strategy; services reporting the other shape are left out.
    pub fn from_fetched(fetched: Vec<DayData>) -> Option<Self> {
        let mut input: Option<DayInput> = None;
        for data in fetched {
            input = match (input.take(), data) {
                (current, DayData::Unavailable) => current,
                (None, DayData::Series(s)) => Some(DayInput::Series(s)),
                (None, DayData::Intervals(iv)) => Some(DayInput::Intervals(vec![iv])),
                (Some(DayInput::Series(mut all)), DayData::Series(s)) => {
                    all.extend(s);
                    Some(DayInput::Series(all))
                }
                (Some(DayInput::Intervals(mut all)), DayData::Intervals(iv)) => {
                    all.push(iv);
                    Some(DayInput::Intervals(all))
                }
                (current, _) => {
                    tracing::warn!("Engine: Ignoring service data of a different shape for the same day");
                    current
                }
            };
        }
        input
    }
}

/// Run the matching detector over one day.
pub fn detect(input: &DayInput, window: &DayWindow, cfg: &ScoringConfig) -> DayStats {
    match input {
        DayInput::Series(series) => match merge_series(series, cfg.samples_per_day) {
            Some(mask) => DayStats::Buckets(BucketScan::new(mask.len(), cfg).run(&mask)),
            None => DayStats::Empty,
        },
        DayInput::Intervals(timelines) => {
            // no timeline at all is missing data; an empty intersection is a clean day
            if timelines.iter().all(|t| t.is_empty()) {
                return DayStats::Empty;
            }
            let merged = merge_intervals(timelines);
            DayStats::Intervals(WorkHoursSplit::new(window, cfg).run(&merged))
        }
    }
}

/// Fixed-step scan with gap tolerance.
///
/// An incident starts on the second consecutive down step and survives up to
/// `gap` up steps; any down step inside it refills the allowance.
pub struct BucketScan<'a> {
    step_secs: u32,
    gap: u32,
    cfg: &'a ScoringConfig,
}

impl<'a> BucketScan<'a> {
    pub fn new(samples: usize, cfg: &'a ScoringConfig) -> Self {
        let step_secs = if samples == 0 {
            0
        } else {
            (SECONDS_PER_DAY as usize / samples) as u32
        };
        Self {
            step_secs,
            gap: cfg.gap_steps(step_secs),
            cfg,
        }
    }

    pub fn run(&self, down: &[bool]) -> BucketStats<u32> {
        let mut incidents = Incidents::<u32>::default();
        let mut down_steps: u32 = 0;
        let mut in_incident = false;
        let mut remaining = self.gap;
        let mut prev_down = false;

        for (i, &is_down) in down.iter().enumerate() {
            let t = self.step_secs * (i as u32 + 1);

            if is_down {
                down_steps += 1;
                if in_incident {
                    remaining = self.gap;
                } else if prev_down {
                    if self.cfg.night.contains_seconds(t) {
                        incidents.night += 1;
                    } else {
                        incidents.day += 1;
                    }
                    in_incident = true;
                    remaining = self.gap;
                }
            } else if in_incident {
                remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    in_incident = false;
                    remaining = self.gap;
                }
            }

            prev_down = is_down;
        }

        let downtime_ratio = if down.is_empty() {
            0.0
        } else {
            down_steps as f64 / down.len() as f64
        };

        BucketStats {
            downtime_ratio,
            incidents,
        }
    }
}

/// Splits down intervals into work-hours and off-hours seconds.
pub struct WorkHoursSplit {
    work_start: chrono::DateTime<chrono::Utc>,
    work_end: chrono::DateTime<chrono::Utc>,
}

impl WorkHoursSplit {
    pub fn new(window: &DayWindow, cfg: &ScoringConfig) -> Self {
        let work_start = window.start + ChronoDuration::seconds(cfg.work_start.as_secs() as i64);
        let work_end = work_start + ChronoDuration::seconds(cfg.work_length.as_secs() as i64);
        Self { work_start, work_end }
    }

    /// Seconds of `iv` inside and outside the work window.
    pub fn split(&self, iv: &StateInterval) -> (i64, i64) {
        let total = iv.duration_secs();

        if iv.from >= self.work_start && iv.until <= self.work_end {
            return (total, 0);
        }

        if iv.from < self.work_end && iv.until > self.work_start {
            let during = if iv.from < self.work_start {
                (iv.until.min(self.work_end) - self.work_start).num_seconds()
            } else {
                (self.work_end - iv.from).num_seconds()
            };
            let during = during.clamp(0, total);
            return (during, total - during);
        }

        (0, total)
    }

    pub fn run(&self, intervals: &[StateInterval]) -> IntervalStats {
        let mut during_work: i64 = 0;
        let mut outside_work: i64 = 0;
        let mut total_down_percent = 0.0;

        for iv in intervals.iter().filter(|iv| iv.state.counts_as_down()) {
            let (during, outside) = self.split(iv);
            during_work += during;
            outside_work += outside;
            total_down_percent += iv.duration_percent;
        }

        let day = SECONDS_PER_DAY as f64;
        IntervalStats {
            percentage_during_work: during_work as f64 / day * 100.0,
            percentage_outside_work: outside_work as f64 / day * 100.0,
            total_down_percent,
        }
    }
}
