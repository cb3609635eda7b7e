//! Daily and rolling-window aggregation.

use chrono::{DateTime, Utc};

use super::detect::{detect, DayInput};
use super::models::{
    is_computable, BucketStats, DayData, DayStats, Incidents, IntervalStats, MonthStats, Score, ServiceRef,
};
use super::score::{day_score, month_score, to_score};
use super::window::DayWindow;
use crate::config::ScoringConfig;

/// Supplies one day's fetched data for a set of services.
///
/// Implementations hand over data that was already collected; the engine
/// never waits on a source.
pub trait DaySource {
    fn day(&self, services: &[ServiceRef], window: &DayWindow) -> Vec<DayData>;
}

impl<F> DaySource for F
where
    F: Fn(&[ServiceRef], &DayWindow) -> Vec<DayData>,
{
    fn day(&self, services: &[ServiceRef], window: &DayWindow) -> Vec<DayData> {
        self(services, window)
    }
}

/// A stored month score together with the day about to leave the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorMonth {
    pub month_score: f64,
    pub oldest_day: DayStats,
}

/// Scoring engine for one evaluation instant.
#[derive(Debug, Clone)]
pub struct Engine {
    cfg: ScoringConfig,
    now: DateTime<Utc>,
}

impl Engine {
    pub fn new(cfg: ScoringConfig, now: DateTime<Utc>) -> Self {
        Self { cfg, now }
    }

    pub fn window(&self, offset: i32) -> DayWindow {
        DayWindow::for_offset(self.now, offset, self.cfg.utc_offset_minutes)
    }

    /// Offsets covered by a month ending today, oldest first.
    pub fn month_offsets(&self) -> std::ops::RangeInclusive<i32> {
        -(self.cfg.month_days as i32 - 1)..=0
    }

    /// Offset of the day that drops out when the month slides forward.
    pub fn departing_offset(&self) -> i32 {
        -(self.cfg.month_days as i32)
    }

    /// Detector output for one day, `offset` days back.
    pub fn compute_day_stats<S: DaySource + ?Sized>(
        &self,
        source: &S,
        services: &[ServiceRef],
        offset: i32,
    ) -> DayStats {
        let window = self.window(offset);
        match DayInput::from_fetched(source.day(services, &window)) {
            Some(input) => detect(&input, &window, &self.cfg),
            None => {
                tracing::debug!("Engine: No data for day offset {}", offset);
                DayStats::Empty
            }
        }
    }

    /// Month statistics, slid forward from `prior` when possible.
    ///
    /// Falls back to full recomputation when the prior score, the departing
    /// day or today has no usable value.
    pub fn compute_month_stats<S: DaySource + ?Sized>(
        &self,
        source: &S,
        services: &[ServiceRef],
        prior: Option<&PriorMonth>,
    ) -> MonthStats {
        if let Some(prior) = prior {
            let today = self.compute_day_stats(source, services, 0);
            if let Some(slid) = self.slide_month(prior, &today) {
                return slid;
            }
            tracing::info!("Engine: Prior month score unusable, recomputing all days");
        }
        self.full_month(source, services)
    }

    /// Mean of every day in the window, skipping days without data.
    pub fn full_month<S: DaySource + ?Sized>(&self, source: &S, services: &[ServiceRef]) -> MonthStats {
        let days: Vec<DayStats> = self
            .month_offsets()
            .map(|offset| self.compute_day_stats(source, services, offset))
            .collect();
        average_days(&days)
    }

    /// O(1) month update replacing the departing day with today.
    pub fn slide_month(&self, prior: &PriorMonth, today: &DayStats) -> Option<MonthStats> {
        let oldest = day_score(&prior.oldest_day, &self.cfg);
        let newest = day_score(today, &self.cfg);
        if !is_computable(prior.month_score) || !is_computable(oldest) || !is_computable(newest) {
            return None;
        }
        let days = self.cfg.month_days as f64;
        Some(MonthStats::Sliding {
            score: (prior.month_score * days - oldest + newest) / days,
        })
    }

    pub fn to_score(&self, day: &DayStats, month: &MonthStats) -> Score {
        to_score(day, month, &self.cfg)
    }

    pub fn month_score(&self, month: &MonthStats) -> f64 {
        month_score(month, &self.cfg)
    }
}

/// Per-field mean of the days that carry data.
///
/// The first non-empty day fixes the strategy; days of the other shape are
/// skipped.
pub fn average_days(days: &[DayStats]) -> MonthStats {
    let mut buckets: Vec<&BucketStats<u32>> = Vec::new();
    let mut intervals: Vec<&IntervalStats> = Vec::new();

    for day in days {
        match day {
            DayStats::Empty => {}
            DayStats::Buckets(b) if intervals.is_empty() => buckets.push(b),
            DayStats::Intervals(iv) if buckets.is_empty() => intervals.push(iv),
            _ => tracing::warn!("Engine: Skipping day with mismatched detector output"),
        }
    }

    if !buckets.is_empty() {
        let n = buckets.len() as f64;
        let stats = BucketStats {
            downtime_ratio: buckets.iter().map(|b| b.downtime_ratio).sum::<f64>() / n,
            incidents: Incidents {
                day: buckets.iter().map(|b| b.incidents.day as f64).sum::<f64>() / n,
                night: buckets.iter().map(|b| b.incidents.night as f64).sum::<f64>() / n,
            },
        };
        return MonthStats::Buckets { stats, days: buckets.len() as u32 };
    }

    if !intervals.is_empty() {
        let n = intervals.len() as f64;
        let stats = IntervalStats {
            percentage_during_work: intervals.iter().map(|s| s.percentage_during_work).sum::<f64>() / n,
            percentage_outside_work: intervals.iter().map(|s| s.percentage_outside_work).sum::<f64>() / n,
            total_down_percent: intervals.iter().map(|s| s.total_down_percent).sum::<f64>() / n,
        };
        return MonthStats::Intervals { stats, days: intervals.len() as u32 };
    }

    MonthStats::Empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::{MonitorState, Sample, SignalSeries, StateInterval, SENTINEL_SCORE};
    use approx::assert_abs_diff_eq;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    fn services() -> Vec<ServiceRef> {
        vec![ServiceRef {
            host: "web-f1".to_string(),
            service: "HTTP www.example.org".to_string(),
            site: "main".to_string(),
        }]
    }

    fn engine() -> Engine {
        Engine::new(ScoringConfig::default(), now())
    }

    fn ok_series() -> DayData {
        DayData::Series(vec![SignalSeries::new("HTTP", vec![Sample::Ok; 288])])
    }

    /// A day with `penalty` points of work-hour downtime.
    fn interval_day(window: &DayWindow, penalty: i64) -> DayData {
        // 1.5% of a day during work hours costs 1 point
        let secs = penalty * 1296;
        let from = window.start + ChronoDuration::hours(9);
        DayData::Intervals(vec![StateInterval {
            from,
            until: from + ChronoDuration::seconds(secs),
            state: MonitorState::Crit,
            duration_percent: secs as f64 / 864.0,
        }])
    }

    #[test]
    fn test_month_offsets() {
        let e = engine();
        let offsets: Vec<i32> = e.month_offsets().collect();
        assert_eq!(offsets.len(), 30);
        assert_eq!(offsets[0], -29);
        assert_eq!(offsets[29], 0);
        assert_eq!(e.departing_offset(), -30);
    }

    #[test]
    fn test_all_ok_month_scores_100() {
        let e = engine();
        let source = |_: &[ServiceRef], _: &DayWindow| vec![ok_series()];
        let day = e.compute_day_stats(&source, &services(), 0);
        let month = e.compute_month_stats(&source, &services(), None);
        assert_eq!(month, MonthStats::Buckets { stats: BucketStats::default(), days: 30 });

        let score = e.to_score(&day, &month);
        assert_eq!(score.day_score, 100.0);
        assert_eq!(score.month_score, 100.0);
    }

    #[test]
    fn test_all_empty_month_is_sentinel() {
        let e = engine();
        let source = |_: &[ServiceRef], _: &DayWindow| vec![DayData::Unavailable];
        let month = e.compute_month_stats(&source, &services(), None);
        assert!(month.is_empty());
        assert_eq!(e.month_score(&month), SENTINEL_SCORE);
    }

    #[test]
    fn test_empty_days_skipped_not_counted_as_perfect() {
        let e = engine();
        let today = e.window(0);
        let source = move |_: &[ServiceRef], w: &DayWindow| {
            if *w == today {
                vec![DayData::Series(vec![SignalSeries::new("HTTP", vec![Sample::Down; 288])])]
            } else {
                vec![DayData::Unavailable]
            }
        };
        match e.full_month(&source, &services()) {
            MonthStats::Buckets { stats, days } => {
                assert_eq!(days, 1);
                assert_eq!(stats.downtime_ratio, 1.0);
            }
            other => panic!("unexpected month stats: {:?}", other),
        }
    }

    #[test]
    fn test_sliding_equal_days_has_no_drift() {
        let e = Engine::new(ScoringConfig::default(), now());
        // 80 points: 20% downtime and no incidents
        let eighty = DayStats::Buckets(BucketStats {
            downtime_ratio: 0.2,
            incidents: Incidents::default(),
        });
        let prior = PriorMonth { month_score: 90.0, oldest_day: eighty };
        match e.slide_month(&prior, &eighty) {
            Some(MonthStats::Sliding { score }) => assert_eq!(score, 90.0),
            other => panic!("unexpected month stats: {:?}", other),
        }
    }

    #[test]
    fn test_sliding_falls_back_on_sentinel() {
        let e = engine();
        let source = |_: &[ServiceRef], _: &DayWindow| vec![ok_series()];
        let prior = PriorMonth { month_score: SENTINEL_SCORE, oldest_day: DayStats::Empty };
        let month = e.compute_month_stats(&source, &services(), Some(&prior));
        assert!(matches!(month, MonthStats::Buckets { days: 30, .. }));
    }

    #[test]
    fn test_sliding_matches_full_recompute() {
        let today = engine();
        let yesterday = Engine::new(ScoringConfig::default(), now() - ChronoDuration::days(1));

        let penalty_for = |w: &DayWindow| (w.start.timestamp() / 86_400) % 4;
        let source = move |_: &[ServiceRef], w: &DayWindow| vec![interval_day(w, penalty_for(w))];

        let previous = yesterday.full_month(&source, &services());
        let prior = PriorMonth {
            month_score: yesterday.month_score(&previous),
            oldest_day: today.compute_day_stats(&source, &services(), today.departing_offset()),
        };

        let slid = today.compute_month_stats(&source, &services(), Some(&prior));
        assert!(matches!(slid, MonthStats::Sliding { .. }));

        let full = today.full_month(&source, &services());
        assert_abs_diff_eq!(today.month_score(&slid), today.month_score(&full), epsilon = 0.01);
    }

    #[test]
    fn test_average_days_interval_means() {
        let a = IntervalStats {
            percentage_during_work: 2.0,
            percentage_outside_work: 1.0,
            total_down_percent: 3.0,
        };
        let b = IntervalStats::default();
        let month = average_days(&[DayStats::Intervals(a), DayStats::Empty, DayStats::Intervals(b)]);
        assert_eq!(
            month,
            MonthStats::Intervals {
                stats: IntervalStats {
                    percentage_during_work: 1.0,
                    percentage_outside_work: 0.5,
                    total_down_percent: 1.5,
                },
                days: 2,
            }
        );
    }
}
