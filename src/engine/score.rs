//! Maps day and month statistics to bounded composite scores.

use super::models::{is_computable, BucketStats, DayStats, IntervalStats, MonthStats, Score, SENTINEL_SCORE};
use crate::config::{ScoringConfig, Weights};

/// Availability penalised by weighted incident counts, floored at 0.
pub fn bucket_score(downtime_ratio: f64, day: f64, night: f64, weights: Weights) -> f64 {
    let availability = (1.0 - downtime_ratio) * 100.0;
    (availability * (1.0 - day * weights.day - night * weights.night)).max(0.0)
}

/// Work-hour downtime counts twice as much as off-hours downtime.
pub fn interval_score(stats: &IntervalStats) -> f64 {
    let penalty = (2.0 * stats.percentage_during_work + stats.percentage_outside_work) / 3.0;
    round2(100.0 - penalty).max(0.0)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn bounded(score: f64, cfg: &ScoringConfig) -> f64 {
    if cfg.clamp_to_100 {
        score.min(100.0)
    } else {
        score
    }
}

/// Score for a single day, or the sentinel when the day has no data.
pub fn day_score(stats: &DayStats, cfg: &ScoringConfig) -> f64 {
    let score = match stats {
        DayStats::Empty => return SENTINEL_SCORE,
        DayStats::Buckets(BucketStats { downtime_ratio, incidents }) => bucket_score(
            *downtime_ratio,
            incidents.day as f64,
            incidents.night as f64,
            cfg.daily_weights,
        ),
        DayStats::Intervals(iv) => interval_score(iv),
    };
    bounded(score, cfg)
}

/// Score for the month, or the sentinel when no day had data.
///
/// Averaged incident rates are scaled back up to a month's worth before the
/// monthly weights apply.
pub fn month_score(stats: &MonthStats, cfg: &ScoringConfig) -> f64 {
    let score = match stats {
        MonthStats::Empty => return SENTINEL_SCORE,
        MonthStats::Buckets { stats, .. } => {
            let days = cfg.month_days as f64;
            bucket_score(
                stats.downtime_ratio,
                stats.incidents.day * days,
                stats.incidents.night * days,
                cfg.monthly_weights,
            )
        }
        MonthStats::Intervals { stats, .. } => interval_score(stats),
        MonthStats::Sliding { score } => {
            if !is_computable(*score) {
                return SENTINEL_SCORE;
            }
            score.max(0.0)
        }
    };
    bounded(score, cfg)
}

pub fn to_score(day: &DayStats, month: &MonthStats, cfg: &ScoringConfig) -> Score {
    Score {
        day_score: day_score(day, cfg),
        month_score: month_score(month, cfg),
    }
}
