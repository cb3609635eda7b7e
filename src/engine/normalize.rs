//! Aligns per-service signals into one down/up view before detection.
//!
//! Several monitoring checks may back one logical URL. A timestep (or a
//! stretch of timeline) only counts as down when every surviving service
//! reports it down, so one healthy mirror masks the rest.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::models::{SignalSeries, StateInterval};
use super::window::SECONDS_PER_DAY;

/// Resolve the sample count every series must match.
///
/// With no configured count, the most common length wins; ties go to the
/// longer series.
pub fn expected_len(series: &[SignalSeries], configured: Option<usize>) -> Option<usize> {
    if let Some(n) = configured {
        return Some(n);
    }
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for s in series.iter().filter(|s| !s.is_empty()) {
        *counts.entry(s.len()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(len, count)| (count, len))
        .map(|(len, _)| len)
}

/// Merge series into a per-step down mask.
///
/// Series whose length differs from the expected count are dropped. Returns
/// `None` when nothing survives.
pub fn merge_series(series: &[SignalSeries], configured: Option<usize>) -> Option<Vec<bool>> {
    let n = expected_len(series, configured)?;
    if n == 0 {
        return None;
    }

    let survivors: Vec<&SignalSeries> = series
        .iter()
        .filter(|s| {
            let keep = s.len() == n;
            if !keep {
                tracing::warn!(
                    "Engine: Dropping series {} with {} samples (expected {})",
                    s.service,
                    s.len(),
                    n
                );
            }
            keep
        })
        .collect();

    if survivors.is_empty() {
        return None;
    }

    let mask = (0..n)
        .map(|i| survivors.iter().all(|s| s.samples[i].is_down()))
        .collect();
    Some(mask)
}

/// Intersect the down stretches of several services' timelines.
///
/// A single service passes through untouched. For several services, only
/// stretches where all of them are down remain; each merged stretch reports
/// its own share of the day.
pub fn merge_intervals(per_service: &[Vec<StateInterval>]) -> Vec<StateInterval> {
    let mut timelines = per_service.iter().filter(|t| !t.is_empty());
    let first = match timelines.next() {
        Some(t) => t,
        None => return Vec::new(),
    };
    let rest: Vec<&Vec<StateInterval>> = timelines.collect();
    if rest.is_empty() {
        return first.clone();
    }

    let mut merged = down_spans(first);
    for timeline in rest {
        let other = down_spans(timeline);
        merged = intersect(&merged, &other);
    }

    merged
        .into_iter()
        .map(|mut iv| {
            iv.duration_percent = iv.duration_secs() as f64 / SECONDS_PER_DAY as f64 * 100.0;
            iv
        })
        .collect()
}

fn down_spans(timeline: &[StateInterval]) -> Vec<StateInterval> {
    let mut spans: Vec<StateInterval> = timeline
        .iter()
        .filter(|iv| iv.state.counts_as_down() && iv.until > iv.from)
        .cloned()
        .collect();
    spans.sort_by_key(|iv| iv.from);
    spans
}

fn intersect(a: &[StateInterval], b: &[StateInterval]) -> Vec<StateInterval> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let from: DateTime<Utc> = a[i].from.max(b[j].from);
        let until: DateTime<Utc> = a[i].until.min(b[j].until);
        if from < until {
            out.push(StateInterval {
                from,
                until,
                state: a[i].state,
                duration_percent: 0.0,
            });
        }
        if a[i].until <= b[j].until {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::{MonitorState, Sample};
    use chrono::TimeZone;

    fn series(name: &str, down_at: &[usize], n: usize) -> SignalSeries {
        let samples = (0..n)
            .map(|i| if down_at.contains(&i) { Sample::Down } else { Sample::Ok })
            .collect();
        SignalSeries::new(name, samples)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn iv(from: DateTime<Utc>, until: DateTime<Utc>, state: MonitorState) -> StateInterval {
        StateInterval { from, until, state, duration_percent: 1.0 }
    }

    #[test]
    fn test_mismatched_series_dropped() {
        let input = vec![series("a", &[1, 2], 6), series("b", &[], 5)];
        let mask = merge_series(&input, Some(6)).unwrap();
        assert_eq!(mask, vec![false, true, true, false, false, false]);
    }

    #[test]
    fn test_no_survivors_is_none() {
        let input = vec![series("a", &[], 10)];
        assert!(merge_series(&input, Some(288)).is_none());
        assert!(merge_series(&[], None).is_none());
    }

    #[test]
    fn test_healthy_mirror_masks_outage() {
        let input = vec![series("a", &[0, 1, 2], 4), series("b", &[1, 2, 3], 4)];
        let mask = merge_series(&input, Some(4)).unwrap();
        assert_eq!(mask, vec![false, true, true, false]);
    }

    #[test]
    fn test_unknown_counts_as_down() {
        let input = vec![SignalSeries::from_readings("a", &[Some(1.0), None, Some(0.0)])];
        let mask = merge_series(&input, Some(3)).unwrap();
        assert_eq!(mask, vec![false, true, true]);
    }

    #[test]
    fn test_majority_length() {
        let input = vec![series("a", &[], 4), series("b", &[], 4), series("c", &[], 7)];
        assert_eq!(expected_len(&input, None), Some(4));
        assert_eq!(merge_series(&input, None).unwrap().len(), 4);
    }

    #[test]
    fn test_single_timeline_passes_through() {
        let timeline = vec![iv(at(1, 0), at(2, 0), MonitorState::Ok)];
        assert_eq!(merge_intervals(&[timeline.clone()]), timeline);
    }

    #[test]
    fn test_timelines_intersect() {
        let a = vec![
            iv(at(1, 0), at(3, 0), MonitorState::Crit),
            iv(at(3, 0), at(4, 0), MonitorState::HostDown),
        ];
        let b = vec![
            iv(at(2, 0), at(5, 0), MonitorState::Warn),
        ];
        let merged = merge_intervals(&[a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].from, at(2, 0));
        assert_eq!(merged[0].until, at(3, 0));
        assert!((merged[0].duration_percent - 100.0 / 24.0).abs() < 1e-9);
    }
}
