//! Calendar day windows.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// A 24h `[start, end)` window, `offset` days back from the last complete day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayWindow {
    pub offset: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window ending at today's local midnight shifted by `offset` days.
    ///
    /// The UTC offset is applied once here; everything downstream measures
    /// time relative to `start`.
    pub fn for_offset(now: DateTime<Utc>, offset: i32, utc_offset_minutes: i32) -> Self {
        let utc_midnight = truncate_to_day(now);
        let end = utc_midnight - ChronoDuration::minutes(utc_offset_minutes as i64)
            + ChronoDuration::days(offset as i64);
        Self {
            offset,
            start: end - ChronoDuration::seconds(SECONDS_PER_DAY),
            end,
        }
    }

    /// Seconds from the window start to `t`.
    pub fn seconds_into(&self, t: DateTime<Utc>) -> i64 {
        (t - self.start).num_seconds()
    }
}

/// Truncate a datetime to UTC midnight.
pub fn truncate_to_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    let ts = dt.timestamp();
    let truncated = ts - ts.rem_euclid(SECONDS_PER_DAY);
    DateTime::from_timestamp(truncated, 0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_to_day() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 1, 12, 34, 56).unwrap();
        assert_eq!(truncate_to_day(dt), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_today_is_last_complete_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let w = DayWindow::for_offset(now, 0, 0);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());

        let w = DayWindow::for_offset(now, -29, 0);
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_local_offset_moves_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        // UTC+2: local midnight is 22:00 UTC the previous evening
        let w = DayWindow::for_offset(now, 0, 120);
        assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 3, 9, 22, 0, 0).unwrap());
        assert_eq!(w.seconds_into(w.end), SECONDS_PER_DAY);
    }
}
