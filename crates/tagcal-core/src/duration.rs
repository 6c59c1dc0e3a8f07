//! Hour/minute durations and wall-clock formatting helpers.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

const MINUTES_PER_HOUR: i64 = 60;

/// A length of time split into hours and minutes.
///
/// Values produced by arithmetic are normalized so that `minutes` is always in
/// `0..60`; a negative duration carries its sign in `hours`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
}

impl Duration {
    pub const ZERO: Duration = Duration {
        hours: 0,
        minutes: 0,
    };

    pub const fn new(hours: i64, minutes: i64) -> Self {
        Self { hours, minutes }
    }

    pub const fn hours(hours: i64) -> Self {
        Self { hours, minutes: 0 }
    }

    pub fn from_minutes(total: i64) -> Self {
        Self {
            hours: total.div_euclid(MINUTES_PER_HOUR),
            minutes: total.rem_euclid(MINUTES_PER_HOUR),
        }
    }

    pub fn total_minutes(self) -> i64 {
        self.hours * MINUTES_PER_HOUR + self.minutes
    }

    /// Length of `[start, end)` rounded to the nearest minute, halves rounding up.
    pub fn nearest_minute(end: NaiveTime, start: NaiveTime) -> Self {
        let millis = end.signed_duration_since(start).num_milliseconds();
        Self::from_minutes((millis + 30_000).div_euclid(60_000))
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration::from_minutes(self.total_minutes() + rhs.total_minutes())
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        Duration::from_minutes(self.total_minutes() - rhs.total_minutes())
    }
}

impl Sum for Duration {
    fn sum<I: Iterator<Item = Duration>>(iter: I) -> Duration {
        iter.fold(Duration::ZERO, Add::add)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&pad_time(*self))
    }
}

/// `HH:MM`, zero padded. Negative durations get a leading `-`.
pub fn pad_time(duration: Duration) -> String {
    let total = duration.total_minutes();
    let sign = if total < 0 { "-" } else { "" };
    let abs = total.abs();
    format!(
        "{sign}{:02}:{:02}",
        abs / MINUTES_PER_HOUR,
        abs % MINUTES_PER_HOUR
    )
}

pub fn time_to_string(time: NaiveTime) -> String {
    pad_time(Duration::new(i64::from(time.hour()), i64::from(time.minute())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).expect("valid time")
    }

    #[test]
    fn addition_carries_minutes_into_hours() {
        assert_eq!(Duration::new(1, 45) + Duration::new(0, 30), Duration::new(2, 15));
        assert_eq!(
            [Duration::new(0, 50), Duration::new(0, 50), Duration::hours(1)]
                .into_iter()
                .sum::<Duration>(),
            Duration::new(2, 40)
        );
    }

    #[test]
    fn subtraction_borrows_from_hours() {
        assert_eq!(Duration::new(1, 10) - Duration::new(0, 20), Duration::new(0, 50));
        assert_eq!(Duration::hours(24) - Duration::hours(24), Duration::ZERO);

        let negative = Duration::new(0, 10) - Duration::new(0, 20);
        assert_eq!(negative.total_minutes(), -10);
        assert_eq!(pad_time(negative), "-00:10");
    }

    #[test]
    fn nearest_minute_rounds_seconds() {
        assert_eq!(Duration::nearest_minute(t(23, 59, 59), t(0, 0, 0)), Duration::hours(24));
        assert_eq!(Duration::nearest_minute(t(23, 59, 59), t(18, 0, 0)), Duration::hours(6));
        assert_eq!(Duration::nearest_minute(t(9, 0, 29), t(8, 0, 0)), Duration::hours(1));
        assert_eq!(Duration::nearest_minute(t(9, 0, 30), t(8, 0, 0)), Duration::new(1, 1));
    }

    #[test]
    fn formats_clock_strings() {
        assert_eq!(pad_time(Duration::new(9, 5)), "09:05");
        assert_eq!(Duration::new(14, 0).to_string(), "14:00");
        assert_eq!(time_to_string(t(8, 30, 45)), "08:30");
    }
}
