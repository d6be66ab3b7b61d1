use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};

use crate::errors::Error;

/// How far back a range may reach.
pub const MAX_LOOKBACK_MONTHS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangePreset {
    Week,
    Month,
    Quarter,
}

impl FromStr for RangePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" | "1 week" | "1w" => Ok(RangePreset::Week),
            "month" | "1 month" | "1m" => Ok(RangePreset::Month),
            "quarter" | "3 months" | "3m" => Ok(RangePreset::Quarter),
            other => Err(Error::Config(format!("unknown range preset: {other}"))),
        }
    }
}

/// Inclusive time window for range queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Window ending at `now`. A week spans today plus the six days before.
    pub fn preset(preset: RangePreset, now: DateTime<Utc>) -> Self {
        let start = match preset {
            RangePreset::Week => now - Duration::days(6),
            RangePreset::Month => months_before(now, 1),
            RangePreset::Quarter => months_before(now, 3),
        };
        Self { start, end: now }
    }

    pub fn oldest_allowed(now: DateTime<Utc>) -> DateTime<Utc> {
        months_before(now, MAX_LOOKBACK_MONTHS)
    }

    /// Move one edge of the window to `date`.
    ///
    /// `date` is first clamped to `[now - 3 months, now]`. A date before the
    /// window moves the start, one after it moves the end, and one inside it
    /// moves whichever edge is closer (the end on a tie).
    pub fn select(self, date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let date = date.clamp(Self::oldest_allowed(now), now);

        if date < self.start {
            return Self { start: date, ..self };
        }
        if date > self.end {
            return Self { end: date, ..self };
        }

        let start_diff = (date - self.start).num_milliseconds().abs();
        let end_diff = (self.end - date).num_milliseconds().abs();
        if start_diff < end_diff {
            Self { start: date, ..self }
        } else {
            Self { end: date, ..self }
        }
    }

    /// Apply several picks in order, as successive calendar clicks would.
    pub fn select_all(
        self,
        dates: impl IntoIterator<Item = DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        dates.into_iter().fold(self, |range, date| range.select(date, now))
    }
}

fn months_before(t: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    t.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
