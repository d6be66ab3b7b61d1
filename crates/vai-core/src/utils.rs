use chrono::{DateTime, Utc};

// ============== Timestamp Helpers ==============

/// Convert API epoch seconds to a UTC datetime.
pub fn epoch_to_utc(ts: f64) -> Option<DateTime<Utc>> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.floor() as i64;
    let nanos = ((ts - ts.floor()) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
}

/// `YYYY-MM-DD HH:MM:SS UTC`, or the raw number when out of range.
pub fn format_epoch(ts: f64) -> String {
    match epoch_to_utc(ts) {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => ts.to_string(),
    }
}

/// Relative time rounded to the minute ("just now", "5 minutes ago", "3 days ago").
pub fn time_ago(ts: f64, now: DateTime<Utc>) -> String {
    let Some(t) = epoch_to_utc(ts) else {
        return ts.to_string();
    };
    let secs = (now - t).num_seconds();
    if secs < 0 {
        return "in the future".to_string();
    }

    let minutes = (secs as f64 / 60.0).round() as i64;
    let (n, unit) = if minutes < 1 {
        return "just now".to_string();
    } else if minutes < 60 {
        (minutes, "minute")
    } else if minutes < 60 * 24 {
        (minutes / 60, "hour")
    } else if minutes < 60 * 24 * 30 {
        (minutes / (60 * 24), "day")
    } else if minutes < 60 * 24 * 365 {
        (minutes / (60 * 24 * 30), "month")
    } else {
        (minutes / (60 * 24 * 365), "year")
    };

    let plural = if n == 1 { "" } else { "s" };
    format!("{n} {unit}{plural} ago")
}

// ============== Text Helpers ==============

/// Cut `text` to at most `max` chars, marking the cut with `...`.
pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_fractional_epoch() {
        assert_eq!(format_epoch(1_704_067_200.75), "2024-01-01 00:00:00 UTC");
        assert_eq!(format_epoch(f64::NAN), "NaN");
    }

    #[test]
    fn time_ago_rounds_to_minutes() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ts = |secs_before: i64| (now.timestamp() - secs_before) as f64;

        assert_eq!(time_ago(ts(10), now), "just now");
        assert_eq!(time_ago(ts(90), now), "2 minutes ago");
        assert_eq!(time_ago(ts(3600), now), "1 hour ago");
        assert_eq!(time_ago(ts(3 * 86_400), now), "3 days ago");
        assert_eq!(time_ago(ts(-60), now), "in the future");
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
