//! Fixed-offset wall-clock timestamps for log records.
//!
//! Log files are read by people, so every record carries a local
//! `DD-MM-YYYY HH:mm:ss` stamp. The offset is a plain number of minutes east
//! of UTC — no timezone database, no DST rules.

use chrono::{DateTime, TimeDelta, Utc};

/// Offset used when none is configured: UTC+05:30.
pub const DEFAULT_OFFSET_MINUTES: i32 = 330;

/// Renders `instant` shifted by `offset_minutes` as `DD-MM-YYYY HH:mm:ss`.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
///
/// let instant = Utc.with_ymd_and_hms(2024, 1, 31, 20, 0, 5).unwrap();
/// assert_eq!(kiroku::timestamp::format(instant, 330), "01-02-2024 01:30:05");
/// ```
pub fn format(instant: DateTime<Utc>, offset_minutes: i32) -> String {
    let local = instant.naive_utc() + TimeDelta::minutes(i64::from(offset_minutes));
    local.format("%d-%m-%Y %H:%M:%S").to_string()
}

/// Renders an offset as `UTC+HH:MM` for banners.
pub(crate) fn offset_label(offset_minutes: i32) -> String {
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let abs = offset_minutes.unsigned_abs();
    format!("UTC{sign}{:02}:{:02}", abs / 60, abs % 60)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn zero_pads_every_field() {
        let instant = Utc.with_ymd_and_hms(2023, 3, 4, 1, 2, 3).unwrap();
        assert_eq!(format(instant, 0), "04-03-2023 01:02:03");
    }

    #[test]
    fn positive_offset_rolls_over_midnight() {
        let instant = Utc.with_ymd_and_hms(2023, 12, 31, 22, 45, 0).unwrap();
        assert_eq!(format(instant, 330), "01-01-2024 04:15:00");
    }

    #[test]
    fn negative_offset_goes_back_a_day() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap();
        assert_eq!(format(instant, -300), "29-02-2024 21:00:00");
    }

    #[test]
    fn offset_label_signs() {
        assert_eq!(offset_label(330), "UTC+05:30");
        assert_eq!(offset_label(-90), "UTC-01:30");
        assert_eq!(offset_label(0), "UTC+00:00");
    }
}
