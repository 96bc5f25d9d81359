//! Object key generation for recorded clips.
//!
//! Keys are the capture timestamp printed seconds-first
//! (`SSMMHHddmmYYYY.mp4`), so consecutive recordings scatter across the
//! bucket keyspace instead of forming one hot lexicographic run.

use chrono::{DateTime, TimeZone};

/// Generate the object key for a clip captured at `taken_at`.
pub fn clip_key<Tz: TimeZone>(taken_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}.mp4", taken_at.format("%S%M%H%d%m%Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn seconds_lead_the_key() {
        let taken_at = Utc.with_ymd_and_hms(2016, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(clip_key(&taken_at), "05040302012016.mp4");
    }

    #[test]
    fn same_minute_captures_differ() {
        let first = Utc.with_ymd_and_hms(2016, 1, 2, 3, 4, 5).unwrap();
        let second = Utc.with_ymd_and_hms(2016, 1, 2, 3, 4, 6).unwrap();
        assert_ne!(clip_key(&first), clip_key(&second));
    }
}
