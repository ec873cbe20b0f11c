use chrono::{DateTime, NaiveDateTime, Utc};

use crate::tracker::TrackerError;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TrackerError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TrackerError::InvalidTimestamp(value.to_string()))
}

/// Track names look like `<prefix>_<channel>`.
pub fn channel_from_track_name(track_name: &str) -> &str {
    track_name.split('_').nth(1).unwrap_or(track_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_offset_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2017, 6, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2017-06-01T12:30:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2017-06-01T14:30:00+02:00").unwrap(),
            expected
        );
        assert_eq!(parse_timestamp("2017-06-01T12:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2017-06-01 12:30:00.000").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(TrackerError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn channel_is_second_token_of_track_name() {
        assert_eq!(channel_from_track_name("20170601A_EV1"), "EV1");
        assert_eq!(channel_from_track_name("a_b_c"), "b");
        assert_eq!(channel_from_track_name("rover1"), "rover1");
    }
}
