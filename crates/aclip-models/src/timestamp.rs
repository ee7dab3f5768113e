//! Timestamp parsing and formatting utilities.
//!
//! AI responses and subtitle files carry timestamps in a mix of formats
//! (HH:MM:SS, MM:SS, plain seconds); this module normalizes them all to
//! float seconds and formats seconds back into human-readable labels.

/// Parse a timestamp string to total seconds.
///
/// Supports formats:
/// - `HH:MM:SS` or `HH:MM:SS.mmm`
/// - `MM:SS` or `MM:SS.mmm`
/// - `SS` or `SS.mmm`
///
/// # Examples
/// ```
/// use aclip_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("1:30").unwrap(), 90.0);
/// assert_eq!(parse_timestamp("475").unwrap(), 475.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let mut components = Vec::with_capacity(parts.len());
    for (idx, part) in parts.iter().enumerate() {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(idx, part.to_string()))?;
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        components.push(value);
    }

    match components.as_slice() {
        [secs] => Ok(*secs),
        [mins, secs] => Ok(mins * 60.0 + secs),
        [hours, mins, secs] => Ok(hours * 3600.0 + mins * 60.0 + secs),
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

/// Format seconds into an `HH:MM:SS` string.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = (total_secs % 60.0).floor() as u32;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Format seconds into the short `M:SS` label used in logs and summaries.
pub fn format_duration(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0).round() as u64;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,
    #[error("timestamp has a negative component")]
    Negative,
    #[error("invalid value in timestamp component {0}: {1}")]
    InvalidValue(usize, String),
    #[error("invalid timestamp format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_hh_mm_ss() {
        assert_eq!(parse_timestamp("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_timestamp("00:01:00").unwrap(), 60.0);
        assert_eq!(parse_timestamp("01:30:45").unwrap(), 5445.0);
    }

    #[test]
    fn test_parse_timestamp_mm_ss() {
        assert_eq!(parse_timestamp("1:30").unwrap(), 90.0);
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("53:53").unwrap(), 3233.0);
    }

    #[test]
    fn test_parse_timestamp_plain_seconds() {
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert_eq!(parse_timestamp("0").unwrap(), 0.0);
        assert_eq!(parse_timestamp("12.5").unwrap(), 12.5);
    }

    #[test]
    fn test_parse_timestamp_with_milliseconds() {
        let result = parse_timestamp("00:00:30.500").unwrap();
        assert!((result - 30.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert!(matches!(parse_timestamp(""), Err(TimestampError::Empty)));
        assert!(matches!(parse_timestamp("  "), Err(TimestampError::Empty)));
        assert!(matches!(
            parse_timestamp("abc"),
            Err(TimestampError::InvalidValue(_, _))
        ));
        assert!(matches!(
            parse_timestamp("-5"),
            Err(TimestampError::Negative)
        ));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(90.0), "00:01:30");
        assert_eq!(format_seconds(3661.0), "01:01:01");
    }

    #[test]
    fn test_format_duration_label() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(45.0), "0:45");
        assert_eq!(format_duration(90.0), "1:30");
        assert_eq!(format_duration(605.4), "10:05");
    }
}
