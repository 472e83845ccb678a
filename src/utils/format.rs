//! Time formatting for player labels

/// Format a millisecond position as `m:ss` (or `h:mm:ss` past an hour).
///
/// Negative and non-finite inputs render as `0:00`.
pub fn format_timestamp(ms: f64) -> String {
    let total_secs = if ms.is_finite() && ms > 0.0 {
        (ms / 1000.0).floor() as u64
    } else {
        0
    };

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(5_400.0), "0:05");
        assert_eq!(format_timestamp(120_000.0), "2:00");
        assert_eq!(format_timestamp(3_725_000.0), "1:02:05");
    }

    #[test]
    fn test_format_timestamp_degenerate() {
        assert_eq!(format_timestamp(-10.0), "0:00");
        assert_eq!(format_timestamp(f64::NAN), "0:00");
        assert_eq!(format_timestamp(f64::INFINITY), "0:00");
    }
}
