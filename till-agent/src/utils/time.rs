//! Time helpers

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Format a unix-millis timestamp as `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// Out-of-range values render as an empty string so a bad payload never
/// aborts a receipt.
pub fn format_millis(ts: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(ts) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(1705912335000), "2024-01-22 08:32:15");
    }

    #[test]
    fn test_format_millis_out_of_range() {
        assert_eq!(format_millis(i64::MAX), "");
    }
}
