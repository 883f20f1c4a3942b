//! Storage accounting helpers.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with binary units and one decimal place.
///
/// Values past the largest unit stay in GB.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    // Compare the rounded value so 1023.96 KB shows as 1.0 MB, not 1024.0 KB.
    while round_tenth(size) >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0.0 B");
        assert_eq!(format_size(1023), "1023.0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_format_size_rounds_into_next_unit() {
        assert_eq!(format_size(1_048_575), "1.0 MB");
        assert_eq!(format_size(1_048_524), "1023.9 KB");
        assert_eq!(format_size(1024 * 1024 * 1024 - 1), "1.0 GB");
    }

    #[test]
    fn test_format_size_caps_at_gb() {
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048.0 GB");
    }
}
