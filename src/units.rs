//! Unit conversions and display formatting.

/// Convert a speed in meters/second to kilometers/hour.
///
/// # Example
/// ```
/// use track_insights::units::ms_to_km;
/// assert_eq!(ms_to_km(1000.0), 3600.0);
/// ```
#[inline]
pub fn ms_to_km(ms: f64) -> f64 {
    ms * (60.0 * 60.0) / 1000.0
}

/// Format a duration in seconds as `HH:MM:SS`.
///
/// Reads as a time of day: hours wrap at 24, so a 25 hour activity prints `01:00:00`.
/// Fractional seconds are truncated; negative or non-finite input reads as zero.
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        (total / 3600) % 24,
        (total % 3600) / 60,
        total % 60
    )
}

/// Round to two decimal places.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_km() {
        assert_eq!(ms_to_km(0.0), 0.0);
        assert_eq!(ms_to_km(1000.0), 3600.0);
        assert!((ms_to_km(2.5) - 9.0).abs() < 1e-12);
        assert!((ms_to_km(-1.0) + 3.6).abs() < 1e-12);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0.0), "00:00:00");
        assert_eq!(format_hms(59.9), "00:00:59");
        assert_eq!(format_hms(3661.0), "01:01:01");
        assert_eq!(format_hms(86_399.0), "23:59:59");
        assert_eq!(format_hms(86_400.0), "00:00:00");
        assert_eq!(format_hms(90_000.0), "01:00:00");
        assert_eq!(format_hms(-5.0), "00:00:00");
        assert_eq!(format_hms(f64::NAN), "00:00:00");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round2(-3.001), -3.0);
        assert_eq!(round2(7.0), 7.0);
    }
}
