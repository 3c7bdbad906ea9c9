//! Shared number formatting for map labels and file listings.
//!
//! Readings print the way the forecast feed writes them: whole numbers keep a
//! trailing `.0` (`25.0`), everything else uses the shortest round-trip form
//! (`23.4`).

/// Format a forecast reading for a label line.
pub(crate) fn format_reading(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Round to 2 decimal places (file sizes in KiB).
pub(crate) fn round_2dp(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
