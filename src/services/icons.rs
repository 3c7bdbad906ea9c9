//! WMO weather interpretation code → display glyph.
//!
//! Code table: https://open-meteo.com/en/docs (WMO Weather interpretation codes, WW)

/// Glyph for codes outside the WMO table.
pub const UNKNOWN_ICON: &str = "❓";

/// Glyph for a WMO weather code. Never fails: unmapped codes get [`UNKNOWN_ICON`].
pub fn weather_icon(code: i32) -> &'static str {
    match code {
        0 => "☀️",
        1 => "🌤",
        2 => "⛅",
        3 => "☁️",
        45 | 48 => "🌫",
        51 | 53 => "🌦",
        55 => "🌧",
        56 | 57 => "🌧❄️",
        61 | 63 => "🌧",
        65 => "🌧🌧",
        66 | 67 => "🌧❄️",
        71 | 73 => "🌨",
        75 => "🌨❄️",
        77 => "❄️",
        80 => "🌦",
        81 => "🌧",
        82 => "🌧🌧",
        85 => "🌨",
        86 => "🌨❄️",
        95 => "⛈",
        96 | 99 => "⛈🧊",
        _ => UNKNOWN_ICON,
    }
}
