//! Human-readable sizes and durations for reports.

use std::time::Duration;

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Formats a byte count with binary units, e.g. `1.50 KB`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Formats a duration as milliseconds below one second, seconds below a
/// minute, and `Xm YYs` above.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        0 => format!("{}ms", d.as_millis()),
        1..60 => format!("{:.1}s", d.as_secs_f64()),
        _ => format!("{}m {:02}s", secs / 60, secs % 60),
    }
}
