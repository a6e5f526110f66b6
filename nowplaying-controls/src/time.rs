/// Formats seconds as a positional `mm:ss` countdown. Minutes are not rolled
/// into hours, negative values get a leading `-`.
pub fn format_countdown(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "00:00".to_string();
    }

    let total = seconds.abs().floor() as u64;
    let minutes = total / 60;
    let seconds_part = total % 60;
    let sign = if seconds <= -1.0 { "-" } else { "" };

    format!("{sign}{minutes:02}:{seconds_part:02}")
}

/// Time left in the entry, never below zero.
pub fn remaining_seconds(elapsed: f64, total: f64) -> f64 {
    (total - elapsed).max(0.0)
}
