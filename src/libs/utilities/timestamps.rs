use chrono::Duration;

/// Converts a Chrono `Duration` into a short human-readable string, picking the
/// largest whole unit: hours, minutes, then seconds.
pub fn format_duration(duration: &Duration) -> String {
    if duration.num_hours() > 0 {
        format!(
            "{} hours {} minutes",
            duration.num_hours(),
            duration.num_minutes() % 60
        )
    } else if duration.num_minutes() > 0 {
        format!(
            "{} minutes {} seconds",
            duration.num_minutes(),
            duration.num_seconds() % 60
        )
    } else {
        format!("{} seconds", duration.num_seconds().max(0))
    }
}
