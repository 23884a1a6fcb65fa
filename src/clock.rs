//! Timestamp rendering shared by snapshots, startup records and reports.

use chrono::{DateTime, Local, Utc};
use mockable::Clock;

/// Human-readable timestamp layout: `HH:MM:SS - DD-MM-YYYY`, local time.
pub const DISPLAY_FORMAT: &str = "%H:%M:%S - %d-%m-%Y";

/// Formats an instant in the display layout.
#[must_use]
pub fn format_display(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format(DISPLAY_FORMAT)
        .to_string()
}

/// Formats the clock's current time in the display layout.
#[must_use]
pub fn display_now(clock: &impl Clock) -> String {
    format_display(clock.utc())
}
