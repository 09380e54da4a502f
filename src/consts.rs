//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};

/// Default Gemini model when none is specified.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Sessions untouched for this long are eligible for eviction.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How often the session sweep runs.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// The kitchen runs on a single fixed civil timezone (IST, +05:30).
/// All cutoff math happens in this offset.
pub fn kitchen_tz() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("valid offset")
}

/// Breakfast and lunch close at 21:30 the evening before the target date.
pub fn evening_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(21, 30, 0).expect("valid time")
}

/// Same-day dinner closes at 12:30.
pub fn midday_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 30, 0).expect("valid time")
}

/// Default database path: `~/.tiffin/tiffin.db`.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .expect("cannot determine home directory")
        .join(".tiffin")
        .join("tiffin.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kitchen_tz_is_ist() {
        assert_eq!(kitchen_tz().local_minus_utc(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn cutoffs_are_ordered() {
        assert!(midday_cutoff() < evening_cutoff());
    }

    #[test]
    fn session_ttl_is_a_day() {
        assert_eq!(SESSION_TTL.as_secs(), 86_400);
    }
}
