//! Deterministic target-date resolution.
//!
//! An explicit date from the extractor wins. Failing that, "today" and
//! "tomorrow" cues in the message text are resolved against the arrival
//! instant. Anything else stays ambiguous and ends in a clarification.

use chrono::{Days, NaiveDate};

use crate::desk::OrderError;

/// Resolve the target date. `Ok(None)` means ambiguous; a present but
/// malformed explicit date is a validation error.
pub fn resolve(
    explicit: Option<&str>,
    text: &str,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, OrderError> {
    if let Some(raw) = explicit {
        let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| OrderError::Validation(format!("cannot understand date: {raw}")))?;
        return Ok(Some(date));
    }

    let lower = text.to_lowercase();
    if lower.contains("tomorrow") {
        return Ok(Some(today + Days::new(1)));
    }
    if lower.contains("today") || lower.contains("tonight") {
        return Ok(Some(today));
    }

    Ok(None)
}
