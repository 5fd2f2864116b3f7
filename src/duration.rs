//! Duration field parsing.
//!
//! Duration fields accept either a bare number of seconds or a duration
//! string made of `<number><unit>` groups (`90d`, `1h30m`, `3600s`, `2w`).

use std::time::Duration;

use crate::{Error, Result};

/// Smallest lifetime the upstream accepts for an issued key.
pub const MIN_LIFETIME: Duration = Duration::from_secs(1);

/// Parse a duration string.
///
/// A string made only of digits is read as seconds. Anything else goes
/// through `humantime`, which understands unit suffixes from nanoseconds
/// up to years and whitespace-free concatenations such as `1h30m`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::RequestSchema("empty duration".to_string()));
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let secs: u64 = trimmed
            .parse()
            .map_err(|e| Error::RequestSchema(format!("invalid duration '{trimmed}': {e}")))?;
        return Ok(Duration::from_secs(secs));
    }

    humantime::parse_duration(trimmed)
        .map_err(|e| Error::RequestSchema(format!("invalid duration '{trimmed}': {e}")))
}

/// Reject lifetimes shorter than [`MIN_LIFETIME`].
pub fn ensure_min_lifetime(field: &str, value: Duration) -> Result<Duration> {
    if value < MIN_LIFETIME {
        return Err(Error::RequestSchema(format!(
            "{field} must be at least 1s, got {}",
            humantime::format_duration(value)
        )));
    }
    Ok(value)
}
