use crate::error::ConfigError;
use chrono::{Duration, NaiveDateTime, Timelike};

/// Compute the next popup time after `from`.
///
/// Boundaries are counted from the top of the hour, so intervals that divide
/// 60 give a stable series (`:00`, `:15`, `:30`, `:45` for 15). The latest
/// boundary at or before `from` is found with seconds and sub-seconds dropped,
/// and one interval is added to it. The result is always strictly after
/// `from`, and hour/day rollover falls out of the duration arithmetic.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInterval`] when `interval_minutes` is not
/// positive, and [`ConfigError::BoundaryOutOfRange`] when the next boundary
/// cannot be represented.
pub fn next_boundary(from: NaiveDateTime, interval_minutes: i64) -> Result<NaiveDateTime, ConfigError> {
    if interval_minutes <= 0 {
        return Err(ConfigError::InvalidInterval(interval_minutes));
    }
    let out_of_range = || ConfigError::BoundaryOutOfRange {
        from,
        interval: interval_minutes,
    };

    let minute = i64::from(from.minute());
    let offset = Duration::try_minutes(minute - minute % interval_minutes).ok_or_else(out_of_range)?;
    let interval = Duration::try_minutes(interval_minutes).ok_or_else(out_of_range)?;

    from.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .and_then(|top_of_hour| top_of_hour.checked_add_signed(offset))
        .and_then(|last_boundary| last_boundary.checked_add_signed(interval))
        .ok_or_else(out_of_range)
}
