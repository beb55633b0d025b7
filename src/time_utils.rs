//! Epoch arithmetic shared by the planner, the poller and point validation.
//!
//! The charting engine speaks seconds for request windows and drawing points
//! and milliseconds for bar timestamps; everything here is `i64` so negative
//! offsets stay representable.

pub const MINUTE_SECS: i64 = 60;
pub const HOUR_SECS: i64 = 60 * MINUTE_SECS;
pub const DAY_SECS: i64 = 24 * HOUR_SECS;
pub const YEAR_SECS: i64 = 365 * DAY_SECS;

pub fn secs_to_millis(secs: i64) -> i64 {
    secs.saturating_mul(1000)
}

pub fn millis_to_secs(millis: i64) -> i64 {
    millis.div_euclid(1000)
}

/// Render an epoch-seconds value as `YYYY-MM-DD HH:MM:SS` (UTC) for log lines.
pub fn format_utc(secs: i64) -> String {
    let days = secs.div_euclid(DAY_SECS);
    let rem = secs.rem_euclid(DAY_SECS);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        rem / HOUR_SECS,
        (rem % HOUR_SECS) / MINUTE_SECS,
        rem % MINUTE_SECS
    )
}

// Howard Hinnant's days-to-civil conversion.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    (if m <= 2 { y + 1 } else { y }, m, d)
}
