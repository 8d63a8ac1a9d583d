//! Timestamp formatting utilities
//!
//! Layouts render time in one fixed, non-localized form:
//!
//! ```text
//! DD-MM at HHh MMm SSs
//! ```
//!
//! e.g. `05-03 at 07h 02m 09s`. Log readers and tests match on this byte-for-byte,
//! so it does not follow the host locale.

use chrono::{DateTime, Datelike, Local, Timelike};
use std::fmt::Write;
use std::sync::OnceLock;

static START_TIME: OnceLock<DateTime<Local>> = OnceLock::new();

/// Append `time` to `output` in the `DD-MM at HHh MMm SSs` form.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use micrologger::core::timestamp::format_into;
///
/// let time = NaiveDate::from_ymd_opt(2024, 3, 5)
///     .unwrap()
///     .and_hms_opt(7, 2, 9)
///     .unwrap();
/// let mut out = String::new();
/// format_into(&mut out, &time);
/// assert_eq!(out, "05-03 at 07h 02m 09s");
/// ```
pub fn format_into<T: Datelike + Timelike>(output: &mut String, time: &T) {
    // Writing into a String cannot fail.
    let _ = write!(
        output,
        "{:02}-{:02} at {:02}h {:02}m {:02}s",
        time.day(),
        time.month(),
        time.hour(),
        time.minute(),
        time.second()
    );
}

#[must_use]
pub fn format<T: Datelike + Timelike>(time: &T) -> String {
    let mut output = String::with_capacity(20);
    format_into(&mut output, time);
    output
}

/// Local wall-clock time.
#[inline]
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Time the logging system was first touched in this process.
///
/// Captured once and never changes; `$starttime` file layouts rely on that to keep
/// pointing at the same file for the whole run.
pub fn process_start_time() -> DateTime<Local> {
    *START_TIME.get_or_init(Local::now)
}
