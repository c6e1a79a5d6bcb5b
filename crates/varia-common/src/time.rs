//! Wall-clock helpers.
//!
//! The catalog stores wall-clock seconds since the epoch. Clock
//! corrections can move these backwards; callers tolerate that.

use chrono::{Local, Timelike, Utc};

/// Current wall-clock time in seconds since the Unix epoch.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Current local hour of day, `0..=23`.
pub fn local_hour() -> u32 {
    Local::now().hour()
}
