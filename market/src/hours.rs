//! Market-hours gate.
//!
//! Deliberately pure: no async, no IO, no wall-clock reads. The
//! caller passes the timestamp in, so the gate is testable without
//! clock mocking.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};

const OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 17, 0) {
    Some(t) => t,
    None => unreachable!(),
};

const CLOSE: NaiveTime = match NaiveTime::from_hms_opt(15, 15, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// Should a poll cycle run at `now` (local exchange time)?
///
/// Open Mon–Fri within the 09:17–15:15 window (inclusive).
/// `bypass` short-circuits to open, for off-hours testing against a
/// mock feed.
pub fn market_open(now: NaiveDateTime, bypass: bool) -> bool {
    if bypass {
        return true;
    }

    match now.weekday() {
        Weekday::Sat | Weekday::Sun => return false,
        _ => {}
    }

    let t = now.time();
    t >= OPEN && t <= CLOSE
}
