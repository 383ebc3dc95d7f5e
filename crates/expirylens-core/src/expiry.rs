//! Expiry verdicts: how far a parsed date lies from "now".

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone};

use crate::date::ParsedDate;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Signed whole-day distance from now to a date, and whether it has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryVerdict {
    pub is_expired: bool,
    /// Negative once the date is in the past.
    pub days_diff: i64,
}

impl ExpiryVerdict {
    pub fn from_days(days_diff: i64) -> Self {
        Self {
            is_expired: days_diff < 0,
            days_diff,
        }
    }

    pub fn status(&self) -> &'static str {
        if self.is_expired {
            "EXPIRED"
        } else {
            "NOT EXPIRED"
        }
    }

    /// "N days ago" when expired, "N days remaining" otherwise.
    pub fn time_text(&self) -> String {
        if self.is_expired {
            format!("{} days ago", self.days_diff.abs())
        } else {
            format!("{} days remaining", self.days_diff)
        }
    }
}

/// Compare local midnight of `date` against `now`.
///
/// `now` keeps its time of day, so on the expiry day itself the result is
/// `-1` (expired) from the first millisecond after midnight onwards. The
/// millisecond difference is floor-divided, never truncated toward zero.
pub fn evaluate<Tz: TimeZone>(date: &ParsedDate, now: &DateTime<Tz>) -> ExpiryVerdict {
    let midnight = local_midnight(date.to_calendar_date(), &now.timezone());
    let ms = (midnight - now.clone()).num_milliseconds();
    ExpiryVerdict::from_days(ms.div_euclid(MS_PER_DAY))
}

/// Start of `day` in `tz`. Ambiguous midnights take the earlier instant; a
/// midnight skipped by a DST jump moves to the first hour after the gap.
fn local_midnight<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let midnight = day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + TimeDelta::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}
