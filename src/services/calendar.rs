//! Calendar helpers and the clock abstraction.
//!
//! All day and month boundaries are computed in the time zone carried by the
//! `DateTime` passed in, so callers choose the zone by choosing the clock.

use chrono::{DateTime, Datelike, Days, Local, LocalResult, NaiveDate, TimeZone, Utc};

/// Source of the current instant and of the local time zone.
pub trait Clock: Send + Sync + 'static {
    type Tz: TimeZone + Send + Sync;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall clock in the system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone)]
pub struct FixedClock<Tz: TimeZone>(pub DateTime<Tz>);

impl<Tz> Clock for FixedClock<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    type Tz = Tz;

    fn now(&self) -> DateTime<Tz> {
        self.0.clone()
    }
}

/// Midnight at the start of `date` in `tz`.
///
/// When midnight does not exist (a DST gap), the earliest instant of the day
/// after the gap is used.
fn midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Step forward by the hour until the local clock exists again.
            (1..=24)
                .filter_map(|h| {
                    tz.from_local_datetime(&(naive + chrono::Duration::hours(h)))
                        .earliest()
                })
                .next()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

/// Start of the local calendar day containing `date`.
pub fn start_of_day<Tz: TimeZone>(date: &DateTime<Tz>) -> DateTime<Utc> {
    midnight(&date.timezone(), date.date_naive())
}

/// Start of the local calendar month containing `date`.
pub fn start_of_month<Tz: TimeZone>(date: &DateTime<Tz>) -> DateTime<Utc> {
    let local = date.date_naive();
    let first = local.with_day(1).unwrap_or(local);
    midnight(&date.timezone(), first)
}

/// Start of the local calendar day containing `date`, in epoch milliseconds.
pub fn start_of_day_timestamp<Tz: TimeZone>(date: &DateTime<Tz>) -> i64 {
    start_of_day(date).timestamp_millis()
}

/// Start of the local calendar month containing `date`, in epoch milliseconds.
pub fn start_of_month_timestamp<Tz: TimeZone>(date: &DateTime<Tz>) -> i64 {
    start_of_month(date).timestamp_millis()
}

/// The calendar day before the one containing `date`.
pub fn previous_day<Tz: TimeZone>(date: &DateTime<Tz>) -> NaiveDate {
    let today = date.date_naive();
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

pub fn is_same_day<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.date_naive() == b.date_naive()
}

pub fn is_same_month<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}
