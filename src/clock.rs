/*!
 * Clock
 *
 * An injectable time source. Every component that needs "now" — same-day
 * cutoff checks, `past` slot classification, row timestamps — takes a
 * `&dyn Clock` rather than calling `Utc::now()` directly, so tests stay
 * deterministic without sleeping or reaching for a mocking framework.
 */

use chrono::{DateTime, NaiveDate, Timelike, Utc};

/// A source of the current instant, local calendar date, and local minute-of-day.
///
/// The production implementation reads the real wall clock; tests use a fixed
/// instant so booking-window and "is this slot in the past" assertions don't
/// depend on when the test suite happens to run.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Today's date, local time.
    fn today(&self) -> NaiveDate {
        self.now_utc().date_naive()
    }

    /// Minutes since local midnight for the current instant.
    fn now_minutes(&self) -> u16 {
        let t = self.now_utc().time();
        (t.hour() * 60 + t.minute()) as u16
    }
}

/// Production clock backed by the real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test double returning a fixed instant, for deterministic unit tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// Builds a fixed clock at the given local date and minutes-since-midnight.
    pub fn at(date: NaiveDate, minutes: u16) -> Self {
        let time = chrono::NaiveTime::from_hms_opt(
            (minutes / 60) as u32,
            (minutes % 60) as u32,
            0,
        )
        .expect("minutes within a day");
        Self {
            instant: DateTime::from_naive_utc_and_offset(date.and_time(time), Utc),
        }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.instant
    }
}
