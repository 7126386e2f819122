//! Real-time clock
//!
//! Calendar time as reported by the board RTC, plus the `Clock` capability
//! the logger and protocol engine read it through.

use std::cell::Cell;
use std::fmt;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Wall-clock time with one-second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarTime {
    /// Four-digit year
    pub year: u16,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
    /// 0-59
    pub second: u8,
}

impl CalendarTime {
    /// Create a calendar time from its components
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Date in the unpadded `M/D/YYYY` form used in records and the info file
    pub fn date_string(&self) -> String {
        format!("{}/{}/{}", self.month, self.day, self.year)
    }

    /// Time in the unpadded `H:M:S` form used in records
    pub fn time_string(&self) -> String {
        format!("{}:{}:{}", self.hour, self.minute, self.second)
    }
}

impl From<NaiveDateTime> for CalendarTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year().clamp(0, u16::MAX as i32) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        }
    }
}

impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Source of the current calendar time
pub trait Clock {
    /// Current calendar time
    fn now(&self) -> CalendarTime;
}

/// Clock backed by the host's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> CalendarTime {
        CalendarTime::from(Local::now().naive_local())
    }
}

/// Clock that only moves when told to
///
/// Interior mutability lets tests adjust the time while the clock is held
/// inside a `DeviceContext`.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Cell<CalendarTime>,
}

impl ManualClock {
    /// Clock stopped at `start`
    pub fn new(start: CalendarTime) -> Self {
        Self {
            current: Cell::new(start),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, time: CalendarTime) {
        self.current.set(time);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> CalendarTime {
        self.current.get()
    }
}
