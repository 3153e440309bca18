//! Device timestamp encoding
//!
//! Terminals do not use Unix time. A civil date-time is packed into a `u32`
//! as a mixed-radix number, most significant field first:
//!
//! ```text
//! n = ((((year - 2000) * 12 + (month - 1)) * 31 + (day - 1)) * 24 + hour) * 60 + minute) * 60 + second
//! ```
//!
//! Every month is 31 days wide, so the packing is not calendar arithmetic and
//! can represent dates such as February 31st. [`DeviceTime`] keeps the raw
//! fields so decoding never fails; conversion to `chrono` is checked.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

const BASE_YEAR: u32 = 2000;

/// Civil time as stored on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DeviceTime {
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

    /// Pack into the device's `u32` representation
    ///
    /// Meaningful for years 2000..=2099 and in-range fields; out-of-range
    /// input wraps rather than panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use zkbio_types::DeviceTime;
    ///
    /// let t = DeviceTime::new(2020, 5, 17, 13, 45, 30);
    /// assert_eq!(t.encode(), 654_961_530);
    /// assert_eq!(DeviceTime::decode(654_961_530), t);
    /// ```
    pub fn encode(&self) -> u32 {
        let year = u32::from(self.year).wrapping_sub(BASE_YEAR);
        let month = u32::from(self.month).wrapping_sub(1);
        let day = u32::from(self.day).wrapping_sub(1);

        let mut n = year.wrapping_mul(12).wrapping_add(month);
        n = n.wrapping_mul(31).wrapping_add(day);
        n = n.wrapping_mul(24).wrapping_add(u32::from(self.hour));
        n = n.wrapping_mul(60).wrapping_add(u32::from(self.minute));
        n.wrapping_mul(60).wrapping_add(u32::from(self.second))
    }

    /// Unpack from the device's `u32` representation
    pub fn decode(mut n: u32) -> Self {
        let second = (n % 60) as u8;
        n /= 60;
        let minute = (n % 60) as u8;
        n /= 60;
        let hour = (n % 24) as u8;
        n /= 24;
        let day = (n % 31) as u8 + 1;
        n /= 31;
        let month = (n % 12) as u8 + 1;
        n /= 12;

        Self {
            year: (BASE_YEAR + n) as u16,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Convert to a `chrono` date-time, `None` if the fields name no real instant
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))?
            .and_hms_opt(
                u32::from(self.hour),
                u32::from(self.minute),
                u32::from(self.second),
            )
    }
}

impl From<NaiveDateTime> for DeviceTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year().clamp(0, i32::from(u16::MAX)) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        }
    }
}

impl fmt::Display for DeviceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
