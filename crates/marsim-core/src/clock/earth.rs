//! Earth time in UTC, kept in step with Mars time by the master clock.

use core::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, TimeDelta, Utc, Weekday};

use super::ClockError;

/// Input format of Earth start times, e.g. `09/30/2043 00:00:00`.
pub const EARTH_INPUT_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Display format of Earth timestamps, e.g. `2043-Sep-30  00:00:00 (UT)`.
pub const EARTH_TIMESTAMP_FORMAT: &str = "%Y-%b-%d  %H:%M:%S (UT)";

/// Julian date at the Unix epoch.
const JULIAN_DATE_UNIX_EPOCH: f64 = 2_440_587.5;

/// Milliseconds in one day.
const MILLIS_PER_DAY: f64 = 8.64e7;

/// Leap seconds plus the TT-TAI offset, in seconds.
const TERRESTRIAL_OFFSET_SECONDS: f64 = 35.0 + 32.184;

/// Julian date (TT) of the J2000 epoch.
const J2000_JULIAN_DATE: f64 = 2_451_545.0;

/// Length of a sol in Earth days.
const EARTH_DAYS_PER_SOL: f64 = 1.027_491_252;

/// A point in Earth time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EarthClock {
    instant: DateTime<Utc>,
}

impl EarthClock {
    /// Wrap an instant.
    pub const fn from_instant(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// Parse `MM/dd/yyyy HH:mm:ss` as UTC.
    pub fn parse(input: &str) -> Result<Self, ClockError> {
        let naive = NaiveDateTime::parse_from_str(input.trim(), EARTH_INPUT_FORMAT).map_err(
            |source| ClockError::InvalidEarthTimestamp {
                input: input.to_owned(),
                source,
            },
        )?;
        Ok(Self::from_instant(naive.and_utc()))
    }

    /// The current instant.
    pub const fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Move forward by `seconds`, kept to millisecond precision.
    pub fn add_time(&mut self, seconds: f64) -> Result<(), ClockError> {
        let out_of_range = || ClockError::EarthOutOfRange { seconds };
        let step = std::time::Duration::try_from_secs_f64(seconds).map_err(|_err| out_of_range())?;
        let millis = i64::try_from(step.as_millis()).map_err(|_err| out_of_range())?;
        let delta = TimeDelta::try_milliseconds(millis).ok_or_else(out_of_range)?;
        self.instant = self.instant.checked_add_signed(delta).ok_or_else(out_of_range)?;
        Ok(())
    }

    /// Timestamp in `yyyy-MMM-dd  HH:mm:ss (UT)` form.
    pub fn timestamp(&self) -> String {
        self.instant.format(EARTH_TIMESTAMP_FORMAT).to_string()
    }

    /// The date part of [`EarthClock::timestamp`], e.g. `2043-Oct-01`.
    pub fn date_string(&self) -> String {
        let timestamp = self.timestamp();
        timestamp.get(..11).unwrap_or(&timestamp).to_owned()
    }

    /// Calendar year.
    pub fn year(&self) -> i32 {
        self.instant.year()
    }

    /// Month of the year, 1 to 12.
    pub fn month(&self) -> u32 {
        self.instant.month()
    }

    /// Day of the month, starting at 1.
    pub fn day_of_month(&self) -> u32 {
        self.instant.day()
    }

    /// Day of the week.
    pub fn weekday(&self) -> Weekday {
        self.instant.weekday()
    }

    /// Julian date in Universal Time.
    pub fn julian_date_ut(&self) -> f64 {
        // Safe: millisecond timestamps within chrono's range stay well
        // inside f64's exact integer range.
        #[allow(clippy::cast_precision_loss)]
        let millis = self.instant.timestamp_millis() as f64;
        JULIAN_DATE_UNIX_EPOCH + millis / MILLIS_PER_DAY
    }

    /// Julian date in Terrestrial Time.
    pub fn julian_date_tt(&self) -> f64 {
        self.julian_date_ut() + TERRESTRIAL_OFFSET_SECONDS / 86_400.0
    }

    /// Days since the J2000 epoch, in Terrestrial Time.
    pub fn days_since_j2000(&self) -> f64 {
        self.julian_date_tt() - J2000_JULIAN_DATE
    }

    /// Mars Sol Date: sols since midday 29 December 1873.
    pub fn mars_sol_date(&self) -> f64 {
        (self.days_since_j2000() - 4.5) / EARTH_DAYS_PER_SOL + 44_796.0 - 0.000_96
    }
}

impl fmt::Display for EarthClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.timestamp())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn one_day_later_is_the_next_date() {
        let mut clock = EarthClock::parse("09/30/2043 00:00:00").unwrap();
        assert_eq!(clock.timestamp(), "2043-Sep-30  00:00:00 (UT)");
        clock.add_time(86_400.0).unwrap();
        assert_eq!(clock.date_string(), "2043-Oct-01");
        assert_eq!(clock.month(), 10);
        assert_eq!(clock.day_of_month(), 1);
        assert_eq!(clock.weekday(), Weekday::Thu);
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(EarthClock::parse("2043-09-30").is_err());
        assert!(EarthClock::parse("13/01/2043 00:00:00").is_err());
        let mut clock = EarthClock::parse("09/30/2043 00:00:00").unwrap();
        assert!(clock.add_time(-1.0).is_err());
        assert!(clock.add_time(f64::INFINITY).is_err());
    }

    #[test]
    fn julian_dates_at_known_instants() {
        let unix = EarthClock::parse("01/01/1970 00:00:00").unwrap();
        assert!((unix.julian_date_ut() - 2_440_587.5).abs() < 1e-9);

        let j2000 = EarthClock::parse("01/01/2000 12:00:00").unwrap();
        assert!((j2000.julian_date_ut() - 2_451_545.0).abs() < 1e-9);
        assert!((j2000.days_since_j2000() - 67.184 / 86_400.0).abs() < 1e-9);

        // Midnight of 6 January 2000 is Mars Sol Date 44796 give or take.
        let msd = EarthClock::parse("01/06/2000 00:00:00").unwrap();
        assert!((msd.mars_sol_date() - 44_796.0).abs() < 1e-3);
    }
}
