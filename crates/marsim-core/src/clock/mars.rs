//! Mars time on the Darian calendar.
//!
//! An orbit has 24 months. Months 6, 12, 18 and 24 have 27 sols, the rest
//! 28. In a leap orbit month 24 gains a sol; odd orbits and every tenth
//! orbit are leap orbits, giving 668 or 669 sols per orbit.
//!
//! The clock stores sols since the calendar epoch (orbit 0, month 1, sol 1)
//! plus the time of day, and derives the calendar date on demand.

use core::fmt;

use super::ClockError;

/// Millisols in one sol.
pub const MILLISOLS_PER_SOL: f64 = 1000.0;

/// Months in one orbit.
pub const MONTHS_PER_ORBIT: u32 = 24;

/// Darian month names, month 1 first.
pub const MONTH_NAMES: [&str; 24] = [
    "Adir", "Bora", "Coan", "Deti", "Edal", "Flo", "Geor", "Heliba", "Idanon", "Jowani", "Kireal",
    "Larno", "Medior", "Neturima", "Ozulikan", "Pasurabi", "Rudiakel", "Safundo", "Tiunor",
    "Ulasja", "Vadeun", "Wakumi", "Xetual", "Zungo",
];

/// Whether an orbit carries the extra sol.
pub const fn is_leap_orbit(orbit: u32) -> bool {
    matches!(orbit.checked_rem(2), Some(1)) || matches!(orbit.checked_rem(10), Some(0))
}

/// Sols in an orbit.
pub const fn sols_in_orbit(orbit: u32) -> u32 {
    if is_leap_orbit(orbit) { 669 } else { 668 }
}

/// Sols in a month (1 to 24) of an orbit.
pub const fn sols_in_month(month: u32, orbit: u32) -> u32 {
    if month == MONTHS_PER_ORBIT && is_leap_orbit(orbit) {
        28
    } else if matches!(month.checked_rem(6), Some(0)) {
        27
    } else {
        28
    }
}

/// Calendar position derived from a sol count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CalendarDate {
    orbit: u32,
    month: u32,
    sol: u32,
}

impl CalendarDate {
    fn from_total_sols(total: u64) -> Self {
        let mut remaining = total;
        let mut orbit = 0_u32;
        loop {
            let length = u64::from(sols_in_orbit(orbit));
            if remaining < length || orbit == u32::MAX {
                break;
            }
            remaining = remaining.saturating_sub(length);
            orbit = orbit.saturating_add(1);
        }

        let mut month = 1_u32;
        loop {
            let length = u64::from(sols_in_month(month, orbit));
            if remaining < length || month >= MONTHS_PER_ORBIT {
                break;
            }
            remaining = remaining.saturating_sub(length);
            month = month.saturating_add(1);
        }

        let sol = u32::try_from(remaining).unwrap_or(u32::MAX).saturating_add(1);
        Self { orbit, month, sol }
    }

    fn total_sols(self) -> u64 {
        let orbits: u64 = (0..self.orbit).map(|orbit| u64::from(sols_in_orbit(orbit))).sum();
        let months: u64 = (1..self.month)
            .map(|month| u64::from(sols_in_month(month, self.orbit)))
            .sum();
        orbits
            .saturating_add(months)
            .saturating_add(u64::from(self.sol.saturating_sub(1)))
    }
}

/// A point in Mars time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarsClock {
    total_sols: u64,
    millisol: f64,
}

impl MarsClock {
    /// The calendar epoch: `00-Adir-01:000.000`.
    pub const fn epoch() -> Self {
        Self {
            total_sols: 0,
            millisol: 0.0,
        }
    }

    /// Build a clock from calendar fields.
    pub fn from_date(orbit: u32, month: u32, sol: u32, millisol: f64) -> Result<Self, ClockError> {
        let invalid = |reason: String| ClockError::InvalidMarsDate {
            orbit,
            month,
            sol,
            reason,
        };
        if !(1..=MONTHS_PER_ORBIT).contains(&month) {
            return Err(invalid("month must be 1 to 24".to_owned()));
        }
        let length = sols_in_month(month, orbit);
        if !(1..=length).contains(&sol) {
            return Err(invalid(format!("month {month} has {length} sols")));
        }
        if !(0.0..MILLISOLS_PER_SOL).contains(&millisol) {
            return Err(invalid(format!("millisol {millisol} is outside 0 to 1000")));
        }
        let date = CalendarDate { orbit, month, sol };
        Ok(Self {
            total_sols: date.total_sols(),
            millisol,
        })
    }

    /// Parse `orbit-Month-sol:millisol`, e.g. `15-Adir-01:000.000`.
    pub fn parse(timestamp: &str) -> Result<Self, ClockError> {
        let invalid = |reason: &str| ClockError::InvalidMarsTimestamp {
            input: timestamp.to_owned(),
            reason: reason.to_owned(),
        };
        let (orbit, rest) = timestamp
            .trim()
            .split_once('-')
            .ok_or_else(|| invalid("missing orbit"))?;
        let (month, rest) = rest.split_once('-').ok_or_else(|| invalid("missing month"))?;
        let (sol, millisol) = rest.split_once(':').ok_or_else(|| invalid("missing millisol"))?;

        let orbit = orbit.parse::<u32>().map_err(|_err| invalid("orbit is not a number"))?;
        let month = MONTH_NAMES
            .iter()
            .position(|name| *name == month)
            .and_then(|index| u32::try_from(index).ok())
            .map(|index| index.saturating_add(1))
            .ok_or_else(|| invalid("unknown month name"))?;
        let sol = sol.parse::<u32>().map_err(|_err| invalid("sol is not a number"))?;
        let millisol = millisol
            .parse::<f64>()
            .map_err(|_err| invalid("millisol is not a number"))?;
        Self::from_date(orbit, month, sol, millisol)
    }

    fn date(self) -> CalendarDate {
        CalendarDate::from_total_sols(self.total_sols)
    }

    /// Sols since the calendar epoch.
    pub const fn total_sols(&self) -> u64 {
        self.total_sols
    }

    /// Time of day in millisols.
    pub const fn millisol(&self) -> f64 {
        self.millisol
    }

    /// Orbit number.
    pub fn orbit(&self) -> u32 {
        self.date().orbit
    }

    /// Month of the orbit, 1 to 24.
    pub fn month(&self) -> u32 {
        self.date().month
    }

    /// Name of the current month.
    pub fn month_name(&self) -> &'static str {
        let index = usize::try_from(self.month().saturating_sub(1)).unwrap_or(0);
        MONTH_NAMES.get(index).copied().unwrap_or("Adir")
    }

    /// Sol of the month, starting at 1.
    pub fn sol_of_month(&self) -> u32 {
        self.date().sol
    }

    /// Time of day formatted as `000.000`.
    pub fn time_of_day(&self) -> String {
        format!("{:07.3}", self.millisol)
    }

    /// Move forward. Negative or non-finite amounts are ignored.
    pub fn add_time(&mut self, millisols: f64) {
        if !(millisols.is_finite() && millisols > 0.0) {
            return;
        }
        self.millisol += millisols;
        while self.millisol >= MILLISOLS_PER_SOL {
            self.millisol -= MILLISOLS_PER_SOL;
            self.total_sols = self.total_sols.saturating_add(1);
        }
    }

    /// Millisols from `earlier` to this time. Negative if `earlier` is later.
    pub fn time_since(&self, earlier: &Self) -> f64 {
        let sols = if self.total_sols >= earlier.total_sols {
            u32::try_from(self.total_sols.saturating_sub(earlier.total_sols)).map_or(f64::MAX, f64::from)
        } else {
            -u32::try_from(earlier.total_sols.saturating_sub(self.total_sols)).map_or(f64::MAX, f64::from)
        };
        sols * MILLISOLS_PER_SOL + (self.millisol - earlier.millisol)
    }
}

impl Default for MarsClock {
    fn default() -> Self {
        Self::epoch()
    }
}

impl fmt::Display for MarsClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date();
        write!(
            f,
            "{:02}-{}-{:02}:{:07.3}",
            date.orbit,
            self.month_name(),
            date.sol,
            self.millisol
        )
    }
}
