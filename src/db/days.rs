// Days Filter
// Interprets the `days` argument shared by the store queries

use crate::error::ColumbusError;

/// Seconds in one day
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaysFilter {
    /// `-1`: no filtering
    All,
    /// `0`: only domains holding at least one record
    WithRecords,
    /// `n > 0`: only domains with a record newer than `now - n days`
    Within(i64),
}

impl DaysFilter {
    pub fn from_days(days: i64) -> crate::Result<Self> {
        match days {
            -1 => Ok(DaysFilter::All),
            0 => Ok(DaysFilter::WithRecords),
            d if d > 0 => Ok(DaysFilter::Within(d)),
            d => Err(ColumbusError::InvalidDays { days: d }),
        }
    }

    /// Oldest record time still inside the window
    pub fn cutoff(&self, now: i64) -> Option<i64> {
        match self {
            DaysFilter::Within(days) => Some(now - days.saturating_mul(SECONDS_PER_DAY)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_days() {
        assert_eq!(DaysFilter::from_days(-1).unwrap(), DaysFilter::All);
        assert_eq!(DaysFilter::from_days(0).unwrap(), DaysFilter::WithRecords);
        assert_eq!(DaysFilter::from_days(7).unwrap(), DaysFilter::Within(7));
        assert!(matches!(
            DaysFilter::from_days(-2),
            Err(ColumbusError::InvalidDays { days: -2 })
        ));
    }

    #[test]
    fn test_cutoff() {
        assert_eq!(DaysFilter::Within(1).cutoff(100_000), Some(100_000 - 86_400));
        assert_eq!(DaysFilter::All.cutoff(100_000), None);
    }
}
