use crate::config::ConfigError;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

/// Timezone-aware venue clock.
///
/// The trading-phase schedule is expressed in the venue's local time; the clock converts
/// wall-clock UTC into that zone.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TzClock {
    tz: Tz,
}

impl TzClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Parse an IANA timezone name, eg/ "Europe/London".
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
    }

    pub fn utc() -> Self {
        Self::new(Tz::UTC)
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Current venue-local time of day.
    pub fn local_time(&self) -> NaiveTime {
        self.now().time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_timezone() {
        let clock = TzClock::parse("Europe/London").unwrap();
        // The venue-local instant is the same point in time as UTC now.
        let delta = clock.now().to_utc() - Utc::now();
        assert!(delta.num_seconds().abs() < 5);
    }

    #[test]
    fn test_parse_unknown_timezone() {
        assert!(matches!(
            TzClock::parse("Nowhere/Land"),
            Err(ConfigError::UnknownTimezone(_))
        ));
    }
}
