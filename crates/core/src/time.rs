use chrono::{DateTime, Duration, Utc};

/// Clock abstraction so services can run against fixed time in tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Clock that reads the system wall time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Clock pinned to the given instant.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Current time as seen by this clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Moves a fixed clock forward by `delta`; a wall clock is unchanged.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// True when the clock is pinned rather than reading wall time.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Whole seconds elapsed from `start` to `end`, clamped to zero when the
/// interval is negative (e.g. a skewed wall clock).
#[must_use]
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let secs = (end - start).num_seconds();
    u32::try_from(secs).unwrap_or(0)
}

/// Deterministic timestamp for tests and examples (2024-03-01T00:00:00Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_709_251_200;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), clock.now());
        assert!(clock.is_fixed());
    }

    #[test]
    fn advance_moves_fixed_clock() {
        let mut clock = fixed_clock();
        let before = clock.now();
        clock.advance(Duration::seconds(30));
        assert_eq!(clock.now(), before + Duration::seconds(30));
    }

    #[test]
    fn elapsed_seconds_clamps_negative() {
        let now = fixed_now();
        assert_eq!(elapsed_seconds(now, now + Duration::seconds(61)), 61);
        assert_eq!(elapsed_seconds(now, now - Duration::seconds(5)), 0);
    }
}
