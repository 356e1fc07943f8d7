//! Virtual time for the simulation engine.
//!
//! All timestamps are signed 64-bit nanosecond counts measured from
//! simulation start (time 0). The clock is purely virtual: it advances only
//! when the engine dispatches an event, never from wall-clock time.

/// A point on the simulation timeline, in nanoseconds since start.
pub type SimTime = i64;

/// A signed span of simulation time, in nanoseconds.
pub type SimDuration = i64;

/// Nanoseconds per microsecond.
pub const NANOS_PER_MICRO: SimDuration = 1_000;

/// Nanoseconds per millisecond.
pub const NANOS_PER_MILLI: SimDuration = 1_000_000;

/// Nanoseconds per second.
pub const NANOS_PER_SEC: SimDuration = 1_000_000_000;

/// Converts whole seconds to a [`SimDuration`].
#[inline]
pub fn secs(s: i64) -> SimDuration {
    s * NANOS_PER_SEC
}

/// Converts whole milliseconds to a [`SimDuration`].
#[inline]
pub fn millis(ms: i64) -> SimDuration {
    ms * NANOS_PER_MILLI
}

/// Converts a fractional second count to a [`SimDuration`], rounding toward zero.
///
/// Useful for rate-style parameters (e.g. events per second).
#[inline]
pub fn secs_f64(s: f64) -> SimDuration {
    (s * NANOS_PER_SEC as f64) as SimDuration
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversions() {
        assert_eq!(secs(1), 1_000_000_000);
        assert_eq!(millis(250), 250_000_000);
        assert_eq!(secs(0), 0);
    }

    #[test]
    fn test_secs_f64_truncates() {
        assert_eq!(secs_f64(0.5), 500_000_000);
        assert_eq!(secs_f64(1.25), 1_250_000_000);
        // Sub-nanosecond fractions are dropped.
        assert_eq!(secs_f64(1e-10), 0);
    }
}
