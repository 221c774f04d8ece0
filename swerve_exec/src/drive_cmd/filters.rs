//! # Input filters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits the rate of change of a signal.
///
/// The period is passed in on every call so that the limiter behaves the same regardless of how
/// late the control loop runs.
#[derive(Debug, Clone, Serialize)]
pub struct SlewRateLimiter {
    /// Maximum rate of change.
    ///
    /// Units: input units/second
    rate_ps: f64,

    prev: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SlewRateLimiter {
    pub fn new(rate_ps: f64) -> Self {
        Self {
            rate_ps: rate_ps.abs(),
            prev: 0.0,
        }
    }

    /// Step the limiter towards `input` over a period of `dt_s` seconds.
    pub fn calculate(&mut self, input: f64, dt_s: f64) -> f64 {
        let max_step = self.rate_ps * dt_s.max(0.0);

        self.prev += (input - self.prev).max(-max_step).min(max_step);
        self.prev
    }

    /// Jump the output straight to the given value.
    pub fn reset(&mut self, value: f64) {
        self.prev = value;
    }

    pub fn last(&self) -> f64 {
        self.prev
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_slew_bound() {
        let dt = 0.02;
        let rate = 2.0;
        let mut lim = SlewRateLimiter::new(rate);

        // Square wave input, output must never step more than rate * dt
        let mut prev = 0.0;
        for i in 0..200 {
            let input = if (i / 25) % 2 == 0 { 1.0 } else { -1.0 };
            let out = lim.calculate(input, dt);
            assert!((out - prev).abs() <= rate * dt + 1e-12);
            prev = out;
        }
    }

    #[test]
    fn test_slew_reaches_target() {
        let mut lim = SlewRateLimiter::new(2.0);
        for _ in 0..30 {
            lim.calculate(0.5, 0.02);
        }
        assert!((lim.last() - 0.5).abs() < 1e-12);

        lim.reset(-1.0);
        assert_eq!(lim.last(), -1.0);
        assert!((lim.calculate(1.0, 0.1) + 0.8).abs() < 1e-12);
    }
}
