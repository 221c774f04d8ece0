//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the half-open range (-pi, pi].
///
/// An input of exactly -pi maps to +pi.
pub fn wrap_angle<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let wrapped = pi_t - rem_euclid(pi_t - angle, tau_t);

    // Round-off in rem_euclid can return tau, which would give -pi
    if wrapped <= -pi_t {
        wrapped + tau_t
    } else {
        wrapped
    }
}

/// Get the signed shortest angular distance from `from` to `to`, in (-pi, pi].
pub fn ang_dist<T>(from: T, to: T) -> T
where
    T: Float,
{
    wrap_angle(to - from)
}

/// Apply a deadband to a normalised input.
///
/// Inputs with a magnitude at or below `deadband` map to zero, the remainder of the range is
/// rescaled so that an input of `max` still maps to `max` and the mapping stays continuous.
pub fn apply_deadband<T>(value: T, deadband: T, max: T) -> T
where
    T: Float,
{
    if value.abs() <= deadband {
        return T::zero();
    }

    if deadband >= max {
        return T::zero();
    }

    value.signum() * lin_map((deadband, max), (T::zero(), max), value.abs())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_wrap_angle() {
        assert!(close(wrap_angle(3.0 * PI / 2.0), -PI / 2.0));
        assert!(close(wrap_angle(-3.0 * PI / 2.0), PI / 2.0));
        assert!(close(wrap_angle(PI), PI));
        assert!(close(wrap_angle(-PI), PI));
        assert!(close(wrap_angle(0.0), 0.0));
        assert!(close(wrap_angle(7.0 * PI), PI));

        // Everything lands in (-pi, pi]
        let mut e = -20.0;
        while e < 20.0 {
            let w = wrap_angle(e);
            assert!(w > -PI && w <= PI, "{} wrapped to {}", e, w);
            assert!(close((e - w).rem_euclid(2.0 * PI).min(2.0 * PI - (e - w).rem_euclid(2.0 * PI)), 0.0));
            e += 0.01;
        }
    }

    #[test]
    fn test_ang_dist() {
        assert!(close(ang_dist(0.1, -0.1), -0.2));
        assert!(close(ang_dist(PI - 0.1, -PI + 0.1), 0.2));
    }

    #[test]
    fn test_apply_deadband() {
        let d = 0.1;
        assert_eq!(apply_deadband(d, d, 1.0), 0.0);
        assert_eq!(apply_deadband(-d, d, 1.0), 0.0);
        assert_eq!(apply_deadband(0.05, d, 1.0), 0.0);
        assert!(close(apply_deadband(1.0, d, 1.0), 1.0));
        assert!(close(apply_deadband(-1.0, d, 1.0), -1.0));
        assert!(close(apply_deadband(0.55, d, 1.0), 0.5));

        // Continuous and monotonic above the threshold
        let mut prev = 0.0;
        let mut x = d + 1e-6;
        while x <= 1.0 {
            let y = apply_deadband(x, d, 1.0);
            assert!(y >= prev);
            assert!(y - prev < 0.01);
            prev = y;
            x += 0.001;
        }
    }

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0.0, 10.0), (0.0, 1.0), 5.0), 0.5);
        assert_eq!(lin_map((-1.0, 1.0), (1.0, -1.0), 0.5), -0.5);
    }
}
