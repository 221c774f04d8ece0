//! # Planar pose geometry
//!
//! All poses are of the Robot Body (RB) frame in the Field (FD) frame. The field frame has its
//! origin in the corner of the blue alliance wall, X along the long edge of the field and Z up.
//! Headings follow the right hand rule about Z and are kept in (-pi, pi].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::wrap_angle;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Below this angle the series expansions of the twist functions are used.
const SMALL_ANGLE_RAD: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The position and heading of the robot on the field.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pose {
    /// Position of the robot centre in the field frame.
    ///
    /// Units: meters
    pub position_m_fd: Vector2<f64>,

    /// Angle from the field X axis to the robot X axis.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A change in pose expressed in the robot frame at the start of the motion, following a constant
/// curvature arc.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Twist {
    /// Forwards displacement.
    ///
    /// Units: meters
    pub dx_m: f64,

    /// Leftwards displacement.
    ///
    /// Units: meters
    pub dy_m: f64,

    /// Heading change.
    ///
    /// Units: radians
    pub dtheta_rad: f64,
}

/// A rigid transform between two frames.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// Translation of the child frame origin in the parent frame.
    ///
    /// Units: meters
    pub translation_m: Vector2<f64>,

    /// Rotation from the parent to the child frame.
    ///
    /// Units: radians
    pub rotation_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Pose {
    fn default() -> Self {
        Self {
            position_m_fd: Vector2::zeros(),
            heading_rad: 0.0,
        }
    }
}

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m_fd: Vector2::new(x_m, y_m),
            heading_rad: wrap_angle(heading_rad),
        }
    }

    pub fn x_m(&self) -> f64 {
        self.position_m_fd[0]
    }

    pub fn y_m(&self) -> f64 {
        self.position_m_fd[1]
    }

    /// Apply a transform expressed in this pose's frame.
    pub fn transform_by(&self, transform: &Transform) -> Pose {
        let rot = Rotation2::new(self.heading_rad);

        Pose {
            position_m_fd: self.position_m_fd + rot * transform.translation_m,
            heading_rad: wrap_angle(self.heading_rad + transform.rotation_rad),
        }
    }

    /// Get the transform which takes `other` to this pose, expressed in the frame of `other`.
    pub fn relative_to(&self, other: &Pose) -> Transform {
        let rot_inv = Rotation2::new(-other.heading_rad);

        Transform {
            translation_m: rot_inv * (self.position_m_fd - other.position_m_fd),
            rotation_rad: wrap_angle(self.heading_rad - other.heading_rad),
        }
    }

    /// Follow a twist from this pose along a constant curvature arc.
    pub fn exp(&self, twist: &Twist) -> Pose {
        let dtheta = twist.dtheta_rad;
        let (sin_theta, cos_theta) = dtheta.sin_cos();

        let (s, c) = if dtheta.abs() < SMALL_ANGLE_RAD {
            (1.0 - dtheta * dtheta / 6.0, 0.5 * dtheta)
        } else {
            (sin_theta / dtheta, (1.0 - cos_theta) / dtheta)
        };

        let transform = Transform {
            translation_m: Vector2::new(
                twist.dx_m * s - twist.dy_m * c,
                twist.dx_m * c + twist.dy_m * s,
            ),
            rotation_rad: dtheta,
        };

        self.transform_by(&transform)
    }

    /// Get the twist which takes this pose to `end`, the inverse of [`Pose::exp`].
    pub fn log(&self, end: &Pose) -> Twist {
        let transform = end.relative_to(self);
        let dtheta = transform.rotation_rad;
        let half_dtheta = 0.5 * dtheta;

        let cos_minus_one = dtheta.cos() - 1.0;
        let half_theta_by_tan = if cos_minus_one.abs() < SMALL_ANGLE_RAD {
            1.0 - dtheta * dtheta / 12.0
        } else {
            -(half_dtheta * dtheta.sin()) / cos_minus_one
        };

        let translation = Rotation2::new((-half_dtheta).atan2(half_theta_by_tan))
            * transform.translation_m
            * half_theta_by_tan.hypot(half_dtheta);

        Twist {
            dx_m: translation[0],
            dy_m: translation[1],
            dtheta_rad: dtheta,
        }
    }

    /// Interpolate between this pose and `end` along the connecting twist, `t` in [0, 1].
    pub fn interpolate(&self, end: &Pose, t: f64) -> Pose {
        if t <= 0.0 {
            *self
        } else if t >= 1.0 {
            *end
        } else {
            let twist = self.log(end);
            self.exp(&twist.scaled(t))
        }
    }

    /// Reflect this pose into the red alliance's half of a field of the given length.
    ///
    /// Applying this twice returns the original pose.
    pub fn mirrored(&self, field_length_m: f64) -> Pose {
        Pose {
            position_m_fd: Vector2::new(field_length_m - self.position_m_fd[0], self.position_m_fd[1]),
            heading_rad: wrap_angle(std::f64::consts::PI - self.heading_rad),
        }
    }

    /// Distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (self.position_m_fd - other.position_m_fd).norm()
    }
}

impl Twist {
    pub fn new(dx_m: f64, dy_m: f64, dtheta_rad: f64) -> Self {
        Self {
            dx_m,
            dy_m,
            dtheta_rad,
        }
    }

    pub fn scaled(&self, factor: f64) -> Twist {
        Twist {
            dx_m: self.dx_m * factor,
            dy_m: self.dy_m * factor,
            dtheta_rad: self.dtheta_rad * factor,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn assert_pose_close(a: &Pose, b: &Pose) {
        assert!(a.distance_to(b) < 1e-9, "{:?} != {:?}", a, b);
        assert!(wrap_angle(a.heading_rad - b.heading_rad).abs() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_exp_quarter_circle() {
        // Drive a quarter circle of radius 1 to the left
        let start = Pose::default();
        let end = start.exp(&Twist::new(PI / 2.0, 0.0, PI / 2.0));
        assert_pose_close(&end, &Pose::new(1.0, 1.0, PI / 2.0));
    }

    #[test]
    fn test_log_inverts_exp() {
        let start = Pose::new(2.0, -1.0, 0.3);
        for twist in &[
            Twist::new(1.0, 0.2, 0.5),
            Twist::new(-0.3, 0.0, 0.0),
            Twist::new(0.0, 0.0, -2.0),
        ] {
            let end = start.exp(twist);
            let back = start.log(&end);
            assert!((back.dx_m - twist.dx_m).abs() < 1e-9);
            assert!((back.dy_m - twist.dy_m).abs() < 1e-9);
            assert!((back.dtheta_rad - twist.dtheta_rad).abs() < 1e-9);
        }
    }

    #[test]
    fn test_relative_to_round_trip() {
        let a = Pose::new(1.0, 2.0, PI / 3.0);
        let b = Pose::new(-4.0, 0.5, -PI / 4.0);
        let t = b.relative_to(&a);
        assert_pose_close(&a.transform_by(&t), &b);
    }

    #[test]
    fn test_interpolate_endpoints() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(2.0, 0.0, 0.0);
        assert_pose_close(&a.interpolate(&b, 0.5), &Pose::new(1.0, 0.0, 0.0));
        assert_pose_close(&a.interpolate(&b, -1.0), &a);
        assert_pose_close(&a.interpolate(&b, 2.0), &b);
    }

    #[test]
    fn test_mirror_twice_is_identity() {
        let l = 16.541;
        for p in &[
            Pose::new(1.2, 5.5, 0.0),
            Pose::new(8.0, 0.1, PI / 2.0),
            Pose::new(15.0, 7.9, -2.5),
        ] {
            let m = p.mirrored(l);
            // Only the field X coordinate is reflected
            assert!((m.x_m() - (l - p.x_m())).abs() < 1e-12);
            assert_eq!(m.y_m(), p.y_m());
            assert_pose_close(&m.mirrored(l), p);
        }

        // Facing down field on blue faces back up field on red
        let m = Pose::new(2.0, 4.0, 0.0).mirrored(l);
        assert!((m.heading_rad - PI).abs() < 1e-12);
    }
}
