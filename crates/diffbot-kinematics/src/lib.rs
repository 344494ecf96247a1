#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for differential-drive velocity kinematics."]
#![doc = ""]
#![doc = "This crate provides the body-frame and wheel-frame velocity types of a two-wheeled"]
#![doc = "chassis and the closed-form inverse/forward kinematics between them."]

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// Linear and angular chassis velocities.
/// These represent the overall motion of the robot's chassis in its own frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChassisSpeeds {
    /// Linear speed of the chassis center (m/s).
    pub v: f64,
    /// Angular speed of the chassis (rad/s), counter-clockwise positive.
    pub omega: f64,
}

impl ChassisSpeeds {
    /// Construct chassis speeds.
    ///
    /// # Arguments
    ///
    /// * `v`: Linear speed of the chassis center (m/s).
    /// * `omega`: Angular speed of the chassis (rad/s).
    pub const fn new(v: f64, omega: f64) -> Self {
        ChassisSpeeds { v, omega }
    }

    /// Returns `true` if both components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.v == 0.0 && self.omega == 0.0
    }
}

impl fmt::Display for ChassisSpeeds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(v: {:.3} m/s, ω: {:.3} rad/s)", self.v, self.omega)
    }
}

/// Left and right wheel linear velocities at the contact patch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelSpeeds {
    /// Left wheel linear velocity (m/s).
    pub left: f64,
    /// Right wheel linear velocity (m/s).
    pub right: f64,
}

impl WheelSpeeds {
    /// Construct wheel speeds.
    ///
    /// # Arguments
    ///
    /// * `left`: Left wheel linear velocity (m/s).
    /// * `right`: Right wheel linear velocity (m/s).
    pub const fn new(left: f64, right: f64) -> Self {
        WheelSpeeds { left, right }
    }
}

impl fmt::Display for WheelSpeeds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(vL: {:.3} m/s, vR: {:.3} m/s)", self.left, self.right)
    }
}

/// Differential-drive geometry.
///
/// Holds the track width (distance between the two wheel contact points) and
/// performs the kinematic transforms between chassis and wheel velocities.
/// Wheel radius is not needed here: both sides of the transform are linear
/// velocities, the per-wheel radius lives with the wheel calibration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveGeometry {
    /// Track width (m).
    track_width: f64,
}

impl DriveGeometry {
    /// Construct a new drive geometry.
    ///
    /// # Arguments
    ///
    /// * `track_width`: The distance between the centers of the two drive wheels in meters.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidTrackWidth)` if `track_width` is not positive and finite.
    pub const fn new(track_width: f64) -> Result<Self, KinematicsError> {
        if !(track_width > 0.0) || !track_width.is_finite() {
            return Err(KinematicsError::InvalidTrackWidth(
                "must be positive and finite",
            ));
        }
        Ok(DriveGeometry { track_width })
    }

    /// Returns the track width.
    pub fn track_width(&self) -> f64 {
        self.track_width
    }

    /// Calculates the chassis speeds from the measured wheel speeds.
    /// This is the forward kinematics problem.
    ///
    /// # Arguments
    ///
    /// * `wheel_speeds`: The measured or commanded linear velocities of the left and right wheels.
    ///
    /// # Returns
    ///
    /// The resulting linear and angular velocities of the robot chassis.
    pub fn forward_kinematics(&self, wheel_speeds: WheelSpeeds) -> ChassisSpeeds {
        let v = 0.5 * (wheel_speeds.left + wheel_speeds.right);
        let omega = (wheel_speeds.right - wheel_speeds.left) / self.track_width;

        ChassisSpeeds::new(v, omega)
    }

    /// Calculates the wheel speeds required to achieve the given chassis speeds.
    /// This is the inverse kinematics problem.
    ///
    /// # Arguments
    ///
    /// * `chassis_speeds`: The desired linear and angular velocities of the robot chassis.
    ///
    /// # Returns
    ///
    /// The required linear velocities for the left and right wheels.
    pub fn inverse_kinematics(&self, chassis_speeds: ChassisSpeeds) -> WheelSpeeds {
        let half_track = 0.5 * chassis_speeds.omega * self.track_width;
        let left = chassis_speeds.v - half_track;
        let right = chassis_speeds.v + half_track;

        WheelSpeeds::new(left, right)
    }
}

impl fmt::Display for DriveGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DriveGeometry (track: {:.3} m)", self.track_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_geometry_constructor() {
        let geometry = DriveGeometry::new(0.122).unwrap();
        assert_eq!(geometry.track_width, 0.122);
        assert_eq!(geometry.track_width(), 0.122);
    }

    #[test]
    fn test_constructor_invalid_track_width() {
        for bad in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let result = DriveGeometry::new(bad);
            assert!(
                matches!(result, Err(KinematicsError::InvalidTrackWidth(_))),
                "track width {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_inverse_kinematics_straight() {
        let geometry = DriveGeometry::new(0.122).unwrap();
        let wheels = geometry.inverse_kinematics(ChassisSpeeds::new(0.3, 0.0));
        assert!((wheels.left - 0.3).abs() < EPSILON);
        assert!((wheels.right - 0.3).abs() < EPSILON);
    }

    #[test]
    fn test_inverse_kinematics_arc() {
        let geometry = DriveGeometry::new(0.122).unwrap();
        let wheels = geometry.inverse_kinematics(ChassisSpeeds::new(0.3, 1.6));
        // 0.5 * 1.6 * 0.122 = 0.8 * 0.122
        assert!((wheels.left - (0.3 - 0.8 * 0.122)).abs() < EPSILON);
        assert!((wheels.right - (0.3 + 0.8 * 0.122)).abs() < EPSILON);
    }

    #[test]
    fn test_inverse_kinematics_pivot_turn() {
        let geometry = DriveGeometry::new(0.5).unwrap();
        let wheels = geometry.inverse_kinematics(ChassisSpeeds::new(0.0, 2.0));
        assert!((wheels.left - (-0.5)).abs() < EPSILON);
        assert!((wheels.right - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_forward_kinematics_gentle_turn() {
        let geometry = DriveGeometry::new(0.5).unwrap();
        let chassis = geometry.forward_kinematics(WheelSpeeds::new(0.5, 1.0));
        // v = (1.0 + 0.5) / 2, omega = (1.0 - 0.5) / 0.5
        assert!((chassis.v - 0.75).abs() < EPSILON);
        assert!((chassis.omega - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_forward_inverts_inverse() {
        let geometry = DriveGeometry::new(0.122).unwrap();
        let targets = [
            (0.3, 0.0),
            (0.3, 1.6),
            (0.0, 1.6),
            (-0.3, 1.6),
            (-0.3, 0.0),
            (-0.3, -1.6),
            (0.0, -1.6),
            (0.3, -1.6),
        ];
        for (v, omega) in targets {
            let wheels = geometry.inverse_kinematics(ChassisSpeeds::new(v, omega));
            let chassis = geometry.forward_kinematics(wheels);
            assert!((chassis.v - v).abs() < EPSILON, "v for ({}, {})", v, omega);
            assert!((chassis.omega - omega).abs() < EPSILON, "ω for ({}, {})", v, omega);
        }
    }

    #[test]
    fn test_zero_command_is_zero() {
        let geometry = DriveGeometry::new(0.122).unwrap();
        let wheels = geometry.inverse_kinematics(ChassisSpeeds::default());
        assert_eq!(wheels, WheelSpeeds::new(0.0, 0.0));
        assert!(geometry.forward_kinematics(wheels).is_zero());
    }
}
