//! Differential-drive composition of two regulated wheels.

use std::sync::Arc;

use diffbot_kinematics::{ChassisSpeeds, DriveGeometry, WheelSpeeds};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::traits::motor::{MotorActuator, StandbyLine};
use crate::wheel::Wheel;

/// Maps body-frame velocity commands onto two [`Wheel`] setpoints and reports
/// the measured body velocity back.
///
/// The drive does not own the wheels' counters or loops; the periodic tasks
/// keep their own `Arc<Wheel>` handles. The standby line of the shared motor
/// driver is passed through as-is.
pub struct DifferentialDrive<M, S> {
    left: Arc<Wheel<M>>,
    right: Arc<Wheel<M>>,
    geometry: DriveGeometry,
    standby: Mutex<S>,
}

impl<M, S> DifferentialDrive<M, S>
where
    M: MotorActuator,
    S: StandbyLine,
{
    /// Builds the drive and puts the motor driver into standby.
    pub fn new(
        left: Arc<Wheel<M>>,
        right: Arc<Wheel<M>>,
        geometry: DriveGeometry,
        mut standby: S,
    ) -> Result<Self, S::Error> {
        standby.disable()?;
        info!(track_width = geometry.track_width(), "differential drive ready");

        Ok(Self {
            left,
            right,
            geometry,
            standby: Mutex::new(standby),
        })
    }

    /// Commands a body velocity: `linear` in m/s, `angular` in rad/s.
    pub fn set_body_velocity(&self, linear: f64, angular: f64) -> WheelSpeeds {
        let wheels = self
            .geometry
            .inverse_kinematics(ChassisSpeeds::new(linear, angular));
        debug!(linear, angular, left = wheels.left, right = wheels.right, "body velocity command");

        self.left.set_setpoint(wheels.left);
        self.right.set_setpoint(wheels.right);
        wheels
    }

    /// Measured body velocity from both wheels' latest samples.
    pub fn get_body_velocity(&self) -> ChassisSpeeds {
        self.geometry.forward_kinematics(self.wheel_velocities())
    }

    /// Latest measured linear velocity of each wheel.
    pub fn wheel_velocities(&self) -> WheelSpeeds {
        WheelSpeeds::new(
            self.left.measured_linear_velocity(),
            self.right.measured_linear_velocity(),
        )
    }

    /// Takes the motor driver out of standby.
    pub fn enable(&self) -> Result<(), S::Error> {
        info!("motor driver enabled");
        self.standby.lock().enable()
    }

    /// Puts the motor driver into standby.
    pub fn disable(&self) -> Result<(), S::Error> {
        info!("motor driver disabled");
        self.standby.lock().disable()
    }

    pub fn left(&self) -> &Arc<Wheel<M>> {
        &self.left
    }

    pub fn right(&self) -> &Arc<Wheel<M>> {
        &self.right
    }

    pub fn geometry(&self) -> DriveGeometry {
        self.geometry
    }
}
