//! Incremental PID velocity regulator with a stall-safety timeout.
//!
//! The controller accumulates the PID *increment* into the duty cycle each
//! tick instead of recomputing the duty from scratch, so the previous duty is
//! implicit memory of the loop.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::WheelError;
use crate::traits::motor::DriveCommand;

/// Proportional, integral and derivative gains.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    pub(crate) fn validate(&self) -> Result<(), WheelError> {
        for (name, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !value.is_finite() {
                return Err(WheelError::InvalidGain { name, value });
            }
        }
        Ok(())
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(1.2, 0.0, 1.2)
    }
}

/// Regulator operating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulatorState {
    /// Closing the loop on the setpoint.
    Regulating,
    /// Zero setpoint or stale setpoint; the motor is held stopped.
    Idle,
}

#[derive(Debug, Clone)]
pub struct PidVelocityRegulator {
    gains: PidGains,
    /// Ticks allowed without a fresh setpoint before going idle.
    stall_ticks: u32,

    setpoint: f64,
    error: f64,
    prev_error: f64,
    integral: f64,
    output_duty: f64,
    active_ticks: u32,
    state: RegulatorState,
}

impl PidVelocityRegulator {
    /// Creates an idle regulator. `control_frequency` doubles as the stall
    /// window: roughly one second of regulation without a fresh setpoint.
    pub fn new(gains: PidGains, control_frequency: u32) -> Self {
        Self {
            gains,
            stall_ticks: control_frequency,
            setpoint: 0.0,
            error: 0.0,
            prev_error: 0.0,
            integral: 0.0,
            output_duty: 0.0,
            active_ticks: 0,
            state: RegulatorState::Idle,
        }
    }

    /// Updates the velocity setpoint (m/s).
    ///
    /// A new value clears the integral, the derivative memory and the stall
    /// counter. Repeating the current value only re-arms the stall window.
    /// Non-finite values are treated as zero.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        let setpoint = if setpoint.is_finite() {
            setpoint
        } else {
            warn!(setpoint, "non-finite setpoint, stopping");
            0.0
        };

        if setpoint != self.setpoint {
            self.setpoint = setpoint;
            self.prev_error = 0.0;
            self.integral = 0.0;
        }
        self.active_ticks = 0;
    }

    /// Runs one control step against the measured linear velocity (m/s).
    pub fn tick(&mut self, measured: f64) -> DriveCommand {
        if self.setpoint == 0.0 || self.active_ticks > self.stall_ticks {
            if self.state == RegulatorState::Regulating {
                debug!(
                    setpoint = self.setpoint,
                    active_ticks = self.active_ticks,
                    "regulator going idle"
                );
            }
            self.state = RegulatorState::Idle;
            self.prev_error = 0.0;
            return DriveCommand::Stop;
        }
        self.state = RegulatorState::Regulating;

        if measured.is_finite() {
            self.error = self.setpoint - measured;
            self.integral += self.error;
            let derivative = self.error - self.prev_error;
            self.prev_error = self.error;

            let increment = self.gains.kp * self.error
                + self.gains.ki * self.integral
                + self.gains.kd * derivative;
            self.output_duty = (self.output_duty + increment).clamp(-1.0, 1.0);
        } else {
            warn!(measured, "non-finite velocity measurement, holding duty");
        }

        self.active_ticks += 1;

        if self.output_duty >= 0.0 {
            DriveCommand::Forward(self.output_duty)
        } else {
            DriveCommand::Backward(-self.output_duty)
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Signed duty in `[-1.0, 1.0]`.
    pub fn output_duty(&self) -> f64 {
        self.output_duty
    }

    /// Regulating ticks since the setpoint was last set.
    pub fn active_ticks(&self) -> u32 {
        self.active_ticks
    }

    pub fn state(&self) -> RegulatorState {
        self.state
    }
}
