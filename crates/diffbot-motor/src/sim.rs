//! Host-side stand-in for the motor driver, gear motors and encoders.
//!
//! [`SimulatedDriver`] plays the dual H-bridge: it owns the standby line and
//! hands out one [`SimulatedMotor`] / [`MotorPlant`] pair per channel. The
//! motor half is the actuator a [`Wheel`](crate::Wheel) drives; the plant half
//! integrates a first-order motor response and emits the quadrature edges the
//! real encoder would produce.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoder::Channel;
use crate::traits::motor::{MotorActuator, StandbyLine};
use crate::wheel::WheelConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("duty {0} outside [0, 1]")]
    DutyOutOfRange(f64),
}

/// Physical response of a simulated gear motor.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantParams {
    /// Output shaft speed at full duty (rpm).
    pub no_load_rpm: f64,
    /// First-order time constant (s). Zero responds instantly.
    pub time_constant: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            no_load_rpm: 200.0,
            time_constant: 0.05,
        }
    }
}

/// Simulated dual H-bridge with a shared standby line.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    enabled: Arc<AtomicBool>,
}

impl SimulatedDriver {
    /// Creates a driver in standby.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Creates one motor channel calibrated like the wheel it will drive.
    pub fn channel(&self, params: PlantParams, wheel: &WheelConfig) -> (SimulatedMotor, MotorPlant) {
        let duty = Arc::new(Mutex::new(0.0));
        let counts_per_output_rev = wheel.gear_ratio * f64::from(wheel.counts_per_revolution);

        let motor = SimulatedMotor {
            duty: Arc::clone(&duty),
        };
        let plant = MotorPlant {
            duty,
            enabled: Arc::clone(&self.enabled),
            full_scale: params.no_load_rpm / 60.0 * counts_per_output_rev,
            time_constant: params.time_constant,
            speed: 0.0,
            residual: 0.0,
            levels: (false, false),
        };
        (motor, plant)
    }
}

impl StandbyLine for SimulatedDriver {
    type Error = core::convert::Infallible;

    fn enable(&mut self) -> Result<(), Self::Error> {
        self.enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        self.enabled.store(false, Ordering::Relaxed);
        Ok(())
    }
}

/// Actuator half of a simulated channel.
#[derive(Debug, Clone)]
pub struct SimulatedMotor {
    duty: Arc<Mutex<f64>>,
}

impl SimulatedMotor {
    /// Signed duty currently applied.
    pub fn duty(&self) -> f64 {
        *self.duty.lock()
    }

    fn set(&mut self, duty: f64) -> Result<(), SimError> {
        if !(0.0..=1.0).contains(&duty.abs()) {
            return Err(SimError::DutyOutOfRange(duty));
        }
        *self.duty.lock() = duty;
        Ok(())
    }
}

impl MotorActuator for SimulatedMotor {
    type Error = SimError;

    fn forward(&mut self, duty: f64) -> Result<(), Self::Error> {
        if duty < 0.0 {
            return Err(SimError::DutyOutOfRange(duty));
        }
        self.set(duty)
    }

    fn backward(&mut self, duty: f64) -> Result<(), Self::Error> {
        if duty < 0.0 {
            return Err(SimError::DutyOutOfRange(duty));
        }
        self.set(-duty)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        *self.duty.lock() = 0.0;
        Ok(())
    }
}

/// Motor and encoder half of a simulated channel.
#[derive(Debug)]
pub struct MotorPlant {
    duty: Arc<Mutex<f64>>,
    enabled: Arc<AtomicBool>,
    /// Encoder counts per second at full duty.
    full_scale: f64,
    time_constant: f64,
    /// Current speed in counts per second.
    speed: f64,
    /// Fractional counts not yet emitted as edges.
    residual: f64,
    levels: (bool, bool),
}

impl MotorPlant {
    /// Advances the plant by `dt` seconds, emitting one `on_edge` call per
    /// encoder edge crossed.
    pub fn advance(&mut self, dt: f64, mut on_edge: impl FnMut(Channel, bool)) {
        let target = if self.enabled.load(Ordering::Relaxed) {
            *self.duty.lock() * self.full_scale
        } else {
            0.0
        };

        let alpha = if self.time_constant > 0.0 {
            1.0 - (-dt / self.time_constant).exp()
        } else {
            1.0
        };
        self.speed += (target - self.speed) * alpha;
        self.residual += self.speed * dt;

        while self.residual >= 1.0 {
            self.step(true, &mut on_edge);
            self.residual -= 1.0;
        }
        while self.residual <= -1.0 {
            self.step(false, &mut on_edge);
            self.residual += 1.0;
        }
    }

    /// Current speed in encoder counts per second.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Current `(A, B)` encoder output levels.
    pub fn levels(&self) -> (bool, bool) {
        self.levels
    }

    // Forward order is A↑ B↑ A↓ B↓: toggle A when the levels match, B otherwise.
    fn step(&mut self, forward: bool, on_edge: &mut impl FnMut(Channel, bool)) {
        let (a, b) = &mut self.levels;
        if (*a == *b) == forward {
            *a = !*a;
            on_edge(Channel::A, *a);
        } else {
            *b = !*b;
            on_edge(Channel::B, *b);
        }
    }
}
