//! Error types for wheel construction.

use thiserror::Error;

/// Configuration errors detected when a [`Wheel`](crate::Wheel) is built.
///
/// Everything after construction is infallible from the wheel's point of
/// view; actuator faults surface through the actuator's own error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WheelError {
    #[error("invalid wheel radius {0}: must be positive and finite")]
    InvalidWheelRadius(f64),
    #[error("invalid gear ratio {0}: must be positive and finite")]
    InvalidGearRatio(f64),
    #[error("invalid counts per revolution: must be non-zero")]
    InvalidCountsPerRevolution,
    #[error("invalid {name} frequency: must be non-zero")]
    InvalidFrequency { name: &'static str },
    #[error("invalid PID gain {name} = {value}: must be finite")]
    InvalidGain { name: &'static str, value: f64 },
}
