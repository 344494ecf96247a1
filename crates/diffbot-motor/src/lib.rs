//! Regulated wheels for a two-wheeled differential-drive robot.
//!
//! Each [`Wheel`] decodes its quadrature encoder, estimates its velocity at a
//! fixed sampling rate and closes a PID velocity loop at a fixed control
//! rate. [`DifferentialDrive`] maps body-frame velocity commands onto the two
//! wheels and reports the measured body velocity back.
//!
//! Hardware access stays behind [`MotorActuator`] and [`StandbyLine`]; the
//! [`sim`] module provides host-side implementations of both.

pub mod drive;
pub mod encoder;
pub mod error;
pub mod pid;
pub mod sim;
pub mod traits;
pub mod velocity;
pub mod wheel;

pub use drive::DifferentialDrive;
pub use encoder::{Channel, QuadratureDecoder};
pub use error::WheelError;
pub use pid::{PidGains, PidVelocityRegulator, RegulatorState};
pub use traits::motor::{DriveCommand, MotorActuator, StandbyLine};
pub use velocity::{VelocityEstimator, VelocitySample};
pub use wheel::{Wheel, WheelConfig};
