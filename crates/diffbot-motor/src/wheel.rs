//! A regulated wheel: encoder, velocity estimator, PID regulator and motor.
//!
//! A [`Wheel`] is shared between three execution contexts:
//!
//! - edge interrupts call [`Wheel::on_edge`] (atomics only, never blocks),
//! - the sampling task calls [`Wheel::sample`] at `sample_frequency`,
//! - the control task calls [`Wheel::regulate`] at `control_frequency`.
//!
//! Setpoints may be written from any other thread through
//! [`Wheel::set_setpoint`].

use parking_lot::{Mutex, RwLock};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::encoder::{Channel, QuadratureDecoder};
use crate::error::WheelError;
use crate::pid::{PidGains, PidVelocityRegulator, RegulatorState};
use crate::traits::motor::MotorActuator;
use crate::velocity::{VelocityEstimator, VelocitySample};

/// Static calibration of one wheel.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct WheelConfig {
    /// Wheel radius (m).
    pub wheel_radius: f64,
    /// Motor shaft turns per output shaft turn.
    pub gear_ratio: f64,
    /// Encoder counts per motor shaft revolution, both channels combined.
    pub counts_per_revolution: u32,
    /// Velocity sampling rate (Hz).
    pub sample_frequency: u32,
    /// Regulator rate (Hz). Also the stall window in ticks.
    pub control_frequency: u32,
    pub gains: PidGains,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            wheel_radius: 0.025,
            gear_ratio: 98.5,
            counts_per_revolution: 28,
            sample_frequency: 100,
            control_frequency: 50,
            gains: PidGains::default(),
        }
    }
}

impl WheelConfig {
    /// Checks the calibration, failing on the first invalid value.
    pub fn validate(&self) -> Result<(), WheelError> {
        if !(self.wheel_radius > 0.0) || !self.wheel_radius.is_finite() {
            return Err(WheelError::InvalidWheelRadius(self.wheel_radius));
        }
        if !(self.gear_ratio > 0.0) || !self.gear_ratio.is_finite() {
            return Err(WheelError::InvalidGearRatio(self.gear_ratio));
        }
        if self.counts_per_revolution == 0 {
            return Err(WheelError::InvalidCountsPerRevolution);
        }
        if self.sample_frequency == 0 {
            return Err(WheelError::InvalidFrequency { name: "sample" });
        }
        if self.control_frequency == 0 {
            return Err(WheelError::InvalidFrequency { name: "control" });
        }
        self.gains.validate()
    }
}

struct ControlLoop<M> {
    regulator: PidVelocityRegulator,
    actuator: M,
}

pub struct Wheel<M> {
    name: String,
    config: WheelConfig,
    decoder: QuadratureDecoder,
    estimator: Mutex<VelocityEstimator>,
    sample: RwLock<VelocitySample>,
    control: Mutex<ControlLoop<M>>,
}

impl<M: MotorActuator> Wheel<M> {
    /// Builds a wheel around `actuator` with both encoder channels low.
    ///
    /// # Errors
    ///
    /// Returns a [`WheelError`] if the calibration is invalid.
    pub fn new(
        name: impl Into<String>,
        config: WheelConfig,
        actuator: M,
    ) -> Result<Self, WheelError> {
        Self::with_encoder_levels(name, config, actuator, (false, false))
    }

    /// Builds a wheel whose decoder starts from the `(A, B)` pin levels read
    /// at startup.
    ///
    /// # Errors
    ///
    /// Returns a [`WheelError`] if the calibration is invalid.
    pub fn with_encoder_levels(
        name: impl Into<String>,
        config: WheelConfig,
        actuator: M,
        (level_a, level_b): (bool, bool),
    ) -> Result<Self, WheelError> {
        config.validate()?;
        let name = name.into();
        info!(
            wheel = %name,
            radius = config.wheel_radius,
            gear_ratio = config.gear_ratio,
            cpr = config.counts_per_revolution,
            level_a,
            level_b,
            sample_hz = config.sample_frequency,
            control_hz = config.control_frequency,
            "wheel configured"
        );

        Ok(Self {
            estimator: Mutex::new(VelocityEstimator::new(&config)),
            control: Mutex::new(ControlLoop {
                regulator: PidVelocityRegulator::new(config.gains, config.control_frequency),
                actuator,
            }),
            decoder: QuadratureDecoder::with_levels(level_a, level_b),
            sample: RwLock::new(VelocitySample::default()),
            name,
            config,
        })
    }

    /// Edge interrupt entry point.
    pub fn on_edge(&self, channel: Channel, level: bool) {
        self.decoder.on_edge(channel, level);
    }

    /// Sampling tick: converts the count delta since the last tick into a
    /// velocity sample and publishes it.
    pub fn sample(&self) -> VelocitySample {
        // The count is read under the estimator lock so a concurrent
        // `reset_encoder` lands entirely before or after this tick.
        let mut estimator = self.estimator.lock();
        let sample = estimator.tick(self.decoder.count());
        *self.sample.write() = sample;
        sample
    }

    /// Control tick: runs the regulator on the latest measurement and drives
    /// the motor with the result.
    pub fn regulate(&self) -> Result<RegulatorState, M::Error> {
        let measured = self.measured_linear_velocity();
        let mut control = self.control.lock();
        let command = control.regulator.tick(measured);
        control.actuator.apply(command)?;
        Ok(control.regulator.state())
    }

    /// Sets the target linear velocity (m/s).
    pub fn set_setpoint(&self, velocity: f64) {
        let mut control = self.control.lock();
        if control.regulator.setpoint() != velocity {
            debug!(wheel = %self.name, setpoint = velocity, "new setpoint");
        }
        control.regulator.set_setpoint(velocity);
    }

    pub fn setpoint(&self) -> f64 {
        self.control.lock().regulator.setpoint()
    }

    /// Most recent measured linear velocity (m/s).
    pub fn measured_linear_velocity(&self) -> f64 {
        self.sample.read().linear_velocity
    }

    /// Most recent measured output shaft angular velocity (rad/s).
    pub fn measured_angular_velocity(&self) -> f64 {
        self.sample.read().angular_velocity
    }

    pub fn velocity(&self) -> VelocitySample {
        *self.sample.read()
    }

    pub fn state(&self) -> RegulatorState {
        self.control.lock().regulator.state()
    }

    /// Signed duty last computed by the regulator.
    pub fn output_duty(&self) -> f64 {
        self.control.lock().regulator.output_duty()
    }

    pub fn encoder_count(&self) -> i32 {
        self.decoder.count()
    }

    pub fn decoder(&self) -> &QuadratureDecoder {
        &self.decoder
    }

    /// Zeroes the encoder count and re-bases the velocity estimator so the
    /// next sample does not see the jump.
    pub fn reset_encoder(&self) {
        self.rebase(&mut self.estimator.lock());
    }

    fn rebase(&self, estimator: &mut VelocityEstimator) {
        self.decoder.reset();
        estimator.resync(0);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    /// Runs `f` with exclusive access to the actuator.
    pub fn with_actuator<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.control.lock().actuator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::motor::DriveCommand;
    use core::convert::Infallible;
    use core::f64::consts::TAU;

    #[derive(Debug, Default)]
    struct FakeMotor {
        commands: Vec<DriveCommand>,
    }

    impl MotorActuator for FakeMotor {
        type Error = Infallible;

        fn forward(&mut self, duty: f64) -> Result<(), Self::Error> {
            self.commands.push(DriveCommand::Forward(duty));
            Ok(())
        }

        fn backward(&mut self, duty: f64) -> Result<(), Self::Error> {
            self.commands.push(DriveCommand::Backward(duty));
            Ok(())
        }

        fn stop(&mut self) -> Result<(), Self::Error> {
            self.commands.push(DriveCommand::Stop);
            Ok(())
        }
    }

    fn wheel() -> Wheel<FakeMotor> {
        Wheel::new("test", WheelConfig::default(), FakeMotor::default()).unwrap()
    }

    fn spin_forward(wheel: &Wheel<FakeMotor>, edges: usize) {
        let (mut a, mut b) = wheel.decoder().levels();
        for _ in 0..edges {
            if a == b {
                a = !a;
                wheel.on_edge(Channel::A, a);
            } else {
                b = !b;
                wheel.on_edge(Channel::B, b);
            }
        }
    }

    #[test]
    fn test_rejects_bad_calibration() {
        let cases = [
            (
                WheelConfig { wheel_radius: 0.0, ..WheelConfig::default() },
                WheelError::InvalidWheelRadius(0.0),
            ),
            (
                WheelConfig { gear_ratio: -1.0, ..WheelConfig::default() },
                WheelError::InvalidGearRatio(-1.0),
            ),
            (
                WheelConfig { counts_per_revolution: 0, ..WheelConfig::default() },
                WheelError::InvalidCountsPerRevolution,
            ),
            (
                WheelConfig { sample_frequency: 0, ..WheelConfig::default() },
                WheelError::InvalidFrequency { name: "sample" },
            ),
            (
                WheelConfig { control_frequency: 0, ..WheelConfig::default() },
                WheelError::InvalidFrequency { name: "control" },
            ),
        ];

        for (config, expected) in cases {
            let result = Wheel::new("bad", config, FakeMotor::default());
            assert_eq!(result.err(), Some(expected));
        }
    }

    #[test]
    fn test_sample_publishes_velocity() {
        let wheel = wheel();
        spin_forward(&wheel, 28);
        let sample = wheel.sample();

        let expected = 100.0 * TAU / 98.5 * 0.025;
        assert!((sample.linear_velocity - expected).abs() < 1e-9);
        assert_eq!(wheel.measured_linear_velocity(), sample.linear_velocity);
        assert_eq!(wheel.measured_angular_velocity(), sample.angular_velocity);

        // No edges since the last sample.
        assert_eq!(wheel.sample(), VelocitySample::default());
    }

    #[test]
    fn test_regulate_drives_actuator() {
        let wheel = wheel();
        wheel.set_setpoint(0.2);
        assert_eq!(wheel.regulate().unwrap(), RegulatorState::Regulating);
        let duty = wheel.output_duty();
        assert!(duty > 0.0);
        wheel.with_actuator(|motor| {
            assert_eq!(motor.commands, [DriveCommand::Forward(duty)]);
        });
    }

    #[test]
    fn test_stall_timeout_stops_motor() {
        let wheel = wheel();
        wheel.set_setpoint(0.3);
        for _ in 0..=50 {
            assert_eq!(wheel.regulate().unwrap(), RegulatorState::Regulating);
        }
        assert_eq!(wheel.regulate().unwrap(), RegulatorState::Idle);
        wheel.with_actuator(|motor| {
            assert_eq!(motor.commands.last(), Some(&DriveCommand::Stop));
            assert_eq!(
                motor.commands.iter().filter(|c| **c == DriveCommand::Stop).count(),
                1
            );
        });
    }

    #[test]
    fn test_reset_encoder_suppresses_jump() {
        let wheel = wheel();
        spin_forward(&wheel, 400);
        wheel.sample();
        wheel.reset_encoder();
        assert_eq!(wheel.encoder_count(), 0);
        assert_eq!(wheel.sample(), VelocitySample::default());
    }

    #[test]
    fn test_decoder_starts_from_pin_levels() {
        let seeded =
            Wheel::with_encoder_levels("seeded", WheelConfig::default(), FakeMotor::default(), (true, false))
                .unwrap();
        assert_eq!(seeded.decoder().levels(), (true, false));
        // B rises while A is high: forward.
        seeded.on_edge(Channel::B, true);
        assert_eq!(seeded.encoder_count(), 1);

        // The same edge reads as reverse when A is assumed low.
        let unseeded = wheel();
        unseeded.on_edge(Channel::B, true);
        assert_eq!(unseeded.encoder_count(), -1);
    }

    #[test]
    fn test_reset_during_sample_is_not_seen_as_motion() {
        let wheel = wheel();
        spin_forward(&wheel, 400);
        wheel.sample();
        spin_forward(&wheel, 400);

        // Hold the estimator while the sampler starts, then reset under it.
        let mut estimator = wheel.estimator.lock();
        let sample = std::thread::scope(|scope| {
            let sampler = scope.spawn(|| wheel.sample());
            std::thread::sleep(std::time::Duration::from_millis(50));
            wheel.rebase(&mut estimator);
            drop(estimator);
            sampler.join().unwrap()
        });

        assert_eq!(sample, VelocitySample::default());
        assert_eq!(wheel.sample(), VelocitySample::default());
    }

    #[test]
    fn test_wheel_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Wheel<FakeMotor>>();
    }
}
