//! Wheel velocity estimation from encoder counts.

use core::f64::consts::TAU;

use crate::wheel::WheelConfig;

/// Angular and linear velocity of a wheel's output shaft.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocitySample {
    /// Output shaft angular velocity (rad/s).
    pub angular_velocity: f64,
    /// Linear velocity at the tyre (m/s).
    pub linear_velocity: f64,
}

/// Turns the count delta seen between two fixed-rate samples into velocity.
///
/// `tick` must run at exactly the configured sampling frequency; the delta
/// is not bounds-checked, so the sampling period has to be short enough that
/// the counter cannot wrap between two samples.
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    counts_per_revolution: f64,
    gear_ratio: f64,
    wheel_radius: f64,
    sample_frequency: f64,
    prev_count: i32,
}

impl VelocityEstimator {
    pub fn new(config: &WheelConfig) -> Self {
        Self {
            counts_per_revolution: f64::from(config.counts_per_revolution),
            gear_ratio: config.gear_ratio,
            wheel_radius: config.wheel_radius,
            sample_frequency: f64::from(config.sample_frequency),
            prev_count: 0,
        }
    }

    /// Consumes the current encoder count and returns the new sample.
    pub fn tick(&mut self, count: i32) -> VelocitySample {
        let delta = count.wrapping_sub(self.prev_count);
        self.prev_count = count;

        let counts_per_sec = f64::from(delta) * self.sample_frequency;
        let motor_rad_per_sec = counts_per_sec / self.counts_per_revolution * TAU;
        let angular_velocity = motor_rad_per_sec / self.gear_ratio;

        VelocitySample {
            angular_velocity,
            linear_velocity: angular_velocity * self.wheel_radius,
        }
    }

    /// Re-bases the previous count, e.g. after the encoder was reset.
    pub fn resync(&mut self, count: i32) {
        self.prev_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn firmware_config() -> WheelConfig {
        WheelConfig {
            wheel_radius: 0.025,
            gear_ratio: 98.5,
            counts_per_revolution: 28,
            sample_frequency: 100,
            ..WheelConfig::default()
        }
    }

    #[test]
    fn test_one_motor_revolution_per_sample() {
        let mut estimator = VelocityEstimator::new(&firmware_config());
        let sample = estimator.tick(28);

        let expected_linear = (28.0 * 100.0 / 28.0) * TAU / 98.5 * 0.025;
        assert!((sample.linear_velocity - expected_linear).abs() < EPSILON);
        assert!((sample.angular_velocity - 100.0 * TAU / 98.5).abs() < EPSILON);
    }

    #[test]
    fn test_uses_delta_not_absolute_count() {
        let mut estimator = VelocityEstimator::new(&firmware_config());
        estimator.tick(1_000);
        let steady = estimator.tick(1_000);
        assert_eq!(steady, VelocitySample::default());

        let backwards = estimator.tick(1_000 - 28);
        assert!(backwards.linear_velocity < 0.0);
        assert!((backwards.linear_velocity + 100.0 * TAU / 98.5 * 0.025).abs() < EPSILON);
    }

    #[test]
    fn test_delta_across_counter_wrap() {
        let mut estimator = VelocityEstimator::new(&firmware_config());
        estimator.resync(i32::MAX - 13);
        let sample = estimator.tick((i32::MAX).wrapping_add(15));
        let expected = estimator_linear_for_delta(28);
        assert!((sample.linear_velocity - expected).abs() < EPSILON);
    }

    #[test]
    fn test_resync_suppresses_jump() {
        let mut estimator = VelocityEstimator::new(&firmware_config());
        estimator.tick(5_000);
        estimator.resync(0);
        assert_eq!(estimator.tick(0), VelocitySample::default());
    }

    fn estimator_linear_for_delta(delta: i32) -> f64 {
        f64::from(delta) * 100.0 / 28.0 * TAU / 98.5 * 0.025
    }
}
