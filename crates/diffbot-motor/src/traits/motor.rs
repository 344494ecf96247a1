/// A drive request produced by the velocity regulator.
///
/// Duty values are magnitudes in `[0.0, 1.0]`; direction is carried by the
/// variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    /// Spin forward at the given duty cycle.
    Forward(f64),
    /// Spin backward at the given duty cycle.
    Backward(f64),
    /// Cut drive to the motor.
    Stop,
}

impl DriveCommand {
    /// Signed duty this command represents, `0.0` for `Stop`.
    pub fn signed_duty(&self) -> f64 {
        match *self {
            DriveCommand::Forward(duty) => duty,
            DriveCommand::Backward(duty) => -duty,
            DriveCommand::Stop => 0.0,
        }
    }
}

/// Core trait for one channel of an H-bridge motor driver.
///
/// Implementations are expected to be synchronous and non-blocking; the
/// control loop calls them once per control tick.
pub trait MotorActuator {
    type Error;

    /// Drive forward with a duty cycle in `[0.0, 1.0]`.
    fn forward(&mut self, duty: f64) -> Result<(), Self::Error>;

    /// Drive backward with a duty cycle in `[0.0, 1.0]`.
    fn backward(&mut self, duty: f64) -> Result<(), Self::Error>;

    /// Stop the motor
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Apply a regulator command.
    fn apply(&mut self, command: DriveCommand) -> Result<(), Self::Error> {
        match command {
            DriveCommand::Forward(duty) => self.forward(duty),
            DriveCommand::Backward(duty) => self.backward(duty),
            DriveCommand::Stop => self.stop(),
        }
    }
}

/// The shared standby line of a dual H-bridge driver.
///
/// While in standby both motor channels are unpowered regardless of what
/// they are commanded.
pub trait StandbyLine {
    type Error;

    /// Take the driver out of standby.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Put the driver into standby.
    fn disable(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl MotorActuator for Recorder {
        type Error = Infallible;

        fn forward(&mut self, _duty: f64) -> Result<(), Self::Error> {
            self.calls.push("forward");
            Ok(())
        }

        fn backward(&mut self, _duty: f64) -> Result<(), Self::Error> {
            self.calls.push("backward");
            Ok(())
        }

        fn stop(&mut self) -> Result<(), Self::Error> {
            self.calls.push("stop");
            Ok(())
        }
    }

    #[test]
    fn test_apply_dispatches_by_variant() {
        let mut motor = Recorder::default();
        motor.apply(DriveCommand::Forward(0.4)).unwrap();
        motor.apply(DriveCommand::Backward(0.2)).unwrap();
        motor.apply(DriveCommand::Stop).unwrap();
        assert_eq!(motor.calls, ["forward", "backward", "stop"]);
    }

    #[test]
    fn test_signed_duty() {
        assert_eq!(DriveCommand::Forward(0.4).signed_duty(), 0.4);
        assert_eq!(DriveCommand::Backward(0.2).signed_duty(), -0.2);
        assert_eq!(DriveCommand::Stop.signed_duty(), 0.0);
    }
}
