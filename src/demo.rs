//! The demo drive sequence: a command publisher, the task applying commands
//! to the drive, and a telemetry logger.

use std::sync::Arc;
use std::time::Duration;

use diffbot_kinematics::ChassisSpeeds;
use diffbot_motor::{DifferentialDrive, MotorActuator, StandbyLine};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::bus::Topic;
use crate::config::DemoSettings;

/// Visits every target in turn, re-publishing it at `command_frequency` for
/// `hold_secs`, then publishes a zero command. Dropping `commands` on return
/// closes the topic.
pub async fn command_task(settings: DemoSettings, commands: Topic<ChassisSpeeds>) -> anyhow::Result<()> {
    let hold = Duration::from_secs_f64(settings.hold_secs);
    let mut ticker = time::interval(Duration::from_secs_f64(
        1.0 / f64::from(settings.command_frequency),
    ));

    for (index, [linear, angular]) in settings.targets.iter().copied().enumerate() {
        let target = ChassisSpeeds::new(linear, angular);
        info!(index, %target, "new drive target");

        let until = Instant::now() + hold;
        loop {
            ticker.tick().await;
            if Instant::now() >= until {
                break;
            }
            commands.publish(target);
        }
    }

    info!("sequence complete, stopping");
    commands.publish(ChassisSpeeds::default());
    Ok(())
}

/// Applies every received command to the drive until the topic closes.
pub async fn drive_task<M, S>(
    drive: Arc<DifferentialDrive<M, S>>,
    mut commands: broadcast::Receiver<Arc<ChassisSpeeds>>,
) -> anyhow::Result<()>
where
    M: MotorActuator,
    S: StandbyLine,
{
    loop {
        match commands.recv().await {
            Ok(command) => {
                let wheels = drive.set_body_velocity(command.v, command.omega);
                debug!(%command, %wheels, "command applied");
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "drive task fell behind the command topic");
            }
            Err(RecvError::Closed) => break,
        }
    }
    info!("command topic closed");
    Ok(())
}

/// Logs setpoints and measured velocities at `frequency` Hz. Never returns.
pub async fn telemetry_task<M, S>(drive: Arc<DifferentialDrive<M, S>>, frequency: u32)
where
    M: MotorActuator,
    S: StandbyLine,
{
    let mut ticker = time::interval(Duration::from_secs_f64(1.0 / f64::from(frequency)));
    loop {
        ticker.tick().await;
        let body = drive.get_body_velocity();
        let (left, right) = (drive.left(), drive.right());
        info!(
            v = body.v,
            omega = body.omega,
            left_setpoint = left.setpoint(),
            left_measured = left.measured_linear_velocity(),
            left_duty = left.output_duty(),
            right_setpoint = right.setpoint(),
            right_measured = right.measured_linear_velocity(),
            right_duty = right.output_duty(),
            "telemetry"
        );
    }
}
