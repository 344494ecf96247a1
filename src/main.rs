mod bus;
mod config;
mod demo;
mod tasks;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use diffbot_kinematics::{ChassisSpeeds, DriveGeometry};
use diffbot_motor::sim::SimulatedDriver;
use diffbot_motor::{DifferentialDrive, Wheel};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

use crate::bus::Topic;
use crate::tasks::Workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app = config::load_config(&config::config_path())?;

    info!("Initializing simulated motor driver...");
    let driver = SimulatedDriver::new();
    let (left_motor, mut left_plant) = driver.channel(app.sim.plant, &app.wheel);
    let (right_motor, mut right_plant) = driver.channel(app.sim.plant, &app.wheel);

    let left = Arc::new(Wheel::with_encoder_levels(
        "left",
        app.wheel.clone(),
        left_motor,
        left_plant.levels(),
    )?);
    let right = Arc::new(Wheel::with_encoder_levels(
        "right",
        app.wheel.clone(),
        right_motor,
        right_plant.levels(),
    )?);
    let geometry = DriveGeometry::new(app.drive.track_width).context("invalid drive geometry")?;
    let drive = Arc::new(DifferentialDrive::new(
        Arc::clone(&left),
        Arc::clone(&right),
        geometry,
        driver,
    )?);

    let mut workers = Workers::new();

    // The plant thread stands in for the encoder edge interrupts.
    info!("Spawning encoder simulation thread...");
    let dt = 1.0 / f64::from(app.sim.frequency);
    workers.spawn_periodic("encoder-sim", app.sim.frequency, {
        let left = Arc::clone(&left);
        let right = Arc::clone(&right);
        move || {
            left_plant.advance(dt, |channel, level| left.on_edge(channel, level));
            right_plant.advance(dt, |channel, level| right.on_edge(channel, level));
        }
    })?;

    info!("Spawning wheel sampling and control threads...");
    workers.spawn_wheel(&left)?;
    workers.spawn_wheel(&right)?;

    drive.enable()?;

    let commands: Topic<ChassisSpeeds> = Topic::new(16);
    let applier = tokio::spawn(demo::drive_task(Arc::clone(&drive), commands.subscribe()));
    let telemetry = tokio::spawn(demo::telemetry_task(Arc::clone(&drive), app.demo.report_frequency));

    info!(targets = app.demo.targets.len(), hold_secs = app.demo.hold_secs, "Starting drive sequence...");
    demo::command_task(app.demo.clone(), commands).await?;
    applier.await??;

    // Let the control threads act on the zero command before parking the driver.
    let settle = Duration::from_secs_f64(2.0 / f64::from(app.wheel.control_frequency));
    tokio::time::sleep(settle).await;
    telemetry.abort();

    drive.disable()?;
    workers.shutdown();
    info!(body = %drive.get_body_velocity(), "Demo finished.");
    Ok(())
}
