//! Application configuration: `config/default.toml` overlaid with
//! `DIFFBOT__*` environment variables.

use anyhow::{Context, ensure};
use config::{Config, Environment, File, FileFormat};
use diffbot_motor::WheelConfig;
use diffbot_motor::sim::PlantParams;
use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_VAR: &str = "DIFFBOT_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Calibration shared by both wheels.
    pub wheel: WheelConfig,
    pub drive: DriveSettings,
    pub sim: SimSettings,
    pub demo: DemoSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    /// Distance between the wheel contact points (m).
    pub track_width: f64,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self { track_width: 0.122 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Rate at which the simulated motors advance and emit encoder edges (Hz).
    pub frequency: u32,
    pub plant: PlantParams,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            frequency: 2000,
            plant: PlantParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// How long each target is held (s).
    pub hold_secs: f64,
    /// Rate at which the current target is re-published (Hz).
    pub command_frequency: u32,
    /// Rate of the telemetry log line (Hz).
    pub report_frequency: u32,
    /// `[linear, angular]` targets in m/s and rad/s, visited in order.
    pub targets: Vec<[f64; 2]>,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            hold_secs: 1.5,
            command_frequency: 20,
            report_frequency: 10,
            targets: vec![
                [0.3, 0.0],
                [0.3, 1.6],
                [0.0, 1.6],
                [-0.3, 1.6],
                [-0.3, 0.0],
                [-0.3, -1.6],
                [0.0, -1.6],
                [0.3, -1.6],
            ],
        }
    }
}

/// Upper bound for every periodic task rate (Hz).
pub const MAX_TASK_FREQUENCY: u32 = 10_000;

/// Upper bound for `demo.hold_secs` (one day).
pub const MAX_HOLD_SECS: f64 = 86_400.0;

fn check_rate(name: &str, frequency: u32) -> anyhow::Result<()> {
    ensure!(
        (1..=MAX_TASK_FREQUENCY).contains(&frequency),
        "{name} must be between 1 and {MAX_TASK_FREQUENCY} Hz, got {frequency}"
    );
    Ok(())
}

impl AppConfig {
    /// Checks the settings the library crates do not validate themselves and
    /// bounds every rate that becomes a task period.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_rate("sim.frequency", self.sim.frequency)?;
        check_rate("wheel.sample_frequency", self.wheel.sample_frequency)?;
        check_rate("wheel.control_frequency", self.wheel.control_frequency)?;
        check_rate("demo.command_frequency", self.demo.command_frequency)?;
        check_rate("demo.report_frequency", self.demo.report_frequency)?;
        ensure!(
            (0.0..=MAX_HOLD_SECS).contains(&self.demo.hold_secs),
            "demo.hold_secs must be between 0 and {MAX_HOLD_SECS} s, got {}",
            self.demo.hold_secs
        );
        Ok(())
    }
}

/// Path of the configuration file, honouring [`CONFIG_PATH_VAR`].
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned())
}

/// Loads and validates the configuration. A missing file falls back to the
/// built-in defaults.
pub fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    info!("Attempting to load configuration from {}", path);

    let settings = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("DIFFBOT")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|config| config.try_deserialize::<AppConfig>());

    let app = match settings {
        Ok(app) => {
            info!("Successfully loaded configuration: {:?}", app);
            app
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e).with_context(|| format!("loading configuration from {path}"));
        }
    };

    app.validate()?;
    Ok(app)
}
