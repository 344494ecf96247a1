//! Fixed-rate worker threads for the sampling, control and simulation loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use diffbot_motor::{MotorActuator, Wheel};
use spin_sleep::SpinSleeper;
use tracing::{error, info, warn};

/// Native sleep accuracy assumed by the spin sleeper (ns).
const SLEEP_ACCURACY_NS: u32 = 100_000;

/// Handle to a group of periodic threads sharing one shutdown flag.
pub struct Workers {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            handles: Vec::new(),
        }
    }

    /// Spawns a named thread calling `tick` at `frequency` Hz until
    /// [`Workers::shutdown`].
    ///
    /// Ticks are paced against absolute deadlines. A tick that overruns its
    /// slot is not made up; the schedule restarts from the late tick.
    pub fn spawn_periodic<F>(&mut self, name: &str, frequency: u32, mut tick: F) -> std::io::Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        let period = Duration::from_secs_f64(1.0 / f64::from(frequency.max(1)));
        let running = Arc::clone(&self.running);
        let thread_name = name.to_owned();

        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            info!(thread = %thread_name, ?period, "periodic task started");
            let sleeper = SpinSleeper::new(SLEEP_ACCURACY_NS);
            let mut deadline = Instant::now();
            let mut overruns: u64 = 0;

            while running.load(Ordering::Relaxed) {
                tick();
                deadline += period;
                let now = Instant::now();
                if deadline > now {
                    sleeper.sleep(deadline - now);
                } else {
                    overruns += 1;
                    if overruns.is_power_of_two() {
                        warn!(thread = %thread_name, overruns, "periodic task missed its deadline");
                    }
                    deadline = now;
                }
            }
            info!(thread = %thread_name, overruns, "periodic task stopped");
        })?;

        self.handles.push(handle);
        Ok(())
    }

    /// Starts the sampling and control threads of one wheel.
    pub fn spawn_wheel<M>(&mut self, wheel: &Arc<Wheel<M>>) -> std::io::Result<()>
    where
        M: MotorActuator + Send + 'static,
        M::Error: std::fmt::Debug,
    {
        let config = wheel.config().clone();

        let sampler = Arc::clone(wheel);
        self.spawn_periodic(&format!("{}-sample", wheel.name()), config.sample_frequency, move || {
            sampler.sample();
        })?;

        let regulator = Arc::clone(wheel);
        self.spawn_periodic(&format!("{}-control", wheel.name()), config.control_frequency, move || {
            if let Err(e) = regulator.regulate() {
                error!(wheel = regulator.name(), error = ?e, "motor command failed");
            }
        })
    }

    /// Signals every thread to stop and waits for them.
    pub fn shutdown(self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("unnamed").to_owned();
            if handle.join().is_err() {
                error!(thread = %name, "periodic task panicked");
            }
        }
    }
}
