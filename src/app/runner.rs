//! The tick loop driving an [`ActorHandler`]

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use config::ConfigError;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::config::TickConfig;
use crate::handler::{Actor, ActorHandler, Handled};
use crate::state::StateOperator;

/// Counters kept by a [`StepHandler`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickStats {
    pub ticks: u64,
    /// Sum of every delta passed to `act`, in seconds
    pub sim_time: f64,
    /// Ticks whose delta was cut down to `1 / min_rate`
    pub clamped: u64,
}

/// Drives an [`ActorHandler`] at a target rate until it dies
///
/// Each step converts wall time into a delta in seconds, scales it by
/// `time_scale` and caps it at `1 / min_rate` so a stalled tick never turns
/// into one huge step.
pub struct StepHandler {
    actors: Arc<ActorHandler>,
    tick: TickConfig,
    stats: Mutex<TickStats>,
}

impl StepHandler {
    /// Fails when `tick` would give a zero or non-finite period or clamp
    pub fn new(actors: Arc<ActorHandler>, tick: TickConfig) -> Result<Self, ConfigError> {
        tick.validate()?;
        Ok(Self {
            actors,
            tick,
            stats: Mutex::new(TickStats::default()),
        })
    }

    pub fn actors(&self) -> &Arc<ActorHandler> {
        &self.actors
    }

    pub fn tick_config(&self) -> &TickConfig {
        &self.tick
    }

    pub fn stats(&self) -> TickStats {
        *self.stats.lock()
    }

    /// Longest delta ever passed to `act`
    pub fn max_delta(&self) -> f64 {
        1.0 / self.tick.min_rate
    }

    /// Wall time one iteration of [`run`](Self::run) aims to take
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick.target_rate)
    }

    /// Runs one tick for `elapsed` wall time; returns the delta used
    pub fn step(&self, elapsed: Duration) -> f64 {
        let scaled = elapsed.as_secs_f64() * self.tick.time_scale;
        let max_delta = self.max_delta();
        let clamped = scaled > max_delta;
        let delta = if clamped {
            debug!(elapsed = scaled, max_delta, "Clamped oversize tick delta");
            max_delta
        } else {
            scaled
        };

        self.actors.act(delta);

        let mut stats = self.stats.lock();
        stats.ticks += 1;
        stats.sim_time += delta;
        if clamped {
            stats.clamped += 1;
        }
        delta
    }

    /// Steps until the actor handler is dead, sleeping to hold the target rate
    pub fn run(&self) {
        let period = self.period();
        info!(
            target_rate = self.tick.target_rate,
            min_rate = self.tick.min_rate,
            "Tick loop started"
        );

        let mut last: Option<Instant> = None;
        while !self.actors.is_dead().get_state() {
            let start = Instant::now();
            let elapsed = last.map_or(period, |last| start.duration_since(last));
            last = Some(start);

            self.step(elapsed);

            let spent = start.elapsed();
            if spent < period {
                thread::sleep(period - spent);
            }
        }

        let stats = self.stats();
        info!(ticks = stats.ticks, sim_time = stats.sim_time, "Tick loop stopped");
    }

    /// Runs the loop on a thread named `tick`
    ///
    /// The thread finishes once the actor handler dies and yields the final
    /// statistics.
    pub fn spawn(self: Arc<Self>) -> std::io::Result<JoinHandle<TickStats>> {
        thread::Builder::new()
            .name("tick".to_string())
            .spawn(move || {
                self.run();
                self.stats()
            })
    }
}

impl Handled for StepHandler {
    fn is_dead(&self) -> &StateOperator {
        self.actors.is_dead()
    }
}
