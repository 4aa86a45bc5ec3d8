//! Handler lifecycle health check

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::handler::{Actor, ActorHandler, Handled, HandlerType};
use crate::health::check::{CheckResult, Findings, SystemCheck};
use crate::state::StateOperator;

/// Counts its ticks; dies on request
struct Beat {
    dead: StateOperator,
    beats: AtomicU32,
}

impl Beat {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            dead: StateOperator::default(),
            beats: AtomicU32::new(0),
        })
    }

    fn beats(&self) -> u32 {
        self.beats.load(Ordering::Relaxed)
    }
}

impl Handled for Beat {
    fn is_dead(&self) -> &StateOperator {
        &self.dead
    }
}

impl Actor for Beat {
    fn act(&self, _delta_time: f64) {
        self.beats.fetch_add(1, Ordering::Relaxed);
    }
}

/// Runs a small actor scene through admission, reaping and auto-death
pub struct HandlerLifecycleCheck;

impl HandlerLifecycleCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HandlerLifecycleCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for HandlerLifecycleCheck {
    fn name(&self) -> &'static str {
        "Handlers"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates deferred admission, reaping of dead members and auto-death")
    }

    fn check(&self) -> CheckResult {
        let mut findings = Findings::new();
        let actors = ActorHandler::with_auto_death(HandlerType::Actor);
        let (first, second) = (Beat::new(), Beat::new());

        actors.add(first.clone());
        actors.add(first.clone());
        actors.add(second.clone());
        findings.expect(
            actors.handled_count() == 2,
            format!("Duplicate add ignored: {} queued", actors.handled_count()),
        );
        findings.expect(
            !actors.is_dead().get_state(),
            "Started handler with live members is alive",
        );

        actors.act(0.1);
        findings.expect(first.beats() == 1 && second.beats() == 1, "Each member acted once");

        first.dead.set_state(true);
        actors.act(0.1);
        findings.expect(
            first.beats() == 1 && actors.handled_count() == 1,
            format!("Dead member reaped: {} left", actors.handled_count()),
        );

        second.dead.set_state(true);
        findings.expect(actors.is_dead().get_state(), "Handler died with its last member");

        findings.finish("Lifecycle behaves", "Lifecycle broken")
    }
}
