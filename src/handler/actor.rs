//! Per-tick "act" dispatch

use std::any::Any;
use std::sync::Arc;

use super::{Capability, Handled, Handler, Participant};

/// An object updated once per tick
pub trait Actor: Handled {
    /// Advances the object by `delta_time` seconds
    fn act(&self, delta_time: f64);
}

/// A handler that forwards each tick to its live, enabled actors
///
/// It is an [`Actor`] itself, so handlers nest.
pub type ActorHandler = Handler<dyn Actor>;

impl Actor for Handler<dyn Actor> {
    fn act(&self, delta_time: f64) {
        self.dispatch(true, |actor| {
            actor.act(delta_time);
            true
        });
    }
}

impl Capability for dyn Actor {
    fn from_participant(participant: &Arc<dyn Participant>) -> Option<Arc<Self>> {
        Arc::clone(participant).as_actor()
    }
}

impl Participant for Handler<dyn Actor> {
    fn as_actor(self: Arc<Self>) -> Option<Arc<dyn Actor>> {
        Some(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
