//! One live handler per category, with broadcast membership changes

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use super::{Actor, Drawable, Handled, Handler, HandlerType};
use crate::app::input::{KeyListener, MouseListener};
use crate::error::HandlerError;

/// An object that can be offered to a [`HandlerRelay`]
///
/// Each upcast reports whether the object carries that capability. Override
/// the ones that apply by returning `Some(self)`.
pub trait Participant: Handled {
    fn as_actor(self: Arc<Self>) -> Option<Arc<dyn Actor>> {
        None
    }

    fn as_drawable(self: Arc<Self>) -> Option<Arc<dyn Drawable>> {
        None
    }

    fn as_mouse_listener(self: Arc<Self>) -> Option<Arc<dyn MouseListener>> {
        None
    }

    fn as_key_listener(self: Arc<Self>) -> Option<Arc<dyn KeyListener>> {
        None
    }

    /// Type-erased handle, used by custom capabilities to downcast
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A member type a [`Handler`] can be built around
pub trait Capability: Handled + 'static {
    /// Views `participant` as this capability, if it has it
    fn from_participant(participant: &Arc<dyn Participant>) -> Option<Arc<Self>>;
}

/// A handler as seen by the relay
pub trait RelayedHandler: Handled {
    fn handler_type(&self) -> HandlerType;

    /// Queues `participant` for admission; false if it lacks the capability
    fn offer(&self, participant: &Arc<dyn Participant>) -> bool;

    /// Queues `participant` for removal; false if it lacks the capability
    fn withdraw(&self, participant: &Arc<dyn Participant>) -> bool;

    fn kill(&self);

    /// Takes over the members of a handler this one replaces
    ///
    /// Returns false when `previous` is a different kind of handler.
    fn absorb(&self, previous: &dyn RelayedHandler) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: ?Sized + Capability> RelayedHandler for Handler<T> {
    fn handler_type(&self) -> HandlerType {
        Handler::handler_type(self)
    }

    fn offer(&self, participant: &Arc<dyn Participant>) -> bool {
        match T::from_participant(participant) {
            Some(member) => {
                self.add(member);
                true
            }
            None => false,
        }
    }

    fn withdraw(&self, participant: &Arc<dyn Participant>) -> bool {
        match T::from_participant(participant) {
            Some(member) => {
                self.remove(&member);
                true
            }
            None => false,
        }
    }

    fn kill(&self) {
        Handler::kill(self);
    }

    fn absorb(&self, previous: &dyn RelayedHandler) -> bool {
        match previous.as_any().downcast_ref::<Self>() {
            Some(previous) => {
                self.transfer_from(previous);
                true
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Registry holding at most one handler per [`HandlerType`]
#[derive(Default)]
pub struct HandlerRelay {
    handlers: RwLock<IndexMap<HandlerType, Arc<dyn RelayedHandler>>>,
}

impl HandlerRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under its type, replacing any previous holder
    ///
    /// The previous handler's members move into the new one when
    /// `transfer_previous` is set, and it is killed when `kill_previous` is.
    /// Returns the replaced handler.
    pub fn register(
        &self,
        handler: Arc<dyn RelayedHandler>,
        kill_previous: bool,
        transfer_previous: bool,
    ) -> Option<Arc<dyn RelayedHandler>> {
        let handler_type = handler.handler_type();
        let previous = self
            .handlers
            .write()
            .insert(handler_type, Arc::clone(&handler));

        if let Some(previous) = &previous
            && !Arc::ptr_eq(previous, &handler)
        {
            if transfer_previous {
                if handler.absorb(previous.as_ref()) {
                    debug!(handler = %handler_type, "Transferred members to replacement handler");
                } else {
                    warn!(
                        handler = %handler_type,
                        "Replaced handler holds a different member type, nothing transferred"
                    );
                }
            }
            if kill_previous {
                previous.kill();
                debug!(handler = %handler_type, "Killed replaced handler");
            }
        }

        previous
    }

    /// Removes and returns the handler registered under `handler_type`
    pub fn unregister(&self, handler_type: HandlerType) -> Option<Arc<dyn RelayedHandler>> {
        self.handlers.write().shift_remove(&handler_type)
    }

    pub fn lookup(&self, handler_type: HandlerType) -> Option<Arc<dyn RelayedHandler>> {
        self.handlers.read().get(&handler_type).cloned()
    }

    /// Looks up a handler and downcasts it to its concrete type
    pub fn lookup_as<H>(&self, handler_type: HandlerType) -> Option<Arc<H>>
    where
        H: RelayedHandler + 'static,
    {
        self.lookup(handler_type)?.into_any().downcast::<H>().ok()
    }

    /// Offers `participant` to every live handler; returns how many accepted
    pub fn broadcast_add(&self, participant: &Arc<dyn Participant>) -> usize {
        self.live_handlers()
            .iter()
            .filter(|handler| handler.offer(participant))
            .count()
    }

    /// Withdraws `participant` from every live handler; returns how many held
    /// its capability
    pub fn broadcast_remove(&self, participant: &Arc<dyn Participant>) -> usize {
        self.live_handlers()
            .iter()
            .filter(|handler| handler.withdraw(participant))
            .count()
    }

    /// Adds `participant` to one specific handler
    pub fn add_to(
        &self,
        handler_type: HandlerType,
        participant: &Arc<dyn Participant>,
    ) -> Result<(), HandlerError> {
        let handler = self
            .lookup(handler_type)
            .ok_or(HandlerError::NotRegistered(handler_type))?;
        if handler.offer(participant) {
            Ok(())
        } else {
            error!(handler = %handler_type, "Object offered to a handler it cannot join");
            Err(HandlerError::TypeMismatch { handler_type })
        }
    }

    /// Removes `participant` from one specific handler
    pub fn remove_from(
        &self,
        handler_type: HandlerType,
        participant: &Arc<dyn Participant>,
    ) -> Result<(), HandlerError> {
        let handler = self
            .lookup(handler_type)
            .ok_or(HandlerError::NotRegistered(handler_type))?;
        if handler.withdraw(participant) {
            Ok(())
        } else {
            error!(handler = %handler_type, "Object withdrawn from a handler it cannot be in");
            Err(HandlerError::TypeMismatch { handler_type })
        }
    }

    /// Unregisters every handler that reports dead; returns how many went
    pub fn purge_dead(&self) -> usize {
        let dead: Vec<Arc<dyn RelayedHandler>> = self
            .snapshot()
            .into_iter()
            .filter(|handler| handler.is_dead().get_state())
            .collect();
        if dead.is_empty() {
            return 0;
        }

        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|_, handler| !dead.iter().any(|d| Arc::ptr_eq(d, handler)));
        before - handlers.len()
    }

    /// Registered tags, in registration order
    pub fn handler_types(&self) -> Vec<HandlerType> {
        self.handlers.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn RelayedHandler>> {
        self.handlers.read().values().cloned().collect()
    }

    fn live_handlers(&self) -> Vec<Arc<dyn RelayedHandler>> {
        self.snapshot()
            .into_iter()
            .filter(|handler| !handler.is_dead().get_state())
            .collect()
    }
}

impl fmt::Debug for HandlerRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRelay")
            .field("handlers", &self.handler_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ActorHandler;
    use crate::state::StateOperator;

    struct Tag {
        dead: StateOperator,
    }

    impl Handled for Tag {
        fn is_dead(&self) -> &StateOperator {
            &self.dead
        }
    }

    impl Capability for Tag {
        fn from_participant(participant: &Arc<dyn Participant>) -> Option<Arc<Self>> {
            Arc::clone(participant).into_any().downcast::<Self>().ok()
        }
    }

    impl Participant for Tag {
        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn test_custom_capability_round_trip() {
        let relay = HandlerRelay::new();
        let tags = Handler::<Tag>::new(HandlerType::Custom("tags"));
        relay.register(tags.clone(), false, false);

        let tag: Arc<dyn Participant> = Arc::new(Tag {
            dead: StateOperator::default(),
        });
        assert_eq!(relay.broadcast_add(&tag), 1);
        assert_eq!(tags.handled_count(), 1);
        assert!(relay.add_to(HandlerType::Actor, &tag).is_err());
    }

    #[test]
    fn test_lookup_as_concrete_type() {
        let relay = HandlerRelay::new();
        let actors = ActorHandler::new(HandlerType::Actor);
        relay.register(actors.clone(), false, false);

        let found = relay.lookup_as::<ActorHandler>(HandlerType::Actor);
        assert!(found.is_some_and(|found| Arc::ptr_eq(&found, &actors)));
        assert!(relay.lookup_as::<Handler<Tag>>(HandlerType::Actor).is_none());
    }
}
