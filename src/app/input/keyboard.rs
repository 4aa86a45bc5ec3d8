//! Key signals folded into pressed/down/released events

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use super::events::{ButtonStatus, KeyContent, KeyEvent};
use super::selector::EventSelector;
use super::state::KeyboardState;
use crate::handler::{
    Actor, Capability, Handled, Handler, HandlerType, Participant, RelayedHandler,
};
use crate::state::{HandlingOperators, StateOperator};

/// An object interested in key events
pub trait KeyListener: Handled {
    fn on_key_event(&self, event: &KeyEvent);

    /// Only events this selector accepts are delivered
    fn event_selector(&self) -> &EventSelector<KeyEvent>;
}

impl Capability for dyn KeyListener {
    fn from_participant(participant: &Arc<dyn Participant>) -> Option<Arc<Self>> {
        Arc::clone(participant).as_key_listener()
    }
}

/// The key identities one signal stands for
///
/// A coded key (arrows, function keys) is only known by its code; any other
/// key is tracked under both its character and its code.
fn contents(character: char, code: u32, is_coded: bool) -> impl Iterator<Item = KeyContent> {
    (!is_coded)
        .then_some(KeyContent::Char(character))
        .into_iter()
        .chain(std::iter::once(KeyContent::Code(code)))
}

/// Turns raw key signals into discrete events for key listeners
pub struct KeyHandler {
    listeners: Arc<Handler<dyn KeyListener>>,
    keys: Mutex<KeyboardState>,
}

impl KeyHandler {
    pub fn new() -> Arc<Self> {
        Self::around(Handler::new(HandlerType::Key))
    }

    /// Creates a key handler that dies once all its listeners have died
    pub fn with_auto_death() -> Arc<Self> {
        Self::around(Handler::with_auto_death(HandlerType::Key))
    }

    fn around(listeners: Arc<Handler<dyn KeyListener>>) -> Arc<Self> {
        Arc::new(Self {
            listeners,
            keys: Mutex::new(KeyboardState::default()),
        })
    }

    pub fn listeners(&self) -> &Arc<Handler<dyn KeyListener>> {
        &self.listeners
    }

    pub fn add(&self, listener: Arc<dyn KeyListener>) -> bool {
        self.listeners.add(listener)
    }

    pub fn remove(&self, listener: &Arc<dyn KeyListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub fn on_key_pressed(&self, character: char, code: u32, is_coded: bool) {
        let mut keys = self.keys.lock();
        for key in contents(character, code, is_coded) {
            keys.press(key);
        }
    }

    pub fn on_key_released(&self, character: char, code: u32, is_coded: bool) {
        let mut keys = self.keys.lock();
        for key in contents(character, code, is_coded) {
            keys.release(key);
        }
    }

    pub fn is_down(&self, key: KeyContent) -> bool {
        self.keys.lock().is_down(key)
    }

    /// Builds this tick's events and resets the pulses for the next one
    fn take_events(&self, delta_time: f64) -> Vec<KeyEvent> {
        let mut keys = self.keys.lock();
        let event = |status, key: &KeyContent| KeyEvent {
            status,
            key: *key,
            delta_time,
        };

        let events = keys
            .pressed
            .iter()
            .map(|key| event(ButtonStatus::Pressed, key))
            .chain(keys.down.iter().map(|key| event(ButtonStatus::Down, key)))
            .chain(
                keys.released
                    .iter()
                    .map(|key| event(ButtonStatus::Released, key)),
            )
            .collect();
        keys.advance();
        events
    }
}

impl Handled for KeyHandler {
    fn is_dead(&self) -> &StateOperator {
        self.listeners.is_dead()
    }

    fn handling_operators(&self) -> Option<&HandlingOperators> {
        self.listeners.handling_operators()
    }
}

impl Actor for KeyHandler {
    fn act(&self, delta_time: f64) {
        let events = self.take_events(delta_time);
        if events.is_empty() {
            // Still a settle point for queued listeners and reaping
            self.listeners.settle();
            return;
        }

        self.listeners.dispatch(true, |listener| {
            let selector = listener.event_selector();
            for event in events.iter().filter(|event| selector.accepts(event)) {
                listener.on_key_event(event);
            }
            true
        });
    }
}

impl Participant for KeyHandler {
    fn as_actor(self: Arc<Self>) -> Option<Arc<dyn Actor>> {
        Some(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl RelayedHandler for KeyHandler {
    fn handler_type(&self) -> HandlerType {
        HandlerType::Key
    }

    fn offer(&self, participant: &Arc<dyn Participant>) -> bool {
        self.listeners.offer(participant)
    }

    fn withdraw(&self, participant: &Arc<dyn Participant>) -> bool {
        self.listeners.withdraw(participant)
    }

    fn kill(&self) {
        self.listeners.kill();
    }

    fn absorb(&self, previous: &dyn RelayedHandler) -> bool {
        let previous = previous.as_any();
        if let Some(previous) = previous.downcast_ref::<KeyHandler>() {
            self.listeners.transfer_from(&previous.listeners);
            true
        } else if let Some(previous) = previous.downcast_ref::<Handler<dyn KeyListener>>() {
            self.listeners.transfer_from(previous);
            true
        } else {
            false
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
