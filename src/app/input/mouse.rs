//! Pointer signals folded into edge-triggered mouse events

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::events::{
    ButtonStatus, MouseButton, MouseEvent, MouseEventKind, MovementType, Position, Scale,
};
use super::selector::EventSelector;
use super::state::{ButtonState, MouseState};
use crate::handler::{
    Actor, Capability, Handled, Handler, HandlerType, Participant, RelayedHandler,
};
use crate::state::{HandlingOperators, StateOperator};

/// An object interested in mouse events
pub trait MouseListener: Handled {
    fn on_mouse_event(&self, event: &MouseEvent);

    /// Only events this selector accepts are delivered
    fn event_selector(&self) -> &EventSelector<MouseEvent>;

    fn is_in_area_of_interest(&self, position: Position) -> bool;
}

impl Capability for dyn MouseListener {
    fn from_participant(participant: &Arc<dyn Participant>) -> Option<Arc<Self>> {
        Arc::clone(participant).as_mouse_listener()
    }
}

/// Where a listener sits relative to the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Entered,
    Over,
    Exited,
}

impl Phase {
    /// Next phase given the previous one and whether the pointer is inside
    fn step(previous: Option<Phase>, inside: bool) -> Option<Phase> {
        match (previous, inside) {
            (Some(Phase::Entered | Phase::Over), true) => Some(Phase::Over),
            (Some(Phase::Entered | Phase::Over), false) => Some(Phase::Exited),
            (None | Some(Phase::Exited), true) => Some(Phase::Entered),
            (None | Some(Phase::Exited), false) => None,
        }
    }

    fn movement(self) -> MovementType {
        match self {
            Phase::Entered => MovementType::Enter,
            Phase::Over => MovementType::Over,
            Phase::Exited => MovementType::Exit,
        }
    }

    /// Entered and exited are one-tick pulses
    fn settle(self) -> Option<Phase> {
        match self {
            Phase::Entered | Phase::Over => Some(Phase::Over),
            Phase::Exited => None,
        }
    }
}

fn listener_key(listener: &Arc<dyn MouseListener>) -> usize {
    Arc::as_ptr(listener).cast::<()>() as usize
}

/// Turns raw pointer signals into discrete events for mouse listeners
///
/// Signals arriving between ticks are accumulated; each [`act`](Actor::act)
/// folds them into enter/over/exit/move, pressed/down/released and wheel
/// events and delivers them to every live, enabled listener whose selector
/// accepts them. Pulses are cleared after every tick whether or not anyone
/// consumed them.
pub struct MouseHandler {
    listeners: Arc<Handler<dyn MouseListener>>,
    input: Mutex<MouseState>,
    /// Listener phases keyed by listener address
    phases: Mutex<HashMap<usize, Phase>>,
}

impl MouseHandler {
    pub fn new() -> Arc<Self> {
        Self::around(Handler::new(HandlerType::Mouse))
    }

    /// Creates a mouse handler that dies once all its listeners have died
    pub fn with_auto_death() -> Arc<Self> {
        Self::around(Handler::with_auto_death(HandlerType::Mouse))
    }

    fn around(listeners: Arc<Handler<dyn MouseListener>>) -> Arc<Self> {
        Arc::new(Self {
            listeners,
            input: Mutex::new(MouseState::default()),
            phases: Mutex::new(HashMap::new()),
        })
    }

    pub fn listeners(&self) -> &Arc<Handler<dyn MouseListener>> {
        &self.listeners
    }

    pub fn add(&self, listener: Arc<dyn MouseListener>) -> bool {
        self.listeners.add(listener)
    }

    pub fn remove(&self, listener: &Arc<dyn MouseListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Records a new pointer position
    pub fn set_position(&self, position: Position) {
        self.input.lock().set_position(position);
    }

    /// Records a button going down or up
    pub fn set_button_state(&self, button: MouseButton, is_down: bool) {
        self.input.lock().set_button(button, is_down);
    }

    /// Records a wheel turn; a turn of zero amount and zero notches is dropped
    pub fn wheel_turn(&self, amount: f64, notches: i32) {
        if amount == 0.0 && notches == 0 {
            trace!("Dropped empty wheel turn");
            return;
        }
        self.input.lock().wheel.push((amount, notches));
    }

    pub fn position(&self) -> Position {
        self.input.lock().position
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.input.lock().is_down(button)
    }

    /// Takes this tick's input and resets the pulses for the next one
    fn take_frame(&self) -> MouseState {
        let mut input = self.input.lock();
        let frame = input.clone();
        input.advance();
        frame
    }

    fn dispatch_frame(&self, frame: &MouseState, delta_time: f64) {
        let previous = std::mem::take(&mut *self.phases.lock());
        let mut next = HashMap::new();
        let mut visited = HashSet::new();

        self.listeners.dispatch(true, |listener| {
            let key = listener_key(listener);
            visited.insert(key);

            let inside = listener.is_in_area_of_interest(frame.position);
            let phase = Phase::step(previous.get(&key).copied(), inside);
            let scale = if inside { Scale::Local } else { Scale::Global };
            let selector = listener.event_selector();
            let deliver = |kind: MouseEventKind| {
                let event = MouseEvent {
                    kind,
                    position: frame.position,
                    scale,
                    delta_time,
                };
                if selector.accepts(&event) {
                    listener.on_mouse_event(&event);
                }
            };

            if frame.moved {
                deliver(MouseEventKind::Movement(MovementType::Move));
            }
            if let Some(phase) = phase {
                deliver(MouseEventKind::Movement(phase.movement()));
            }
            for (&button, state) in &frame.buttons {
                for status in button_statuses(*state) {
                    deliver(MouseEventKind::Button { button, status });
                }
            }
            for &(amount, notches) in &frame.wheel {
                deliver(MouseEventKind::Wheel { amount, notches });
            }

            if let Some(settled) = phase.and_then(Phase::settle) {
                next.insert(key, settled);
            }
            true
        });

        // Listeners skipped this pass keep their phase while still held
        if previous.keys().any(|key| !visited.contains(key)) {
            let held: HashSet<usize> = self
                .listeners
                .members()
                .iter()
                .map(listener_key)
                .collect();
            for (key, phase) in previous {
                if !visited.contains(&key) && held.contains(&key) {
                    next.insert(key, phase);
                }
            }
        }

        *self.phases.lock() = next;
    }
}

fn button_statuses(state: ButtonState) -> impl Iterator<Item = ButtonStatus> {
    [
        (state.pressed, ButtonStatus::Pressed),
        (state.down, ButtonStatus::Down),
        (state.released, ButtonStatus::Released),
    ]
    .into_iter()
    .filter_map(|(active, status)| active.then_some(status))
}

impl Handled for MouseHandler {
    fn is_dead(&self) -> &StateOperator {
        self.listeners.is_dead()
    }

    fn handling_operators(&self) -> Option<&HandlingOperators> {
        self.listeners.handling_operators()
    }
}

impl Actor for MouseHandler {
    fn act(&self, delta_time: f64) {
        let frame = self.take_frame();
        self.dispatch_frame(&frame, delta_time);
    }
}

impl Participant for MouseHandler {
    fn as_actor(self: Arc<Self>) -> Option<Arc<dyn Actor>> {
        Some(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl RelayedHandler for MouseHandler {
    fn handler_type(&self) -> HandlerType {
        HandlerType::Mouse
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
        if let Some(previous) = previous.downcast_ref::<MouseHandler>() {
            self.listeners.transfer_from(&previous.listeners);
            true
        } else if let Some(previous) = previous.downcast_ref::<Handler<dyn MouseListener>>() {
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
