//! Input normalization
//!
//! Raw signals from a windowing layer (pointer position, button and key
//! up/down, wheel turns) are accumulated between ticks and folded into
//! discrete, edge-triggered events on each `act`:
//!
//! ```text
//! set_position / set_button_state / wheel_turn ──► MouseState ─┐
//! on_key_pressed / on_key_released ─────────────► KeyboardState┤
//!                                                               ▼
//!                                   act(delta) ─► events ─► selector ─► listener
//! ```
//!
//! Pulses (`pressed`, `released`, `entered`, `exited`) last exactly one tick;
//! levels (`down`, `over`) persist while the condition holds.

mod area;
mod events;
mod keyboard;
mod mouse;
mod selector;
mod state;

pub use area::Rect;
pub use events::{
    ButtonStatus, ContentType, KeyContent, KeyEvent, MouseButton, MouseEvent, MouseEventKind,
    MovementType, Position, Scale,
};
pub use keyboard::{KeyHandler, KeyListener};
pub use mouse::{MouseHandler, MouseListener};
pub use selector::EventSelector;
pub use state::{ButtonState, KeyboardState, MouseState};
