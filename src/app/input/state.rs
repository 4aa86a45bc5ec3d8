//! Raw input state folded between ticks

use indexmap::{IndexMap, IndexSet};

use super::events::{KeyContent, MouseButton, Position};

/// Level and edge flags for one button
///
/// `down` persists across ticks; `pressed` and `released` are pulses that
/// [`advance`](Self::advance) clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub down: bool,
    pub pressed: bool,
    pub released: bool,
}

impl ButtonState {
    /// Records a down signal; repeats while already down are ignored
    pub fn press(&mut self) {
        if !self.down {
            self.down = true;
            self.pressed = true;
        }
    }

    /// Records an up signal; ignored while already up
    pub fn release(&mut self) {
        if self.down {
            self.down = false;
            self.released = true;
        }
    }

    /// Drops the edge pulses for the next tick
    pub fn advance(self) -> Self {
        Self {
            down: self.down,
            pressed: false,
            released: false,
        }
    }

    /// Returns true if nothing is held and no pulse is pending
    pub fn is_idle(self) -> bool {
        !self.down && !self.pressed && !self.released
    }
}

/// Pointer state accumulated between ticks
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    pub position: Position,
    /// Whether the position changed since the last tick
    pub moved: bool,
    pub buttons: IndexMap<MouseButton, ButtonState>,
    /// Wheel turns as (amount, notches)
    pub wheel: Vec<(f64, i32)>,
}

impl MouseState {
    pub fn set_position(&mut self, position: Position) {
        if self.position != position {
            self.position = position;
            self.moved = true;
        }
    }

    pub fn set_button(&mut self, button: MouseButton, down: bool) {
        let state = self.buttons.entry(button).or_default();
        if down {
            state.press();
        } else {
            state.release();
        }
    }

    pub fn is_down(&self, button: MouseButton) -> bool {
        self.buttons.get(&button).is_some_and(|state| state.down)
    }

    /// Clears per-tick state, keeping position and held buttons
    pub fn advance(&mut self) {
        self.moved = false;
        self.wheel.clear();
        for state in self.buttons.values_mut() {
            *state = state.advance();
        }
        self.buttons.retain(|_, state| !state.is_idle());
    }
}

/// Keyboard state accumulated between ticks
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    pub down: IndexSet<KeyContent>,
    pub pressed: IndexSet<KeyContent>,
    pub released: IndexSet<KeyContent>,
}

impl KeyboardState {
    /// Records a down signal; auto-repeat while held does not pulse again
    pub fn press(&mut self, key: KeyContent) {
        if self.down.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: KeyContent) {
        if self.down.shift_remove(&key) {
            self.released.insert(key);
        }
    }

    pub fn is_down(&self, key: KeyContent) -> bool {
        self.down.contains(&key)
    }

    /// Clears the edge pulses for the next tick
    pub fn advance(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}
