//! Discrete input events delivered to listeners

/// Pointer position, in whatever coordinates the input source uses
pub type Position = [f32; 2];

/// Mouse button identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

impl From<u16> for MouseButton {
    fn from(id: u16) -> Self {
        match id {
            0 => Self::Left,
            1 => Self::Right,
            2 => Self::Middle,
            other => Self::Other(other),
        }
    }
}

/// Where a listener sits in the enter, over, exit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementType {
    /// The pointer came into the listener's area this tick
    Enter,
    /// The pointer stays inside the listener's area
    Over,
    /// The pointer left the listener's area this tick
    Exit,
    /// The pointer moved, wherever it is
    Move,
}

/// Edge or level state of a button or key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonStatus {
    /// Went down this tick (edge)
    Pressed,
    /// Held down (level)
    Down,
    /// Came up this tick (edge)
    Released,
}

/// Whether the pointer was inside the receiving listener's area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scale {
    Global,
    Local,
}

/// What a mouse event reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseEventKind {
    Movement(MovementType),
    Button {
        button: MouseButton,
        status: ButtonStatus,
    },
    Wheel {
        amount: f64,
        notches: i32,
    },
}

/// A mouse event as delivered to one listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub position: Position,
    pub scale: Scale,
    /// Length of the tick that produced this event, in seconds
    pub delta_time: f64,
}

impl MouseEvent {
    /// Returns the movement type if this is a movement event
    pub fn movement(&self) -> Option<MovementType> {
        match self.kind {
            MouseEventKind::Movement(movement) => Some(movement),
            _ => None,
        }
    }

    /// Returns the button and its status if this is a button event
    pub fn button(&self) -> Option<(MouseButton, ButtonStatus)> {
        match self.kind {
            MouseEventKind::Button { button, status } => Some((button, status)),
            _ => None,
        }
    }

    pub fn is_wheel(&self) -> bool {
        matches!(self.kind, MouseEventKind::Wheel { .. })
    }
}

/// Whether a key is identified by character or by key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Char,
    Code,
}

/// A held or toggled key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyContent {
    Char(char),
    Code(u32),
}

impl KeyContent {
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Char(_) => ContentType::Char,
            Self::Code(_) => ContentType::Code,
        }
    }
}

/// A keyboard event as delivered to listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    pub status: ButtonStatus,
    pub key: KeyContent,
    /// Length of the tick that produced this event, in seconds
    pub delta_time: f64,
}

impl KeyEvent {
    pub fn content_type(&self) -> ContentType {
        self.key.content_type()
    }
}
