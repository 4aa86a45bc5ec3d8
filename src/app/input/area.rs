//! Rectangular areas of interest

use super::events::Position;

/// Axis-aligned rectangle with inclusive edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos[0] >= self.x
            && pos[0] <= self.x + self.width
            && pos[1] >= self.y
            && pos[1] <= self.y + self.height
    }

    pub fn center(&self) -> Position {
        [self.x + self.width / 2.0, self.y + self.height / 2.0]
    }
}
