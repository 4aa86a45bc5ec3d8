//! Depth-ordered draw dispatch

use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

use super::{Capability, Handled, Handler, HandlerType, Participant};

/// An object painted onto some surface
///
/// The surface type belongs to the rendering backend; implementors downcast
/// it to whatever they draw with.
pub trait Drawable: Handled {
    fn draw(&self, surface: &mut dyn Any);

    /// Larger depths are farther away and drawn first
    fn depth(&self) -> i32;
}

/// A handler drawing its live, enabled members from back to front
pub type DrawableHandler = Handler<dyn Drawable>;

fn farther_first(a: &(dyn Drawable + 'static), b: &(dyn Drawable + 'static)) -> Ordering {
    b.depth().cmp(&a.depth())
}

impl Handler<dyn Drawable> {
    /// Creates a drawable handler that keeps its members in depth order
    pub fn by_depth() -> Arc<Self> {
        let handler = Self::new(HandlerType::Drawable);
        handler.set_ordering(farther_first);
        handler
    }

    /// Re-sorts after members changed their depth
    pub fn resort(&self) {
        self.sort_by(farther_first);
    }
}

impl Drawable for Handler<dyn Drawable> {
    fn draw(&self, surface: &mut dyn Any) {
        self.dispatch(true, |drawable| {
            drawable.draw(surface);
            true
        });
    }

    /// Nested handlers sit at depth zero
    fn depth(&self) -> i32 {
        0
    }
}

impl Capability for dyn Drawable {
    fn from_participant(participant: &Arc<dyn Participant>) -> Option<Arc<Self>> {
        Arc::clone(participant).as_drawable()
    }
}

impl Participant for Handler<dyn Drawable> {
    fn as_drawable(self: Arc<Self>) -> Option<Arc<dyn Drawable>> {
        Some(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering as AtomicOrdering};

    use super::*;
    use crate::state::StateOperator;

    struct Sprite {
        name: &'static str,
        depth: AtomicI32,
        dead: StateOperator,
    }

    impl Sprite {
        fn new(name: &'static str, depth: i32) -> Arc<Self> {
            Arc::new(Self {
                name,
                depth: AtomicI32::new(depth),
                dead: StateOperator::default(),
            })
        }
    }

    impl Handled for Sprite {
        fn is_dead(&self) -> &StateOperator {
            &self.dead
        }
    }

    impl Drawable for Sprite {
        fn draw(&self, surface: &mut dyn Any) {
            if let Some(log) = surface.downcast_mut::<Vec<&'static str>>() {
                log.push(self.name);
            }
        }

        fn depth(&self) -> i32 {
            self.depth.load(AtomicOrdering::SeqCst)
        }
    }

    #[test]
    fn test_draws_back_to_front() {
        let drawables = DrawableHandler::by_depth();
        drawables.add(Sprite::new("hud", -10));
        drawables.add(Sprite::new("sky", 100));
        drawables.add(Sprite::new("player", 0));

        let mut canvas: Vec<&'static str> = Vec::new();
        drawables.draw(&mut canvas);
        assert_eq!(canvas, vec!["sky", "player", "hud"]);
    }

    #[test]
    fn test_resort_after_depth_change() {
        let drawables = DrawableHandler::by_depth();
        let player = Sprite::new("player", 0);
        drawables.add(player.clone());
        drawables.add(Sprite::new("tree", 5));
        drawables.settle();

        player.depth.store(10, AtomicOrdering::SeqCst);
        drawables.resort();

        let mut canvas: Vec<&'static str> = Vec::new();
        drawables.draw(&mut canvas);
        assert_eq!(canvas, vec!["player", "tree"]);
    }
}
