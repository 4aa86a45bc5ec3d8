//! Object collections and the dispatch engine
//!
//! A [`Handler`] owns one category of [`Handled`] objects and fans operations
//! out to them. The [`HandlerRelay`] keeps one handler per [`HandlerType`] and
//! broadcasts membership changes to all of them.

mod actor;
mod collection;
mod drawable;
mod relay;

use std::fmt;

use crate::state::{HandlingOperators, StateOperator};

pub use actor::{Actor, ActorHandler};
pub use collection::Handler;
pub use drawable::{Drawable, DrawableHandler};
pub use relay::{Capability, HandlerRelay, Participant, RelayedHandler};

/// Anything a [`Handler`] can manage
pub trait Handled: Send + Sync {
    /// Operator answering "am I dead"
    ///
    /// Once it reports true, every handler holding the object drops it on its
    /// next pass.
    fn is_dead(&self) -> &StateOperator;

    /// Per-handler-type switches deciding whether a handler processes this object
    ///
    /// Objects without them are always processed.
    fn handling_operators(&self) -> Option<&HandlingOperators> {
        None
    }
}

/// Category tag identifying one kind of handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerType {
    Actor,
    Drawable,
    Mouse,
    Key,
    /// Application-defined category
    Custom(&'static str),
}

impl fmt::Display for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actor => f.write_str("actor"),
            Self::Drawable => f.write_str("drawable"),
            Self::Mouse => f.write_str("mouse"),
            Self::Key => f.write_str("key"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}
