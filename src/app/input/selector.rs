//! Predicates choosing which events a listener receives

use std::fmt;
use std::sync::Arc;

use super::events::{
    ButtonStatus, ContentType, KeyContent, KeyEvent, MouseButton, MouseEvent, MovementType, Scale,
};

/// A cloneable event filter
pub struct EventSelector<E> {
    predicate: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E: 'static> EventSelector<E> {
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn accept_all() -> Self {
        Self::from_fn(|_| true)
    }

    pub fn reject_all() -> Self {
        Self::from_fn(|_| false)
    }

    pub fn accepts(&self, event: &E) -> bool {
        (self.predicate)(event)
    }

    pub fn and(self, other: Self) -> Self {
        Self::from_fn(move |event| self.accepts(event) && other.accepts(event))
    }

    pub fn or(self, other: Self) -> Self {
        Self::from_fn(move |event| self.accepts(event) || other.accepts(event))
    }

    pub fn negate(self) -> Self {
        Self::from_fn(move |event| !self.accepts(event))
    }
}

impl EventSelector<MouseEvent> {
    /// Movement events of the listed types
    pub fn movement(types: &[MovementType]) -> Self {
        let types = types.to_vec();
        Self::from_fn(move |event| event.movement().is_some_and(|m| types.contains(&m)))
    }

    /// Events for `button` with one of the listed statuses
    pub fn button(button: MouseButton, statuses: &[ButtonStatus]) -> Self {
        let statuses = statuses.to_vec();
        Self::from_fn(move |event| {
            event
                .button()
                .is_some_and(|(b, status)| b == button && statuses.contains(&status))
        })
    }

    pub fn wheel() -> Self {
        Self::from_fn(MouseEvent::is_wheel)
    }

    /// Events whose pointer position was inside the listener's area
    pub fn local() -> Self {
        Self::from_fn(|event: &MouseEvent| event.scale == Scale::Local)
    }
}

impl EventSelector<KeyEvent> {
    pub fn status(statuses: &[ButtonStatus]) -> Self {
        let statuses = statuses.to_vec();
        Self::from_fn(move |event: &KeyEvent| statuses.contains(&event.status))
    }

    pub fn content_type(content_type: ContentType) -> Self {
        Self::from_fn(move |event: &KeyEvent| event.content_type() == content_type)
    }

    pub fn key(key: KeyContent) -> Self {
        Self::from_fn(move |event: &KeyEvent| event.key == key)
    }
}

impl<E> Clone for EventSelector<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<E> fmt::Debug for EventSelector<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSelector").finish_non_exhaustive()
    }
}
