//! Per-handler-type switches deciding whether a handler processes an object

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::StateOperator;
use crate::handler::HandlerType;

/// A small relay of "should handler type X currently process me" operators
///
/// Every handler type reads the shared default operator unless an override
/// has been installed for it.
#[derive(Debug)]
pub struct HandlingOperators {
    default: StateOperator,
    overrides: RwLock<IndexMap<HandlerType, StateOperator>>,
}

impl HandlingOperators {
    /// Creates a relay whose shared default starts enabled
    pub fn new() -> Self {
        Self::with_default(StateOperator::mutable(true))
    }

    /// Creates a relay around an existing shared default
    pub fn with_default(default: StateOperator) -> Self {
        Self {
            default,
            overrides: RwLock::new(IndexMap::new()),
        }
    }

    /// The operator shared by every handler type without an override
    pub fn default_operator(&self) -> &StateOperator {
        &self.default
    }

    /// Returns the operator consulted by `handler_type`
    pub fn get(&self, handler_type: HandlerType) -> StateOperator {
        self.overrides
            .read()
            .get(&handler_type)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    /// Installs a dedicated operator for `handler_type`, returning the old one
    pub fn set(&self, handler_type: HandlerType, operator: StateOperator) -> Option<StateOperator> {
        self.overrides.write().insert(handler_type, operator)
    }

    /// Drops the override for `handler_type` so it reads the default again
    pub fn reset(&self, handler_type: HandlerType) -> Option<StateOperator> {
        self.overrides.write().shift_remove(&handler_type)
    }

    /// Returns whether `handler_type` should currently process the owner
    pub fn is_handled_by(&self, handler_type: HandlerType) -> bool {
        self.get(handler_type).get_state()
    }
}

impl Default for HandlingOperators {
    fn default() -> Self {
        Self::new()
    }
}
