//! Error types

use thiserror::Error;

use crate::handler::HandlerType;

/// Failures reported by type-checked handler entry points
///
/// Both variants mean the caller wired the system up incorrectly; neither is
/// worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The object lacks the capability the handler manages
    #[error("object cannot be held by the {handler_type} handler")]
    TypeMismatch { handler_type: HandlerType },

    /// No handler is registered under the requested tag
    #[error("no {0} handler is registered")]
    NotRegistered(HandlerType),
}
