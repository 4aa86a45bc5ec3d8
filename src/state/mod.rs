//! Boolean state propagation
//!
//! Object death, activity and dependency chains are all expressed as
//! [`StateOperator`]s. Handlers watch them to decide what to reap and whom to
//! skip.

mod handling;
mod operator;

pub use handling::HandlingOperators;
pub use operator::{
    AggregateMode, DerivationKind, MemberRole, MemberStates, StateListener, StateOperator,
};
pub(crate) use operator::WeakStateOperator;
