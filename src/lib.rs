//! Handled
//!
//! Object lifecycle and event dispatch: handler collections with deferred
//! admission and reaping, boolean state operators that drive death and
//! enablement, and edge-triggered mouse and key event handlers.

/// Configuration, input handlers and the tick loop
pub mod app;

/// Build-time information (timestamp, target, compiler version)
pub mod build_info;

pub mod error;

/// Handler collections, the relay and the actor/drawable specializations
pub mod handler;

/// Health check system for validating the engine and its configuration
pub mod health;

/// Boolean state cells and their derived variants
pub mod state;

pub use error::HandlerError;
