//! Application layer
//!
//! Configuration, input normalization, the tick loop and a headless demo
//! scene built on the handler engine.

pub mod config;
mod demo;
pub mod input;
mod runner;

pub use config::{AppConfig, LoggingConfig, TickConfig};
pub use demo::{DemoSummary, TargetReport, run_demo};
pub use runner::{StepHandler, TickStats};
