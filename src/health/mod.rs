//! Health check system for validating the engine and its configuration
//!
//! Useful for:
//! - Validating a build before shipping it
//! - CI health checks
//! - Debugging configuration problems
//!
//! # Example
//!
//! ```no_run
//! use handled::health::{HealthCheckRunner, checks::*};
//!
//! let report = HealthCheckRunner::new()
//!     .add_check(ConfigCheck::new())
//!     .add_check(HandlerLifecycleCheck::new())
//!     .run();
//!
//! if report.is_healthy() {
//!     println!("All systems operational!");
//! }
//! ```

pub mod check;
pub mod checks;
pub mod reporter;
pub mod runner;

pub use check::{CheckResult, CheckStatus, Findings, SystemCheck};
pub use reporter::{format_details, format_report, print_report};
pub use runner::{HealthCheckReport, HealthCheckRunner};

/// Runs all default health checks and returns a report
pub fn run_all_checks() -> HealthCheckReport {
    HealthCheckRunner::new()
        .add_check(checks::ConfigCheck::new())
        .add_check(checks::BuildInfoCheck::new())
        .add_check(checks::HandlerLifecycleCheck::new())
        .add_check(checks::InputPipelineCheck::new())
        .run()
}
