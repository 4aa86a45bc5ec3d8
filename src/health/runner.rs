//! Test runner for orchestrating health checks

use std::time::Instant;

use tracing::{debug, warn};

use super::check::{CheckResult, CheckStatus, SystemCheck};

/// Results from running a health check suite
#[derive(Debug)]
pub struct HealthCheckReport {
    /// Individual check results with their system names
    pub results: Vec<(String, CheckResult)>,
    pub total: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
}

impl HealthCheckReport {
    fn from_results(results: Vec<(String, CheckResult)>) -> Self {
        let count = |status: CheckStatus| {
            results
                .iter()
                .filter(|(_, result)| result.status == status)
                .count()
        };
        let (passed, warned, failed) = (
            count(CheckStatus::Pass),
            count(CheckStatus::Warn),
            count(CheckStatus::Fail),
        );
        Self {
            total: results.len(),
            results,
            passed,
            warned,
            failed,
        }
    }

    /// Returns true if all checks passed (no failures)
    pub fn is_healthy(&self) -> bool {
        self.failed == 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warned > 0
    }

    /// Returns the appropriate exit code for this report
    /// 0 = all pass, 1 = any fail, 2 = any warn (but no fail)
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else if self.warned > 0 {
            2
        } else {
            0
        }
    }

    /// Looks up the result of the check with the given name
    pub fn result(&self, name: &str) -> Option<&CheckResult> {
        self.results
            .iter()
            .find(|(check, _)| check == name)
            .map(|(_, result)| result)
    }
}

/// Orchestrates running health checks and collecting results
#[derive(Default)]
pub struct HealthCheckRunner {
    checks: Vec<Box<dyn SystemCheck>>,
}

impl HealthCheckRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_check<C: SystemCheck + 'static>(mut self, check: C) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Runs all registered checks in order and returns a report
    pub fn run(self) -> HealthCheckReport {
        let results = self
            .checks
            .into_iter()
            .map(|check| {
                let name = check.name();
                let start = Instant::now();
                let result = check.check().with_duration(start.elapsed());

                if result.status.is_fail() {
                    warn!(check = name, message = %result.message, "Health check failed");
                } else {
                    debug!(check = name, status = ?result.status, "Health check finished");
                }
                (name.to_string(), result)
            })
            .collect();

        HealthCheckReport::from_results(results)
    }
}
