//! Core health check trait and types

use std::time::Duration;

/// Status of a system check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckStatus {
    Pass,
    /// Passed, but something deserves a look
    Warn,
    Fail,
}

impl CheckStatus {
    /// Returns true if the check passed (Pass or Warn)
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Pass | CheckStatus::Warn)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, CheckStatus::Fail)
    }

    /// Returns the status as a colored string
    pub fn as_colored_str(&self) -> String {
        use colored::Colorize;
        match self {
            CheckStatus::Pass => "PASS".green().to_string(),
            CheckStatus::Warn => "WARN".yellow().to_string(),
            CheckStatus::Fail => "FAIL".red().to_string(),
        }
    }
}

/// Result of a system check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub status: CheckStatus,
    /// Brief message describing the result
    pub message: String,
    pub details: Option<String>,
    pub duration: Duration,
}

impl CheckResult {
    fn with_status(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            duration: Duration::ZERO,
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Pass, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Warn, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Fail, message)
    }

    /// Adds optional details to the result
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Detail lines gathered while a check runs
///
/// Each expectation adds one marked line; the worst outcome decides the
/// final status.
#[derive(Debug, Default)]
pub struct Findings {
    lines: Vec<String>,
    worst: Option<CheckStatus>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, status: CheckStatus, mark: &str, line: String) {
        self.lines.push(format!("  {} {}", mark, line));
        self.worst = Some(self.worst.map_or(status, |worst| worst.max(status)));
    }

    pub fn ok(&mut self, line: impl Into<String>) {
        self.record(CheckStatus::Pass, "✓", line.into());
    }

    pub fn warn(&mut self, line: impl Into<String>) {
        self.record(CheckStatus::Warn, "⚠", line.into());
    }

    pub fn fail(&mut self, line: impl Into<String>) {
        self.record(CheckStatus::Fail, "✗", line.into());
    }

    /// Records `line` as passed when `condition` holds, failed otherwise
    pub fn expect(&mut self, condition: bool, line: impl Into<String>) -> bool {
        if condition {
            self.ok(line);
        } else {
            self.fail(line);
        }
        condition
    }

    pub fn status(&self) -> CheckStatus {
        self.worst.unwrap_or(CheckStatus::Pass)
    }

    /// Builds the result, picking the message that matches the outcome
    pub fn finish(self, passed: impl Into<String>, failed: impl Into<String>) -> CheckResult {
        let result = match self.status() {
            CheckStatus::Pass => CheckResult::pass(passed),
            CheckStatus::Warn => CheckResult::warn(format!("{} (with warnings)", passed.into())),
            CheckStatus::Fail => CheckResult::fail(failed),
        };
        result.with_details(self.lines.join("\n"))
    }
}

/// Trait for system health checks
pub trait SystemCheck {
    /// Name of the system being checked
    fn name(&self) -> &'static str;

    fn check(&self) -> CheckResult;

    /// Optional description of what this check validates
    fn description(&self) -> Option<&'static str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_findings_keep_worst_status() {
        let mut findings = Findings::new();
        findings.ok("first");
        findings.warn("second");
        assert_eq!(findings.status(), CheckStatus::Warn);
        assert!(!findings.expect(false, "third"));

        let result = findings.finish("fine", "broken");
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.message, "broken");
        assert_eq!(result.details.map(|d| d.lines().count()), Some(3));
    }

    #[test]
    fn test_empty_findings_pass() {
        let result = Findings::new().finish("fine", "broken");
        assert!(result.status.is_ok());
        assert_eq!(result.message, "fine");
    }
}
