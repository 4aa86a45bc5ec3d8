//! Configuration system health check

use crate::app::AppConfig;
use crate::health::check::{CheckResult, Findings, SystemCheck};

/// Checks that configuration can be loaded and validated for all profiles
pub struct ConfigCheck {
    profiles: Vec<&'static str>,
}

impl ConfigCheck {
    /// Creates a new config check with default profiles
    pub fn new() -> Self {
        Self {
            profiles: vec!["debug", "release"],
        }
    }

    pub fn with_profiles(profiles: Vec<&'static str>) -> Self {
        Self { profiles }
    }
}

impl Default for ConfigCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for ConfigCheck {
    fn name(&self) -> &'static str {
        "Configuration"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates configuration loading from files and environment")
    }

    fn check(&self) -> CheckResult {
        let mut findings = Findings::new();

        for profile in &self.profiles {
            match AppConfig::load(profile) {
                Ok(config) => findings.ok(format!(
                    "Profile '{}': {} ticks/s (min {}), log filter '{}'",
                    profile, config.tick.target_rate, config.tick.min_rate, config.logging.filter
                )),
                Err(e) => findings.fail(format!("Profile '{}': {}", profile, e)),
            }
        }

        match AppConfig::load_from_env() {
            Ok(config) => findings.ok(format!("Environment config: profile '{}'", config.profile)),
            Err(e) => findings.warn(format!("Environment config: {}", e)),
        }

        findings.finish(
            format!("{} profiles validated", self.profiles.len()),
            "Failed to load one or more config profiles",
        )
    }
}
