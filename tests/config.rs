//! Integration tests for configuration loading

use std::fs;

use handled::app::{AppConfig, TickConfig};

#[test]
fn test_loads_profile_from_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join("bench.toml"),
        "[tick]\ntarget_rate = 120.0\nmin_rate = 20.0\ntime_scale = 0.5\n\n[logging]\nfilter = \"trace\"\n",
    )
    .expect("write profile");

    let config = AppConfig::load_from_dir(dir.path(), "bench").expect("profile should load");
    assert_eq!(config.profile, "bench");
    assert_eq!(
        config.tick,
        TickConfig {
            target_rate: 120.0,
            min_rate: 20.0,
            time_scale: 0.5,
        }
    );
    assert_eq!(config.logging.filter, "trace");
}

#[test]
fn test_missing_profile_uses_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = AppConfig::load_from_dir(dir.path(), "absent").expect("defaults should load");
    assert_eq!(config.profile, "absent");
    assert_eq!(config.tick, TickConfig::default());
}

#[test]
fn test_invalid_rates_are_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join("broken.toml"),
        "[tick]\ntarget_rate = 10.0\nmin_rate = 30.0\ntime_scale = 1.0\n",
    )
    .expect("write profile");

    let err = AppConfig::load_from_dir(dir.path(), "broken").expect_err("rates are inverted");
    assert!(err.to_string().contains("min_rate"));
}

#[test]
fn test_shipped_profiles_are_valid() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
    for profile in ["debug", "release"] {
        let config = AppConfig::load_from_dir(&dir, profile).expect("shipped profile");
        assert!(config.tick.validate().is_ok());
    }
}
