//! PROCGUIDE_* environment overrides.
//!
//! Environment is process-wide, so these cases live in their own test binary.

use std::env;
use std::fs;

use tempfile::TempDir;

use procguide::application::ApplicationError;
use procguide::config::Settings;

#[test]
fn given_env_overrides_when_loading_then_env_wins_over_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("procguide.toml");
    fs::write(&path, "[cache]\ncapacity = 5\n").unwrap();

    env::set_var("PROCGUIDE_CACHE__CAPACITY", "250");
    env::set_var("PROCGUIDE_GENERATOR__STRATEGIES", "simplified,minimal");
    let settings = Settings::load(Some(&path));
    env::set_var("PROCGUIDE_CACHE__CAPACITY", "-1");
    let negative = Settings::load(Some(&path));
    env::remove_var("PROCGUIDE_CACHE__CAPACITY");
    env::remove_var("PROCGUIDE_GENERATOR__STRATEGIES");

    let settings = settings.unwrap();
    assert_eq!(settings.cache.capacity, 250);
    assert_eq!(settings.generator.strategies, vec!["simplified", "minimal"]);
    assert!(matches!(negative, Err(ApplicationError::Config { .. })));
}
