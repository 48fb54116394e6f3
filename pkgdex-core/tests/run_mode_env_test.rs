//! Run-mode detection from the real process environment
//!
//! These tests mutate process-wide environment variables and must not run
//! concurrently with each other.

use pkgdex_core::config::INTERACTIVE_PAGE_CAP;
use pkgdex_core::RunMode;
use serial_test::serial;

const VARS: &[&str] = &["CI", "CONTINUOUS_INTEGRATION", "BUILD_NUMBER", "RUN_ID"];

fn clear_ci_env() -> Vec<(&'static str, Option<String>)> {
    VARS.iter()
        .map(|key| {
            let previous = std::env::var(key).ok();
            std::env::remove_var(key);
            (*key, previous)
        })
        .collect()
}

fn restore(saved: Vec<(&'static str, Option<String>)>) {
    for (key, value) in saved {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

#[test]
#[serial]
fn test_local_run_is_capped() {
    let saved = clear_ci_env();

    let mode = RunMode::detect();
    assert_eq!(mode, RunMode::Interactive);
    assert_eq!(mode.page_cap(), Some(INTERACTIVE_PAGE_CAP));

    restore(saved);
}

#[test]
#[serial]
fn test_ci_run_is_unbounded() {
    let saved = clear_ci_env();
    std::env::set_var("CI", "true");

    let mode = RunMode::detect();
    assert_eq!(mode, RunMode::Automated);
    assert_eq!(mode.page_cap(), None);

    restore(saved);
}

#[test]
#[serial]
fn test_ci_false_is_local() {
    let saved = clear_ci_env();
    std::env::set_var("CI", "false");

    assert_eq!(RunMode::detect(), RunMode::Interactive);

    restore(saved);
}
