//! Integration tests for the `run` command.
use besched::cli::{RunOpts, handle_run_command};
use besched::settings::Settings;
use std::fs::read_to_string;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example scenario.
fn get_scenario_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("BESCHED_LOG_LEVEL", "off") };

    {
        // Save results to non-existent directory to check that directory creation works
        let tempdir = tempdir().unwrap();
        let output_dir = tempdir.path().join("results");
        let opts = RunOpts {
            output_dir: Some(output_dir.clone()),
        };
        handle_run_command(&get_scenario_dir(), &opts, Some(Settings::default())).unwrap();

        // One header line plus one line per scheduled timestep
        let grid = read_to_string(output_dir.join("grid.csv")).unwrap();
        assert_eq!(grid.lines().count(), 25);
    }

    // Second time will fail because the logging is already initialised
    let opts = RunOpts {
        output_dir: Some(tempdir().unwrap().path().join("results")),
    };
    assert_eq!(
        handle_run_command(&get_scenario_dir(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
