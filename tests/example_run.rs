//! Integration tests for the `example run` command.
use evalloc::cli::RunOpts;
use evalloc::cli::example::handle_example_run_command;
use evalloc::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("EVALLOC_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        overwrite: false,
    };
    handle_example_run_command("existing_capacity", &opts, Some(Settings::default())).unwrap();
    assert!(tempdir.path().join("public_charging_events.csv").is_file());
}
