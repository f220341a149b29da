use std::path::Path;
use std::process::Command;

fn selftest(log_dir: &Path, extra_args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_spike_multilog_selftest"))
        .arg("--log-dir")
        .arg(log_dir)
        .args(extra_args)
        .output()
        .unwrap()
}

#[test]
fn should_write_both_layouts_and_exit_successfully() {
    // Arrange
    let tempdir = tempfile::tempdir().unwrap();
    let log_dir = tempdir.path().join("test_logs");

    // Act
    let output = selftest(&log_dir, &[]);

    // Assert
    assert!(output.status.success());
    for level in &["info", "warning", "error", "critical", "fatal"] {
        assert!(log_dir.join(format!("test_{}.log", level)).exists());
    }
    assert!(!log_dir.join("test_debug.log").exists());
    assert!(log_dir.join("test_raw.log").exists());

    let aggregate = std::fs::read_to_string(log_dir.join("test.log")).unwrap();
    assert!(aggregate.contains("AggregateFileStrategy online at "));
    assert!(!aggregate.contains("YOU SHOULD NOT SEE THIS LINE"));
    assert_eq!(1, aggregate.matches("exactly one line").count());
    assert!(!aggregate.contains("Exiting"));

    let fatal = std::fs::read_to_string(log_dir.join("test_fatal.log")).unwrap();
    assert!(fatal.contains("you should *not* see an exit line after this."));
    assert!(!fatal.contains("Exiting"));
}

#[test]
fn should_terminate_with_the_requested_exit_code() {
    // Arrange
    let tempdir = tempfile::tempdir().unwrap();
    let log_dir = tempdir.path().join("test_logs");

    // Act
    let output = selftest(&log_dir, &["--halt", "--exit-code", "7"]);

    // Assert
    assert_eq!(Some(7), output.status.code());
    let aggregate = std::fs::read_to_string(log_dir.join("test.log")).unwrap();
    assert!(aggregate.contains(" -   FATAL - test fatal -- you should see an exit line after this.\n"));
    assert!(aggregate.ends_with(" -   FATAL - Exiting 7\n"));
}
