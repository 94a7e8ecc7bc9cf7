use assert_cmd::Command;

#[test]
fn help_mentions_core_flags() {
    let output = Command::cargo_bin("versetype")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    assert!(stdout.contains("--book"));
    assert!(stdout.contains("--chapter"));
    assert!(stdout.contains("--mode"));
    assert!(stdout.contains("--random"));
}

#[test]
fn version_prints() {
    Command::cargo_bin("versetype")
        .unwrap()
        .arg("--version")
        .assert()
        .success();
}

#[test]
fn refuses_non_tty_stdin() {
    // Under a test harness stdin is a pipe, so the tty guard must trip
    // before any terminal setup happens.
    Command::cargo_bin("versetype").unwrap().assert().failure();
}
