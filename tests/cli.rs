//! Runs of the `palms` binary.
#![cfg(feature = "serde")]

use std::process::Command;

fn palms(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_palms"))
        .args(args)
        .output()
        .expect("palms binary runs")
}

#[test]
fn failed_run_is_reported_once() {
    let out = palms(&["demo", "no-such-design"]);

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(stderr.matches("unknown design").count(), 1, "{stderr}");
}

#[test]
fn models_lists_every_rule() {
    let out = palms(&["models"]);

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 16);
    assert!(stdout.lines().any(|l| l == "Le Pelley Hybrid"));
}
