use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn copyflash(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("copyflash").expect("binary exists");
    cmd.current_dir(home)
        .env("XDG_CONFIG_HOME", home.join("xdg"))
        .env_remove("COPYFLASH_BACKGROUND")
        .env_remove("COPYFLASH_FOREGROUND")
        .env_remove("COPYFLASH_BLINK_COUNT")
        .env_remove("COPYFLASH_BLINK_INTERVAL_MS");
    cmd
}

#[test]
fn help_displays_usage() {
    let temp = tempfile::tempdir().expect("tempdir");
    copyflash(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn color_prints_rgba() {
    let temp = tempfile::tempdir().expect("tempdir");
    copyflash(temp.path())
        .args(["color", "#FF000080"])
        .assert()
        .success()
        .stdout("#FF000080\n");

    copyflash(temp.path())
        .args(["color", "not a color"])
        .assert()
        .success()
        .stdout("#FFFF00FF\n");
}

#[test]
fn copy_restores_carets_and_prints_text() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("main.rs");
    fs::write(&file, "let alpha = 1;\nlet beta = 2;\n").expect("write source");

    copyflash(temp.path())
        .arg("copy")
        .arg(&file)
        .args(["--caret", "4..9", "--caret", "1:0"])
        .args(["--no-clipboard", "--print", "--interval-ms", "50"])
        .assert()
        .success()
        .stdout(
            "copied 2 range(s), session restored\n\
             caret @9 [4..9]\n\
             caret @28\n\
             alpha\n\
             let beta = 2;\n",
        );
}

#[test]
fn copy_rejects_intervals_below_settings_range() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("main.rs");
    fs::write(&file, "fn main() {}\n").expect("write source");

    copyflash(temp.path())
        .arg("copy")
        .arg(&file)
        .args(["--caret", "0:0", "--no-clipboard", "--interval-ms", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--interval-ms"));
}

#[test]
fn copy_rejects_carets_past_the_end() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("short.txt");
    fs::write(&file, "one line\n").expect("write source");

    copyflash(temp.path())
        .arg("copy")
        .arg(&file)
        .args(["--caret", "7:0", "--no-clipboard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("past the end"));
}

#[test]
fn config_reads_workspace_layer() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(temp.path().join(".git")).expect("git dir");
    fs::create_dir_all(temp.path().join(".copyflash")).expect("config dir");
    fs::write(
        temp.path().join(".copyflash/config.toml"),
        "[blink]\ncount = 4\n",
    )
    .expect("write config");

    copyflash(temp.path())
        .args(["config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 4"))
        .stdout(predicate::str::contains("\"interval_ms\": 150"));
}
