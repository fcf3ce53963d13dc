//! End-to-end runs of the `aigmos` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use aigmos::exit_codes;
use tempfile::TempDir;

fn aigmos(dir: &Path, args: &[&str]) -> Output {
    let config = dir.join("none.toml");
    Command::new(env!("CARGO_BIN_EXE_aigmos"))
        .current_dir(dir)
        .arg("--config")
        .arg(&config)
        .args(args)
        .output()
        .expect("run aigmos")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf8 stdout")
}

#[test]
fn state_survives_between_invocations() {
    let temp = TempDir::new().expect("temp");
    let state = temp.path().join("state.db");
    let state = state.to_str().expect("utf8 path");

    let first = aigmos(
        temp.path(),
        &["--state", state, "-c", "mk $notes", "-c", "add.item $notes:greet hello"],
    );
    assert!(first.status.success(), "{first:?}");
    assert_eq!(stdout(&first), "OK\nOK\n");

    let second = aigmos(temp.path(), &["--state", state, "-c", "cat $notes:greet"]);
    assert!(second.status.success(), "{second:?}");
    assert_eq!(stdout(&second), "hello\n");
}

#[test]
fn state_keeps_table_keys_containing_colons() {
    let temp = TempDir::new().expect("temp");
    let state = temp.path().join("state.db");
    let state = state.to_str().expect("utf8 path");
    let src = temp.path().join("src");
    fs::create_dir_all(&src).expect("mkdir");
    fs::write(src.join("a:b.txt"), "colon").expect("write");
    let import = format!("import.many {} #proj", src.display());

    let first = aigmos(
        temp.path(),
        &["--state", state, "-c", "mk $keep", "-c", "add.item $keep:k v", "-c", &import],
    );
    assert!(first.status.success(), "{first:?}");
    assert_eq!(
        stdout(&first),
        "OK\nOK\nOK imported=1 skipped_ignore=0 skipped_binary=0 skipped_other=0\n"
    );

    let second = aigmos(
        temp.path(),
        &["--state", state, "-c", "cat $keep:k", "-c", "ls #proj"],
    );
    assert!(second.status.success(), "{second:?}");
    assert_eq!(stdout(&second), "v\na:b.txt\n");
}

#[test]
fn script_skips_comments_and_stops_at_quit() {
    let temp = TempDir::new().expect("temp");
    let script = temp.path().join("setup.aig");
    fs::write(
        &script,
        "// seed the store\nmk $a\n\nls $\nquit\nmk $never\n",
    )
    .expect("write script");

    let output = aigmos(
        temp.path(),
        &["--script", script.to_str().expect("utf8 path")],
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output), "OK\na\n");
}

#[test]
fn command_errors_are_replies_not_exit_codes() {
    let temp = TempDir::new().expect("temp");
    let output = aigmos(temp.path(), &["-c", "bogus", "-c", "cat $nope:x"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        stdout(&output),
        "Unknown command\nError: Sub not found: kv/texts/nope\n"
    );
}

#[test]
fn invalid_config_exits_invalid() {
    let temp = TempDir::new().expect("temp");
    let config = temp.path().join("bad.toml");
    fs::write(&config, "expand_max_passes = 0\n").expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_aigmos"))
        .current_dir(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["-c", "ls $"])
        .output()
        .expect("run aigmos");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expand_max_passes must be > 0"), "{stderr}");
}
