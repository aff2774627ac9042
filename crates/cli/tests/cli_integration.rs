use std::process::{Command, Output};

fn demo() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bade-demo"));
    cmd.env_remove("BADE_DEMO_STRICT").env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    demo()
        .args(args)
        .output()
        .expect("failed to run bade-demo")
}

fn dispatched(args: &[&str]) -> serde_json::Value {
    let out = run(args);
    assert!(
        out.status.success(),
        "bade-demo {args:?} failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|err| panic!("stdout is not JSON ({err}):\n{stdout}"))
}

#[test]
fn help_lists_commands() {
    let out = run(&["--help"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    for needle in [
        "$ bade-demo <command> [options]",
        "Available Commands",
        "build",
        "remote add",
        "-v, --version",
    ] {
        assert!(stdout.contains(needle), "missing {needle:?} in:\n{stdout}");
    }
    assert!(!stdout.contains("remote rm"), "aliases are not commands:\n{stdout}");
}

#[test]
fn command_help_shows_aliases() {
    let out = run(&["rr", "--help"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("$ bade-demo remote remove <name> [options]"), "{stdout}");
    assert!(stdout.contains("$ bade-demo remote rm"), "{stdout}");
    assert!(!stdout.contains("--version"), "{stdout}");
}

#[test]
fn version_prints_name_and_version() {
    let out = run(&["-v"]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        format!("bade-demo, {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn falls_back_to_the_default_command() {
    let v = dispatched(&["src"]);
    assert_eq!(v["command"], "build");
    assert_eq!(v["args"], serde_json::json!(["src"]));
    assert_eq!(v["options"]["output"], "dist");
    assert_eq!(v["options"]["o"], "dist");
    assert_eq!(v["options"]["jobs"], 4);
    assert_eq!(v["options"]["color"], true);
}

#[test]
fn alias_and_flags_reach_the_handler() {
    let v = dispatched(&["b", "-j", "8", "--watch", "--no-color"]);
    assert_eq!(v["command"], "build");
    assert_eq!(v["args"], serde_json::json!([null]));
    assert_eq!(v["options"]["jobs"], 8);
    assert_eq!(v["options"]["watch"], true);
    assert_eq!(v["options"]["w"], true);
    assert_eq!(v["options"]["color"], false);
}

#[test]
fn multi_word_commands_bind_positionals() {
    let v = dispatched(&["remote", "add", "origin", "https://example.com/repo.git"]);
    assert_eq!(v["command"], "remote add");
    assert_eq!(
        v["args"],
        serde_json::json!(["origin", "https://example.com/repo.git"])
    );

    let v = dispatched(&["remote", "rm", "origin"]);
    assert_eq!(v["command"], "remote remove");
    assert_eq!(v["args"], serde_json::json!(["origin"]));
    assert_eq!(v["options"]["_"], serde_json::json!([]));
}

#[test]
fn optional_slots_and_leftovers() {
    let v = dispatched(&["new", "app", "minimal", "extra"]);
    assert_eq!(v["args"], serde_json::json!(["app", "minimal"]));
    assert_eq!(v["options"]["_"], serde_json::json!(["extra"]));
    assert_eq!(v["options"]["template-dir"], "templates");
}

#[test]
fn quiet_suppresses_output() {
    let out = run(&["build", "--quiet"]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn missing_arguments_exit_with_an_error() {
    let out = run(&["remote", "add", "origin"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("ERROR"), "{stderr}");
    assert!(stderr.contains("Insufficient arguments!"), "{stderr}");
    assert!(
        stderr.contains("Run `$ bade-demo remote add --help` for more info."),
        "{stderr}"
    );
    assert!(out.stdout.is_empty());
}

#[test]
fn strict_mode_rejects_unknown_flags() {
    let out = demo()
        .env("BADE_DEMO_STRICT", "1")
        .args(["build", "--nope"])
        .output()
        .expect("failed to run bade-demo");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Unknown option: --nope"), "{stderr}");

    let out = demo()
        .env("BADE_DEMO_STRICT", "1")
        .args(["build", "-j", "2"])
        .output()
        .expect("failed to run bade-demo");
    assert!(out.status.success());
}
