use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command isolated from the developer's config files and environment.
fn deskpilot(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("deskpilot").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("APPDATA", home.path())
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY");
    for var in [
        "DESKPILOT_MODEL",
        "DESKPILOT_PROVIDER",
        "DESKPILOT_API_KEY",
        "DESKPILOT_BASE_URL",
        "DESKPILOT_MAX_STEPS",
        "DESKPILOT_KEYBOARD_ONLY",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_prompt(home: &TempDir) -> std::path::PathBuf {
    let path = home.path().join("system_prompt.txt");
    std::fs::write(&path, "Return a JSON plan.").unwrap();
    path
}

#[test]
fn empty_objective_from_stdin_exits_1() {
    let home = TempDir::new().unwrap();
    let prompt = write_prompt(&home);

    deskpilot(&home)
        .args(["--provider", "remote", "--system-prompt"])
        .arg(&prompt)
        .write_stdin("   \n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No objective given."));
}

#[test]
fn empty_objective_exits_1_before_config_checks() {
    let home = TempDir::new().unwrap();

    // Default provider with no API key and no prompt file on disk
    deskpilot(&home)
        .write_stdin("\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No objective given."));
}

#[test]
fn missing_system_prompt_exits_2() {
    let home = TempDir::new().unwrap();

    deskpilot(&home)
        .args(["--provider", "remote", "--system-prompt", "nowhere.txt", "open", "notepad"])
        .assert()
        .code(2);
}

#[test]
fn openai_without_key_exits_2() {
    let home = TempDir::new().unwrap();
    let prompt = write_prompt(&home);

    deskpilot(&home)
        .arg("--system-prompt")
        .arg(&prompt)
        .arg("open notepad")
        .assert()
        .code(2);
}

#[test]
fn completions_print_and_exit_0() {
    let home = TempDir::new().unwrap();

    deskpilot(&home)
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deskpilot"));
}
