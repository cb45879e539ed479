use std::{
    fs,
    path::Path,
    process::{Command, Output, Stdio},
};

use tempfile::tempdir;

use crate::common::{seed_store, BINARY_PATH};

const STACKEYE_ENV: [&str; 6] = [
    "STACKEYE_CONFIG",
    "STACKEYE_API_URL",
    "STACKEYE_LOGIN_TIMEOUT_SECS",
    "STACKEYE_VERIFY_TIMEOUT_SECS",
    "STACKEYE_SHUTDOWN_GRACE_SECS",
    "STACKEYE_NON_INTERACTIVE",
];

fn run(config: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(BINARY_PATH);
    for key in STACKEYE_ENV {
        command.env_remove(key);
    }
    command
        .args(args)
        .arg("--config")
        .arg(config)
        .stdin(Stdio::null())
        .output()
        .expect("process should start")
}

#[test]
fn repeat_login_non_interactive_reports_already_logged_in() {
    let temp = tempdir().expect("can create temporary directory");
    let config = temp.path().join("config.toml");
    seed_store(&config, &[("acme-corp", "https://api.stackeye.io", "se_existing")]);
    let before = fs::read_to_string(&config).expect("seeded config");

    let output = run(&config, &["login", "--non-interactive", "--no-browser"]);

    assert_eq!(output.status.code(), Some(3), "already-logged-in exit code expected");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already logged in"), "stderr: {stderr}");
    assert!(
        !stderr.contains("cli-auth"),
        "no authorization URL may be printed: {stderr}"
    );
    assert_eq!(fs::read_to_string(&config).expect("config"), before);
}

#[test]
fn repeat_login_without_tty_declines_prompt() {
    let temp = tempdir().expect("can create temporary directory");
    let config = temp.path().join("config.toml");
    seed_store(&config, &[("acme-corp", "https://api.stackeye.io", "se_existing")]);

    let output = run(&config, &["login", "--no-browser"]);

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn plain_http_remote_api_url_is_a_usage_error() {
    let temp = tempdir().expect("can create temporary directory");
    let config = temp.path().join("config.toml");

    let output = run(
        &config,
        &["login", "--no-browser", "--api-url", "http://api.stackeye.io"],
    );

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("api_url"), "stderr: {stderr}");
    assert!(!config.exists());
}

#[test]
fn logout_clears_key_and_keeps_context() {
    let temp = tempdir().expect("can create temporary directory");
    let config = temp.path().join("config.toml");
    seed_store(&config, &[("acme-corp", "https://api.stackeye.io", "se_existing")]);

    let output = run(&config, &["logout"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("acme-corp"), "stdout: {stdout}");
    let text = fs::read_to_string(&config).expect("config");
    assert!(text.contains("[contexts.acme-corp]"), "config: {text}");
    assert!(!text.contains("se_existing"), "config: {text}");
}

#[test]
fn logout_of_unknown_context_fails() {
    let temp = tempdir().expect("can create temporary directory");
    let config = temp.path().join("config.toml");
    seed_store(&config, &[("acme-corp", "https://api.stackeye.io", "se_existing")]);

    let output = run(&config, &["logout", "--context", "ghost"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ghost"), "stderr: {stderr}");
    assert!(stderr.contains("hint:"), "stderr: {stderr}");
}

#[test]
fn corrupt_config_is_reported_not_overwritten() {
    let temp = tempdir().expect("can create temporary directory");
    let config = temp.path().join("config.toml");
    fs::write(&config, "current_context = [").expect("write corrupt config");

    let output = run(&config, &["login", "--no-browser", "--non-interactive"]);

    assert_eq!(output.status.code(), Some(6));
    assert_eq!(
        fs::read_to_string(&config).expect("config"),
        "current_context = ["
    );
}
