use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary runs from an empty directory with an empty home, so neither a
/// `.env` nor a user config.yaml leaks into the assertions. Keep the
/// returned directory alive until the command has run.
fn relay() -> (Command, TempDir) {
    let sandbox = tempfile::tempdir().unwrap();
    let home = sandbox.path().join("home");
    std::fs::create_dir_all(home.join(".config")).unwrap();

    let mut cmd = Command::cargo_bin("relay").unwrap();
    cmd.current_dir(sandbox.path())
        .env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join(".config"));
    for key in [
        "RAPIDAPI_KEY",
        "SUPADATA_API_KEY",
        "FIRECRAWL_API_KEY",
        "OPENROUTER_API_KEY",
        "OPENROUTER_MODEL_NAME",
        "PROXY_URL",
        "WEBSHARE_PROXY_USERNAME",
        "WEBSHARE_PROXY_PASSWORD",
        "PORT",
        "CORS_ORIGINS",
    ] {
        cmd.env_remove(key);
    }
    (cmd, sandbox)
}

#[test]
fn help_lists_subcommands() {
    let (mut cmd, _sandbox) = relay();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("transcript"))
        .stdout(predicate::str::contains("providers"));
}

#[test]
fn providers_without_credentials_is_direct_only() {
    let (mut cmd, _sandbox) = relay();
    cmd.arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. direct"))
        .stdout(predicate::str::contains("rapidapi").not());
}

#[test]
fn providers_with_rapidapi_key_puts_it_first() {
    let (mut cmd, _sandbox) = relay();
    cmd.arg("providers")
        .env("RAPIDAPI_KEY", "test-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. rapidapi"))
        .stdout(predicate::str::contains("2. direct"));
}

#[test]
fn config_show_masks_secrets() {
    let (mut cmd, _sandbox) = relay();
    cmd.args(["config", "--show"])
        .env("OPENROUTER_API_KEY", "sk-or-very-secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("OpenRouter Key: set"))
        .stdout(predicate::str::contains("sk-or-very-secret").not());
}

#[test]
fn transcript_requires_url() {
    let (mut cmd, _sandbox) = relay();
    cmd.arg("transcript").assert().failure();
}

#[test]
fn config_file_is_read_from_working_directory() {
    let (mut cmd, sandbox) = relay();
    std::fs::write(
        sandbox.path().join("config.yaml"),
        "providers:\n  direct_enabled: false\n",
    )
    .unwrap();

    cmd.arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("(none configured)"));
}
