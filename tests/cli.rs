use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `stash` command isolated from the user's config and data directories
fn stash(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stash").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("STASH_PROXY_API_KEY")
        .env_remove("GROQ_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    stash(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("save"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_fetch_rejects_unsupported_url() {
    let home = TempDir::new().unwrap();
    stash(&home)
        .args(["--quiet", "fetch", "https://vimeo.com/12345"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid_url"));
}

#[test]
fn test_fetch_failure_as_json() {
    let home = TempDir::new().unwrap();
    stash(&home)
        .args(["--quiet", "fetch", "not a url", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""status": "failure""#))
        .stdout(predicate::str::contains(r#""error_kind": "invalid_url""#));
}

#[test]
fn test_list_on_empty_store() {
    let home = TempDir::new().unwrap();
    stash(&home)
        .args(["list", "--user", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved videos"));
}

#[test]
fn test_show_unknown_video_fails() {
    let home = TempDir::new().unwrap();
    stash(&home)
        .args(["show", "abc12345678"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Video not found"));
}

#[test]
fn test_config_show() {
    let home = TempDir::new().unwrap();
    stash(&home)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preferred Languages: en"));
}
