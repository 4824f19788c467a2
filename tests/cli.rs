use assert_cmd::Command;
use predicates::prelude::*;

fn subdigest() -> Command {
    let mut cmd = Command::cargo_bin("subdigest").unwrap();
    cmd.env_remove("SUBDIGEST_API_KEY").env("RUST_LOG", "off");
    cmd
}

#[test]
fn providers_lists_both_services() {
    subdigest()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("dashscope"))
        .stdout(predicate::str::contains("qiniu"))
        .stdout(predicate::str::contains("qwen-plus"));
}

#[test]
fn resolve_rejects_unsupported_url_without_network() {
    subdigest()
        .args(["resolve", "not-a-url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported URL format"));
}

#[test]
fn process_requires_url() {
    subdigest()
        .arg("process")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn help_mentions_subcommands() {
    subdigest()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("resolve"));
}
