#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

fn dockwright(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("dockwright").unwrap();
    cmd.current_dir(project.path())
        .env_remove("DOCKWRIGHT_CONFIG")
        .env("NO_COLOR", "1");
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("dockwright").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compose"))
        .stdout(predicate::str::contains("next-version"))
        .stdout(predicate::str::contains("build"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("dockwright").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dockwright"));
}

/// buildコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_build_help() {
    let mut cmd = Command::cargo_bin("dockwright").unwrap();
    cmd.arg("build")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--push"))
        .stdout(predicate::str::contains("--clone"));
}

/// 設定ファイルがない場合は非ゼロで終了する
#[test]
fn test_missing_config_fails() {
    let project = TestProject::new();
    dockwright(&project)
        .arg("compose")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

/// repository セクションなしで next-version は失敗する
#[test]
fn test_next_version_requires_repository() {
    let project = TestProject::new();
    project.write_config(
        r#"
        image {
            parent "alpine:3"
            selected "base"
            directory "docker"
        }
        "#,
    );

    dockwright(&project)
        .arg("next-version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("repository"));
}
