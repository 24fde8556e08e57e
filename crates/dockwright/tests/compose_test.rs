#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

fn compose(project: &TestProject) -> assert_cmd::assert::Assert {
    Command::cargo_bin("dockwright")
        .unwrap()
        .current_dir(project.path())
        .env_remove("DOCKWRIGHT_CONFIG")
        .env("NO_COLOR", "1")
        .arg("compose")
        .assert()
}

#[test]
fn test_compose_single_stage() {
    let project = TestProject::new();
    project.write_config(
        r#"
        image {
            parent "python:3.11-slim"
            selected "base, timezone"
            directory "docker"
        }
        tokens {
            timezone "Asia/Tokyo"
        }
        "#,
    );
    project.write_fragment("base", "python", "Dockerfile", "RUN pip install -U pip\n");
    project.write_fragment("timezone", "python", "Dockerfile", "ENV TZ=@TIMEZONE@\n");
    project.write_fragment("timezone", "python", "tz.sh", "#!/bin/sh\n");

    compose(&project).success();

    assert_eq!(
        project.read("docker/Dockerfile"),
        "FROM python:3.11-slim\nRUN pip install -U pip\nENV TZ=Asia/Tokyo\n"
    );
    assert_eq!(project.read("docker/tz.sh"), "#!/bin/sh\n");
}

#[test]
fn test_compose_multi_stage() {
    let project = TestProject::new();
    project.write_config(
        r#"
        image {
            parent "openjdk:17"
            selected "runtime"
            directory "out"
        }
        build-image {
            parent "openjdk:17"
            selected "compile"
        }
        tokens {
            exec "mvnw package"
        }
        "#,
    );
    project.write_fragment("compile", "openjdk", "Dockerfile", "RUN @EXEC@\n");
    project.write_fragment("runtime", "openjdk", "Dockerfile", "CMD java -jar app.jar\n");

    compose(&project).success();

    assert_eq!(
        project.read("out/Dockerfile"),
        "FROM openjdk:17 as B\n\
         RUN /opt/code/mvnw package\n\
         \n\
         FROM openjdk:17 as A\n\
         CMD java -jar app.jar\n\
         COPY --from=B /opt/code /opt/code/\n"
    );
}

#[test]
fn test_compose_parent_mismatch_fails() {
    let project = TestProject::new();
    project.write_config(
        r#"
        image {
            parent "X:1"
            selected "runtime"
            directory "out"
        }
        build-image {
            parent "Y:1"
            selected "compile"
        }
        "#,
    );

    compose(&project)
        .failure()
        .code(1)
        .stderr(predicate::str::contains("X:1"));
}

#[test]
fn test_compose_missing_instruction_file_fails() {
    let project = TestProject::new();
    project.write_config(
        r#"
        image {
            parent "alpine"
            selected "scripts"
            directory "out"
        }
        "#,
    );
    project.write_fragment("scripts", "alpine", "run.sh", "echo\n");

    compose(&project).failure().code(1);
    assert!(!project.path().join("out/Dockerfile").exists());
}
