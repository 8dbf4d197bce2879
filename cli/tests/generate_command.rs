//! End-to-end tests for the typed-middleware binary
//!
//! Each test runs the binary in its own temporary directory with HOME
//! pointed there, so no user configuration leaks in.

mod common;

use common::{APP, CYCLE, cmd_in, create_temp_dir, write_source};
use predicates::prelude::*;
use std::fs;

#[test]
fn test_help_lists_options() {
    let temp = create_temp_dir();

    cmd_in(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--source"))
        .stdout(predicate::str::contains("--emit"))
        .stdout(predicate::str::contains("TYPED_MIDDLEWARE_FILE"));
}

#[test]
fn test_root_is_required() {
    let temp = create_temp_dir();

    cmd_in(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("<ROOT>"));
}

#[test]
fn test_generates_beside_source() {
    let temp = create_temp_dir();
    write_source(temp.path(), "app.rs", APP);

    cmd_in(temp.path())
        .args(["AppStack", "--source", "app.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated"))
        .stdout(predicate::str::contains("app_middleware.rs"));

    let code = fs::read_to_string(temp.path().join("app_middleware.rs")).unwrap();
    assert!(code.contains("pub trait AppStackStack {"));
    assert!(code.contains("pub struct AppStackStackImpl {"));
    assert!(code.contains("impl AuthDeps for AppStackStackImpl {}"));
    assert!(code.contains("impl AppStack for AppStackStackImpl {}"));

    let client_id = code.find("ClientIdMiddleware::run(").unwrap();
    let auth = code.find("AuthMiddleware::run(&self.auth_middleware, req, self)").unwrap();
    assert!(client_id < auth, "dependency should run first");
}

#[test]
fn test_source_from_environment() {
    let temp = create_temp_dir();
    write_source(temp.path(), "stack.rs", APP);

    cmd_in(temp.path())
        .env("TYPED_MIDDLEWARE_FILE", "stack.rs")
        .arg("AppStack")
        .assert()
        .success();

    assert!(temp.path().join("stack_middleware.rs").exists());
}

#[test]
fn test_dir_flag_resolves_source() {
    let temp = create_temp_dir();
    let project = temp.path().join("project");
    fs::create_dir(&project).unwrap();
    write_source(&project, "app.rs", APP);

    cmd_in(temp.path())
        .args(["AppStack", "--source", "app.rs", "--dir"])
        .arg(&project)
        .assert()
        .success();

    assert!(project.join("app_middleware.rs").exists());
}

#[test]
fn test_cycle_fails_without_output() {
    let temp = create_temp_dir();
    write_source(temp.path(), "app.rs", CYCLE);

    cmd_in(temp.path())
        .args(["AppStack", "--source", "app.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle detected"))
        .stderr(predicate::str::contains("self::Auth"));

    assert!(!temp.path().join("app_middleware.rs").exists());
}

#[test]
fn test_missing_implementation_is_reported() {
    let temp = create_temp_dir();
    write_source(
        temp.path(),
        "app.rs",
        "pub trait AppStack: Auth {}\npub trait Auth {}\n",
    );

    cmd_in(temp.path())
        .args(["AppStack", "--source", "app.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "could not find self::AuthMiddleware to implement self::Auth",
        ));
}

#[test]
fn test_missing_source_is_reported() {
    let temp = create_temp_dir();

    cmd_in(temp.path())
        .arg("AppStack")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TYPED_MIDDLEWARE_FILE"));
}

#[test]
fn test_json_to_stdout() {
    let temp = create_temp_dir();
    write_source(temp.path(), "app.rs", APP);

    let output = cmd_in(temp.path())
        .args(["AppStack", "--source", "app.rs", "--emit", "json", "--stdout"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let steps: Vec<&str> = json["pipeline"]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["capability"].as_str().unwrap())
        .collect();
    assert_eq!(steps, vec!["self::ClientId", "self::Auth"]);
    assert_eq!(json["pipeline"]["steps"][1]["pass_bundle"], true);

    assert!(!temp.path().join("app_middleware.json").exists());
}

#[test]
fn test_project_config_changes_suffix() {
    let temp = create_temp_dir();
    write_source(temp.path(), "app.rs", APP);
    fs::write(
        temp.path().join("typed-middleware.toml"),
        "[output]\nsuffix = \"_stack\"\n",
    )
    .unwrap();

    cmd_in(temp.path())
        .args(["AppStack", "--source", "app.rs"])
        .assert()
        .success();

    assert!(temp.path().join("app_stack.rs").exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp = create_temp_dir();
    write_source(temp.path(), "app.rs", APP);
    fs::write(
        temp.path().join("typed-middleware.toml"),
        "[conventions]\ninvocation_method = \"1run\"\n",
    )
    .unwrap();

    cmd_in(temp.path())
        .args(["AppStack", "--source", "app.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config validation failed"));
}

#[test]
fn test_borrowed_return_does_not_satisfy_owned() {
    let temp = create_temp_dir();
    write_source(
        temp.path(),
        "app.rs",
        r#"
pub trait AppStack: Auth {}

pub trait Auth {
    fn token(&self) -> String;
}

pub struct AuthMiddleware;

impl AuthMiddleware {
    pub fn run(&self, req: &http::Request) -> typed_middleware::Outcome {
        typed_middleware::Outcome::proceed()
    }
}

impl Auth for AuthMiddleware {
    fn token(&self) -> &String {
        todo!()
    }
}
"#,
    );

    cmd_in(temp.path())
        .args(["AppStack", "--source", "app.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "self::AuthMiddleware should implement self::Auth, but had wrong signature for token",
        ));

    assert!(!temp.path().join("app_middleware.rs").exists());
}
