//! Common test utilities and fixtures
//!
//! Shared helpers for typed-middleware CLI tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stack with a dependency bundle: Auth needs ClientId, so ClientId runs first
pub const APP: &str = r#"
use http::Request;
use typed_middleware::Outcome;

pub trait AppStack: Auth + Send {}

pub trait Auth {
    fn user(&self) -> String;
}

pub trait AuthDeps: ClientId {}

pub trait ClientId {
    fn client_id(&self) -> String;
}

pub struct AuthMiddleware;

impl AuthMiddleware {
    pub fn run(&self, req: &Request, deps: &dyn AuthDeps) -> Outcome {
        Outcome::proceed()
    }
}

impl Auth for AuthMiddleware {
    fn user(&self) -> String {
        String::new()
    }
}

pub struct ClientIdMiddleware;

impl ClientIdMiddleware {
    pub fn run(&self, req: &Request) -> Outcome {
        Outcome::proceed()
    }
}

impl ClientId for ClientIdMiddleware {
    fn client_id(&self) -> String {
        String::new()
    }
}
"#;

/// Auth's dependencies lead back to Auth
pub const CYCLE: &str = r#"
use http::Request;
use typed_middleware::Outcome;

pub trait AppStack: Auth {}
pub trait Auth {}
pub trait AuthDeps: Auth {}

pub struct AuthMiddleware;

impl AuthMiddleware {
    pub fn run(&self, req: &Request, deps: &dyn AuthDeps) -> Outcome {
        Outcome::proceed()
    }
}
"#;

/// Creates a temporary directory for test fixtures
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Writes `content` to `name` inside `dir`
pub fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write source");
    path
}

/// A command isolated from the user's config, running in `dir`
pub fn cmd_in(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("typed-middleware").expect("binary should build");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("TYPED_MIDDLEWARE_FILE")
        .env_remove("RUST_LOG");
    cmd
}
