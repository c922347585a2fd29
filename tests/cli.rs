//
//  vend-client
//  tests/cli.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `vend` command isolated from the user's config and environment.
fn vend(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vend").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("VEND_DOMAIN_PREFIX")
        .env_remove("VEND_ACCESS_TOKEN")
        .env_remove("VEND_REFRESH_TOKEN")
        .env_remove("VEND_API_BASE")
        .env_remove("VEND_DEBUG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    vend(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("api"))
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_prints_crate_version() {
    let home = TempDir::new().unwrap();
    vend(&home)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "vend version {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();

    vend(&home)
        .args(["config", "set", "connection.domain_prefix", "mystore"])
        .assert()
        .success();

    vend(&home)
        .args(["config", "get", "connection.domain_prefix"])
        .assert()
        .success()
        .stdout("mystore\n");
}

#[test]
fn test_config_list_masks_client_secret() {
    let home = TempDir::new().unwrap();

    vend(&home)
        .args(["config", "set", "connection.client_secret", "hunter2"])
        .assert()
        .success();

    vend(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("connection.client_secret=****"))
        .stdout(predicate::str::contains("hunter2").not())
        .stdout(predicate::str::contains("retry.max_retries=3"));
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    vend(&home)
        .args(["config", "set", "connection.colour", "blue"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_api_without_store_fails() {
    let home = TempDir::new().unwrap();
    vend(&home)
        .args(["api", "/api/products"])
        .env("VEND_ACCESS_TOKEN", "tok")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No store configured"));
}

#[test]
fn test_api_prints_response() {
    let home = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/products")
        .match_header("authorization", "Bearer tok")
        .match_query(Matcher::UrlEncoded("active".into(), "true".into()))
        .with_status(200)
        .with_body(r#"{"products":[{"id":"abc"}]}"#)
        .create();

    vend(&home)
        .args(["api", "/api/products", "-F", "active=true", "--compact"])
        .env("VEND_DOMAIN_PREFIX", "mystore")
        .env("VEND_ACCESS_TOKEN", "tok")
        .env("VEND_API_BASE", server.url())
        .assert()
        .success()
        .stdout(r#"{"products":[{"id":"abc"}]}"#.to_string() + "\n");

    mock.assert();
}

#[test]
fn test_api_paginates_legacy_pages() {
    let home = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let first = server
        .mock("GET", "/api/consignment")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .with_status(200)
        .with_body(r#"{"consignments":[{"id":"c1"}],"page":1,"pages":2}"#)
        .create();
    let second = server
        .mock("GET", "/api/consignment")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_status(200)
        .with_body(r#"{"consignments":[{"id":"c2"}],"page":2,"pages":2}"#)
        .create();

    vend(&home)
        .args(["api", "/api/consignment", "--paginate", "--compact"])
        .env("VEND_DOMAIN_PREFIX", "mystore")
        .env("VEND_ACCESS_TOKEN", "tok")
        .env("VEND_API_BASE", server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""size":2"#))
        .stdout(predicate::str::contains(r#"{"id":"c1"}"#))
        .stdout(predicate::str::contains(r#"{"id":"c2"}"#));

    first.assert();
    second.assert();
}

#[test]
fn test_api_not_found_exit_code() {
    let home = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/api/2.0/products/nope")
        .with_status(404)
        .with_body(r#"{"error":"Not found"}"#)
        .create();

    vend(&home)
        .args(["api", "/api/2.0/products/nope"])
        .env("VEND_DOMAIN_PREFIX", "mystore")
        .env("VEND_ACCESS_TOKEN", "tok")
        .env("VEND_API_BASE", server.url())
        .assert()
        .code(8)
        .stderr(predicate::str::contains("404"));
}

#[test]
fn test_api_rejects_unknown_method() {
    let home = TempDir::new().unwrap();
    vend(&home)
        .args(["api", "/api/products", "-X", "TRACE"])
        .env("VEND_DOMAIN_PREFIX", "mystore")
        .env("VEND_ACCESS_TOKEN", "tok")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported HTTP method"));
}
