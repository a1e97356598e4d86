use std::io::Write;

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use serde_json::{Value, json};
use tempfile::{NamedTempFile, TempDir, tempdir};

fn token_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write token");
    file
}

fn figport(workdir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("figport"));
    cmd.current_dir(workdir.path())
        .env_remove("FIGPORT__API__TOKEN")
        .env_remove("FIGPORT_CONFIG_FILE")
        .env_remove("RUST_LOG")
        .args(["--log-level", "warn"]);
    cmd
}

fn file_body() -> Value {
    json!({
        "name": "Marketing",
        "schemaVersion": 0,
        "document": {
            "id": "0:0",
            "type": "DOCUMENT",
            "children": [{
                "id": "0:1",
                "type": "CANVAS",
                "name": "Page 1",
                "children": [
                    {"id": "1:2", "type": "FRAME", "name": "Hero"},
                    {"id": "1:3", "type": "FRAME", "name": "Hidden", "visible": false},
                    {"id": "1:4", "type": "FRAME", "name": "Footer"},
                    {"id": "1:5", "type": "TEXT", "name": "Caption"}
                ]
            }]
        }
    })
}

#[test]
fn export_writes_assets_and_prints_report() {
    let server = MockServer::start();
    let file = server.mock(|when, then| {
        when.method("GET")
            .path("/v1/files/KEY")
            .header("X-Figma-Token", "cli-token");
        then.status(200).json_body(file_body());
    });
    let images = server.mock(|when, then| {
        when.method("GET")
            .path("/v1/images/KEY")
            .query_param("ids", "1:2,1:4")
            .query_param("scale", "1")
            .query_param("format", "png");
        then.status(200).json_body(json!({
            "err": null,
            "images": {"1:2": server.url("/assets/hero.png"), "1:4": null}
        }));
    });
    let asset = server.mock(|when, then| {
        when.method("GET").path("/assets/hero.png");
        then.status(200)
            .header("content-type", "image/png")
            .body("png-bytes");
    });

    let workdir = tempdir().expect("workdir");
    let token = token_file("cli-token\n");
    let out = workdir.path().join("out");

    let assert = figport(&workdir)
        .arg("--token-file")
        .arg(token.path())
        .arg("--api-base-url")
        .arg(server.base_url())
        .args(["export", "KEY", "--scale", "1", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    file.assert();
    images.assert();
    asset.assert();

    let report: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json report");
    assert_eq!(report["document_key"], "KEY");
    assert_eq!(report["entries"][0]["id"], "1:2");
    assert_eq!(report["entries"][0]["status"], "exported");
    assert_eq!(report["entries"][1]["id"], "1:4");
    assert_eq!(report["entries"][1]["status"], "render_failed");
    assert_eq!(report["entries"][1]["cause"]["kind"], "null");
    assert_eq!(report["summary"]["exported"], 1);

    let written = std::fs::read(out.join("KEY").join("1-2.png")).expect("asset on disk");
    assert_eq!(written, b"png-bytes");
}

#[test]
fn nodes_lists_the_flattened_tree() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/v1/files/KEY");
        then.status(200).json_body(file_body());
    });

    let workdir = tempdir().expect("workdir");
    let assert = figport(&workdir)
        .env("FIGPORT__API__TOKEN", "env-token")
        .arg("--api-base-url")
        .arg(server.base_url())
        .args(["nodes", "KEY", "--type", "frame"])
        .assert()
        .success();

    let rows: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json rows");
    let ids: Vec<&str> = rows
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|row| row["id"].as_str())
        .collect();
    assert_eq!(ids, ["1:2", "1:3", "1:4"]);
    assert_eq!(rows[1]["visible"], false);
}

#[test]
fn missing_token_fails_fast() {
    let workdir = tempdir().expect("workdir");
    figport(&workdir)
        .args(["versions", "KEY"])
        .assert()
        .code(2)
        .stderr(contains("API token is required"));
}

#[test]
fn out_of_range_scale_is_rejected_before_any_request() {
    let workdir = tempdir().expect("workdir");
    let token = token_file("cli-token");
    figport(&workdir)
        .arg("--token-file")
        .arg(token.path())
        .args(["--api-base-url", "http://127.0.0.1:9"])
        .args(["export", "KEY", "--scale", "9"])
        .assert()
        .code(2)
        .stderr(contains("export.scale"));
}
