use std::time::Duration;

use httpmock::MockServer;
use serde_json::json;
use url::Url;

use super::*;
use crate::domain::export::ImageFormat;
use crate::domain::tree::NodeId;

const FILE_BODY: &str = r#"{
    "name": "Design System",
    "lastModified": "2024-03-01T10:00:00Z",
    "version": "42",
    "schemaVersion": 0,
    "components": {},
    "document": {
        "id": "0:0",
        "name": "Document",
        "type": "DOCUMENT",
        "children": [{
            "id": "0:1",
            "name": "Page 1",
            "type": "CANVAS",
            "backgroundColor": {"r": 1, "g": 1, "b": 1, "a": 1},
            "children": [
                {"id": "1:2", "name": "Hero", "type": "FRAME"},
                {"id": "1:3", "name": "Draft", "type": "FRAME", "visible": false}
            ]
        }]
    }
}"#;

fn client(server: &MockServer) -> FigmaClient {
    let transport = Transport::new(
        Url::parse(&server.base_url()).expect("base url"),
        "token",
        Duration::from_secs(5),
    )
    .expect("transport");
    FigmaClient::new(transport)
}

fn request(ids: &[&str]) -> ExportRequest {
    ExportRequest::build(
        "KEY",
        2.0,
        ImageFormat::Png,
        ids.iter().map(|id| NodeId::from(*id)),
    )
    .expect("request")
}

#[test]
fn settings_without_token_are_rejected() {
    let api = ApiSettings {
        base_url: Url::parse("https://api.figma.com").expect("url"),
        token: None,
        timeout: Duration::from_secs(5),
    };
    assert!(matches!(
        FigmaClient::from_settings(&api),
        Err(InfraError::Configuration { .. })
    ));
}

#[tokio::test]
async fn document_is_loaded_into_a_tree() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/v1/files/KEY")
            .header("X-Figma-Token", "token");
        then.status(200)
            .header("content-type", "application/json")
            .body(FILE_BODY);
    });

    let document = client(&server).document("KEY").await.expect("document");

    mock.assert();
    assert_eq!(document.name(), "Design System");
    assert_eq!(document.version(), Some("42"));
    assert_eq!(document.len(), 4);
    let draft = document.node("1:3").expect("draft frame");
    assert!(!draft.is_visible());
    let canvas = document.node("0:1").expect("canvas");
    assert!(canvas.style().contains_key("backgroundColor"));
}

#[tokio::test]
async fn missing_document_maps_to_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/v1/files/GONE");
        then.status(404).body(r#"{"status":404,"err":"Not found"}"#);
    });

    let err = client(&server).document("GONE").await.expect_err("missing");
    assert!(matches!(err, SourceError::NotFound { key } if key == "GONE"));
}

#[tokio::test]
async fn invalid_documents_are_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/v1/files/DUP");
        then.status(200).json_body(json!({
            "name": "dup",
            "document": {
                "id": "0:0",
                "type": "DOCUMENT",
                "children": [
                    {"id": "1:1", "type": "CANVAS"},
                    {"id": "1:1", "type": "CANVAS"}
                ]
            }
        }));
    });

    let err = client(&server).document("DUP").await.expect_err("duplicate");
    assert!(matches!(err, SourceError::Invalid(_)));
}

#[tokio::test]
async fn images_request_carries_the_batch() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/v1/images/KEY")
            .query_param("ids", "1:2,1:3")
            .query_param("scale", "2")
            .query_param("format", "png");
        then.status(200).json_body(json!({
            "err": null,
            "images": {"1:2": "https://cdn.example/1-2.png", "1:3": null}
        }));
    });

    let response = client(&server)
        .render(&request(&["1:2", "1:3"]))
        .await
        .expect("images");

    mock.assert();
    assert_eq!(response.images.len(), 2);
    assert_eq!(response.images.get("1:3"), Some(&None));
}

#[tokio::test]
async fn images_error_field_fails_the_call() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/v1/images/KEY");
        then.status(200)
            .json_body(json!({"err": "Render timeout", "images": {}}));
    });

    let err = client(&server)
        .images(&request(&["1:2"]))
        .await
        .expect_err("service error");
    assert_eq!(err, TransportError::service("Render timeout"));
}

#[tokio::test]
async fn render_server_errors_abort_the_batch() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/v1/images/KEY");
        then.status(500).body("upstream failure");
    });

    let err = client(&server)
        .render(&request(&["1:2", "1:3"]))
        .await
        .expect_err("server error");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn comments_round_trip() {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method("GET").path("/v1/files/KEY/comments");
        then.status(200).json_body(json!({
            "comments": [{
                "id": "c1",
                "message": "Looks good",
                "file_key": "KEY",
                "parent_id": null,
                "user": {"handle": "ana", "img_url": ""},
                "created_at": "2024-03-01T10:00:00Z",
                "resolved_at": null,
                "order_id": "1",
                "client_meta": {"x": 10.0, "y": 20.0}
            }]
        }));
    });
    let add = server.mock(|when, then| {
        when.method("POST")
            .path("/v1/files/KEY/comments")
            .json_body(json!({"message": "New", "client_meta": {"x": 1.5, "y": -2.0}}));
        then.status(200).json_body(json!({
            "id": "c2",
            "message": "New",
            "file_key": "KEY",
            "user": {"handle": "ana"},
            "created_at": "2024-03-02T10:00:00Z"
        }));
    });

    let client = client(&server);
    let comments = client.comments("KEY").await.expect("comments");
    let created = client
        .add_comment("KEY", "New", Vector { x: 1.5, y: -2.0 })
        .await
        .expect("created");

    list.assert();
    add.assert();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].message, "Looks good");
    assert_eq!(created.id, "c2");
}

#[tokio::test]
async fn projects_and_versions_are_listed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/v1/teams/T1/projects");
        then.status(200)
            .json_body(json!({"name": "Team", "projects": [{"id": "p1", "name": "Web"}]}));
    });
    server.mock(|when, then| {
        when.method("GET").path("/v1/files/KEY/versions");
        then.status(200).json_body(json!({
            "versions": [{
                "id": "v1",
                "label": "Launch",
                "description": null,
                "user": {"handle": "ana"},
                "created_at": "2024-03-01T10:00:00Z"
            }]
        }));
    });

    let client = client(&server);
    let projects = client.team_projects("T1").await.expect("projects");
    let versions = client.file_versions("KEY").await.expect("versions");

    assert_eq!(projects[0].name, "Web");
    assert_eq!(versions[0].label.as_deref(), Some("Launch"));
}
