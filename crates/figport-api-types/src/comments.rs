use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
}

/// A comment or reply left by a user on a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub client_meta: Option<ClientMeta>,
    #[serde(default)]
    pub file_key: String,
    /// Set when this comment is a reply.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub user: User,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    /// Only set for top level comments; the number shown in the editor.
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Where a comment is pinned: an absolute canvas position, or an offset
/// relative to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMeta {
    FrameOffset { node_id: String, node_offset: Vector },
    Position(Vector),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    pub handle: String,
    #[serde(default)]
    pub img_url: String,
}

/// Body of `POST /v1/files/:key/comments`.
#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub message: String,
    pub client_meta: Vector,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_decodes_timestamps_and_position() {
        let comment: Comment = serde_json::from_str(
            r#"{
                "id": "42",
                "message": "tighten spacing",
                "client_meta": {"x": 10.0, "y": 20.5},
                "file_key": "abc",
                "parent_id": null,
                "user": {"handle": "ana", "img_url": "https://img"},
                "created_at": "2024-03-01T10:00:00Z",
                "resolved_at": null,
                "order_id": "3"
            }"#,
        )
        .expect("comment");

        assert_eq!(
            comment.client_meta,
            Some(ClientMeta::Position(Vector { x: 10.0, y: 20.5 }))
        );
        assert_eq!(comment.created_at.year(), 2024);
        assert!(comment.resolved_at.is_none());
        assert_eq!(comment.order_id.as_deref(), Some("3"));
    }
}
