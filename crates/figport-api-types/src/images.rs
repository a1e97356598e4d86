use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response of `GET /v1/images/:key`.
///
/// `images` maps node ids to rendered image URLs. A `null` value means the
/// node could not be rendered; requested ids may also be missing entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub err: Option<String>,
    #[serde(default)]
    pub images: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub status: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_entries_survive_decoding() {
        let response: ImagesResponse = serde_json::from_str(
            r#"{"err":null,"images":{"1:2":"https://cdn.example/a.png","1:3":null}}"#,
        )
        .expect("images");

        assert_eq!(response.err, None);
        assert_eq!(response.images.len(), 2);
        assert_eq!(response.images.get("1:3"), Some(&None));
    }
}
