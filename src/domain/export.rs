//! Validated export requests for the batched render endpoint.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::tree::NodeId;

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 4.0;

/// Output format of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Svg,
    Jpg,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Jpg => "jpg",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn is_raster(self) -> bool {
        !matches!(self, ImageFormat::Svg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            _ => Err(ValidationError::unrecognized_format(s)),
        }
    }
}

/// Reject scales outside `MIN_SCALE..=MAX_SCALE` (NaN included).
pub fn check_scale(scale: f64) -> Result<f64, ValidationError> {
    if (MIN_SCALE..=MAX_SCALE).contains(&scale) {
        Ok(scale)
    } else {
        Err(ValidationError::ScaleOutOfRange { scale })
    }
}

/// Parameters of one batched render call, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    document_key: String,
    scale: f64,
    format: ImageFormat,
    ids: Vec<NodeId>,
}

impl ExportRequest {
    /// Validate and assemble a request. Repeated identifiers keep their
    /// first position.
    pub fn build(
        document_key: impl Into<String>,
        scale: f64,
        format: ImageFormat,
        ids: impl IntoIterator<Item = NodeId>,
    ) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        let ids: Vec<NodeId> = ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection);
        }

        let scale = check_scale(scale)?;

        let document_key = document_key.into().trim().to_string();
        if document_key.is_empty() {
            return Err(ValidationError::EmptyDocumentKey);
        }

        Ok(Self {
            document_key,
            scale,
            format,
            ids,
        })
    }

    /// Same as [`ExportRequest::build`] with the format given by name.
    pub fn parse(
        document_key: impl Into<String>,
        scale: f64,
        format: &str,
        ids: impl IntoIterator<Item = NodeId>,
    ) -> Result<Self, ValidationError> {
        Self::build(document_key, scale, format.parse()?, ids)
    }

    pub fn document_key(&self) -> &str {
        &self.document_key
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always `false`: construction rejects empty selections.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|candidate| candidate.as_str() == id)
    }

    /// Query string pairs of `GET /v1/images/:key`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let ids = self
            .ids
            .iter()
            .map(NodeId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("ids", ids),
            ("scale", self.scale.to_string()),
            ("format", self.format.as_str().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<NodeId> {
        values.iter().map(|value| NodeId::from(*value)).collect()
    }

    #[test]
    fn scale_bounds_are_inclusive() {
        for scale in [0.1, 4.0, 1.0] {
            assert!(ExportRequest::build("key", scale, ImageFormat::Png, ids(&["1:1"])).is_ok());
        }
        for scale in [0.05, 4.5, f64::NAN] {
            let err = ExportRequest::build("key", scale, ImageFormat::Png, ids(&["1:1"]))
                .expect_err("out of range");
            assert!(matches!(err, ValidationError::ScaleOutOfRange { .. }));
        }
    }

    #[test]
    fn empty_selection_is_rejected_before_scale() {
        let err = ExportRequest::build("key", 9.0, ImageFormat::Svg, Vec::new())
            .expect_err("empty selection");
        assert_eq!(err, ValidationError::EmptySelection);
    }

    #[test]
    fn blank_document_key_is_rejected() {
        let err = ExportRequest::build("  ", 1.0, ImageFormat::Svg, ids(&["1:1"]))
            .expect_err("blank key");
        assert_eq!(err, ValidationError::EmptyDocumentKey);
    }

    #[test]
    fn unknown_format_name_is_rejected() {
        let err = ExportRequest::parse("key", 1.0, "gif", ids(&["1:1"])).expect_err("gif");
        assert_eq!(err, ValidationError::unrecognized_format("gif"));

        let request = ExportRequest::parse("key", 1.0, "JPEG", ids(&["1:1"])).expect("jpeg");
        assert_eq!(request.format(), ImageFormat::Jpg);
    }

    #[test]
    fn parse_applies_the_same_checks_as_build() {
        let err = ExportRequest::parse("key", 9.0, "png", ids(&["1:1"])).expect_err("scale");
        assert!(matches!(err, ValidationError::ScaleOutOfRange { .. }));

        let err = ExportRequest::parse("key", 1.0, "png", ids(&[])).expect_err("no ids");
        assert_eq!(err, ValidationError::EmptySelection);

        let err = ExportRequest::parse(" ", 1.0, "svg", ids(&["1:1"])).expect_err("blank key");
        assert_eq!(err, ValidationError::EmptyDocumentKey);
    }

    #[test]
    fn duplicate_ids_collapse_in_order() {
        let request = ExportRequest::build("key", 2.0, ImageFormat::Png, ids(&["b", "a", "b"]))
            .expect("request");
        assert_eq!(request.ids(), ids(&["b", "a"]).as_slice());
    }

    #[test]
    fn query_pairs_encode_the_batch() {
        let request = ExportRequest::build("key", 0.5, ImageFormat::Svg, ids(&["1:2", "3:4"]))
            .expect("request");
        assert_eq!(
            request.query_pairs(),
            vec![
                ("ids", "1:2,3:4".to_string()),
                ("scale", "0.5".to_string()),
                ("format", "svg".to_string()),
            ]
        );
    }
}
