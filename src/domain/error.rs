use thiserror::Error;

use super::tree::NodeType;

/// Caller-input errors detected before any network activity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no nodes selected for export")]
    EmptySelection,
    #[error("scale {scale} is outside the supported range 0.1..=4.0")]
    ScaleOutOfRange { scale: f64 },
    #[error("unrecognized image format `{value}` (expected png, svg or jpg)")]
    UnrecognizedFormat { value: String },
    #[error("document key must not be empty")]
    EmptyDocumentKey,
}

impl ValidationError {
    pub fn unrecognized_format(value: impl Into<String>) -> Self {
        Self::UnrecognizedFormat {
            value: value.into(),
        }
    }
}

/// A decoded payload that violates the document tree invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document root must be a DOCUMENT node, found {found}")]
    RootNotDocument { found: NodeType },
    #[error("node without identifier under `{parent}`")]
    EmptyIdentifier { parent: String },
    #[error("node identifier `{id}` appears more than once")]
    DuplicateIdentifier { id: String },
}

impl DocumentError {
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::DuplicateIdentifier { id: id.into() }
    }

    pub fn empty_identifier(parent: impl Into<String>) -> Self {
        Self::EmptyIdentifier {
            parent: parent.into(),
        }
    }
}
