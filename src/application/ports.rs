//! Collaborator traits the export pipeline depends on.
//!
//! Implementations live in `infra`; tests substitute in-memory fakes.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use figport_api_types::ImagesResponse;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::application::fetch::FetchFailure;
use crate::domain::error::DocumentError;
use crate::domain::export::{ExportRequest, ImageFormat};
use crate::domain::tree::{Document, NodeId};

/// Call-level failure of a remote request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {message}")]
    Connection { message: String },
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {message}")]
    Malformed { message: String },
    #[error("service reported an error: {message}")]
    Service { message: String },
}

impl TransportError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("document `{key}` not found")]
    NotFound { key: String },
    #[error("document payload is malformed: {message}")]
    Malformed { message: String },
    #[error(transparent)]
    Invalid(#[from] DocumentError),
    #[error(transparent)]
    Transport(TransportError),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid asset file name `{name}`")]
    InvalidName { name: String },
    #[error("asset payload is empty")]
    EmptyPayload,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where and how an asset was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    pub path: PathBuf,
    pub checksum: String,
    pub size_bytes: u64,
}

/// Supplies decoded documents by key.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn document(&self, key: &str) -> Result<Document, SourceError>;
}

/// Issues the single batched render call of an export.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: &ExportRequest) -> Result<ImagesResponse, TransportError>;
}

/// Downloads one rendered image. The returned bytes are complete or the call
/// fails; partial bodies are never returned.
#[async_trait]
pub trait AssetDownloader: Send + Sync {
    async fn download(&self, url: &Url) -> Result<Bytes, FetchFailure>;
}

/// Persists downloaded assets.
#[async_trait]
pub trait AssetSink: Send + Sync {
    async fn store(
        &self,
        id: &NodeId,
        file_stem: &str,
        format: ImageFormat,
        bytes: Bytes,
    ) -> Result<StoredAsset, SinkError>;
}
