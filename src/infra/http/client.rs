//! Typed client for the REST endpoints figport uses.

use std::sync::Arc;

use async_trait::async_trait;
use figport_api_types::{
    Comment, CommentsResponse, File, ImagesResponse, NewComment, TeamProject,
    TeamProjectsResponse, Vector, Version, VersionsResponse,
};
use tracing::info;

use crate::application::ports::{DocumentSource, Renderer, SourceError, TransportError};
use crate::config::ApiSettings;
use crate::domain::export::ExportRequest;
use crate::domain::tree::Document;
use crate::infra::error::InfraError;

use super::transport::Transport;

#[derive(Clone, Debug)]
pub struct FigmaClient {
    transport: Arc<Transport>,
}

impl FigmaClient {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_settings(api: &ApiSettings) -> Result<Self, InfraError> {
        let token = api.token.as_deref().ok_or_else(|| {
            InfraError::configuration(
                "API token is required (use --token-file, api.token or FIGPORT__API__TOKEN)",
            )
        })?;
        let transport = Transport::new(api.base_url.clone(), token, api.timeout)?;
        Ok(Self::new(transport))
    }

    /// `GET /v1/files/:key`
    pub async fn file(&self, key: &str) -> Result<File, TransportError> {
        self.transport.get_json(&["v1", "files", key], &[]).await
    }

    /// `GET /v1/images/:key`, one batched render call. A response carrying a
    /// non-null `err` is a call-level failure.
    pub async fn images(&self, request: &ExportRequest) -> Result<ImagesResponse, TransportError> {
        let response: ImagesResponse = self
            .transport
            .get_json(
                &["v1", "images", request.document_key()],
                &request.query_pairs(),
            )
            .await?;

        if let Some(err) = response.err.as_deref() {
            return Err(TransportError::service(err));
        }

        info!(
            target = "figport::render",
            document = %request.document_key(),
            requested = request.len(),
            returned = response.images.len(),
            "render call answered"
        );
        Ok(response)
    }

    /// `GET /v1/files/:key/comments`
    pub async fn comments(&self, key: &str) -> Result<Vec<Comment>, TransportError> {
        let response: CommentsResponse = self
            .transport
            .get_json(&["v1", "files", key, "comments"], &[])
            .await?;
        Ok(response.comments)
    }

    /// `POST /v1/files/:key/comments`
    pub async fn add_comment(
        &self,
        key: &str,
        message: &str,
        position: Vector,
    ) -> Result<Comment, TransportError> {
        let body = NewComment {
            message: message.to_string(),
            client_meta: position,
        };
        self.transport
            .post_json(&["v1", "files", key, "comments"], &body)
            .await
    }

    /// `GET /v1/teams/:team_id/projects`
    pub async fn team_projects(&self, team_id: &str) -> Result<Vec<TeamProject>, TransportError> {
        let response: TeamProjectsResponse = self
            .transport
            .get_json(&["v1", "teams", team_id, "projects"], &[])
            .await?;
        Ok(response.projects)
    }

    /// `GET /v1/files/:key/versions`
    pub async fn file_versions(&self, key: &str) -> Result<Vec<Version>, TransportError> {
        let response: VersionsResponse = self
            .transport
            .get_json(&["v1", "files", key, "versions"], &[])
            .await?;
        Ok(response.versions)
    }
}

#[async_trait]
impl DocumentSource for FigmaClient {
    async fn document(&self, key: &str) -> Result<Document, SourceError> {
        let file = self.file(key).await.map_err(|err| match err {
            TransportError::Status { status: 404, .. } => SourceError::NotFound {
                key: key.to_string(),
            },
            TransportError::Malformed { message } => SourceError::Malformed { message },
            other => SourceError::Transport(other),
        })?;

        let document = Document::from_file(file)?;
        info!(
            target = "figport::document",
            key,
            name = document.name(),
            nodes = document.len(),
            "document loaded"
        );
        Ok(document)
    }
}

#[async_trait]
impl Renderer for FigmaClient {
    async fn render(&self, request: &ExportRequest) -> Result<ImagesResponse, TransportError> {
        self.images(request).await
    }
}

#[cfg(test)]
mod tests;
