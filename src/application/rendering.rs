//! Interpretation of the batched render response.
//!
//! The service answers with a map from a subset of the requested ids to
//! nullable URLs. This module turns that into a [`RenderOutcome`] whose key
//! set is exactly the request's identifier set.

use figport_api_types::ImagesResponse;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::domain::export::{ExportRequest, ImageFormat};
use crate::domain::tree::NodeId;

/// Why a single node did not render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderFailure {
    #[error("the render service did not mention this node")]
    Missing,
    #[error("the render service returned no image for this node")]
    Null,
    #[error("the render service returned an unusable reference `{reference}`: {reason}")]
    InvalidReference { reference: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStatus {
    Resolved(Url),
    Failed(RenderFailure),
}

impl RenderStatus {
    pub fn resolved(&self) -> Option<&Url> {
        match self {
            RenderStatus::Resolved(url) => Some(url),
            RenderStatus::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RenderFailure> {
        match self {
            RenderStatus::Resolved(_) => None,
            RenderStatus::Failed(failure) => Some(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEntry {
    pub id: NodeId,
    pub status: RenderStatus,
}

/// Per-identifier result of one render call, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    format: ImageFormat,
    entries: Vec<RenderEntry>,
}

impl RenderOutcome {
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn entries(&self) -> &[RenderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RenderStatus> {
        self.entries
            .iter()
            .find(|entry| entry.id.as_str() == id)
            .map(|entry| &entry.status)
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.entries.iter().map(|entry| &entry.id)
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&NodeId, &Url)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.status.resolved().map(|url| (&entry.id, url)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&NodeId, &RenderFailure)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.status.failure().map(|failure| (&entry.id, failure)))
    }
}

/// Reconcile the service response against the request.
///
/// Every requested id appears exactly once: absent entries become
/// [`RenderFailure::Missing`], `null` entries [`RenderFailure::Null`].
/// Entries for ids that were never requested are dropped.
pub fn interpret(request: &ExportRequest, response: &ImagesResponse) -> RenderOutcome {
    let entries: Vec<RenderEntry> = request
        .ids()
        .iter()
        .map(|id| RenderEntry {
            id: id.clone(),
            status: resolve(response.images.get(id.as_str())),
        })
        .collect();

    let unexpected = response
        .images
        .keys()
        .filter(|key| !request.contains(key))
        .count();
    if unexpected > 0 {
        warn!(
            target = "figport::render",
            document = %request.document_key(),
            unexpected,
            "render response mentions nodes that were not requested"
        );
    }

    let outcome = RenderOutcome {
        format: request.format(),
        entries,
    };

    let failed = outcome.failed().count();
    if failed > 0 {
        counter!("figport_render_failed_total").increment(failed as u64);
    }
    debug!(
        target = "figport::render",
        requested = outcome.len(),
        failed,
        "render response interpreted"
    );

    outcome
}

fn resolve(entry: Option<&Option<String>>) -> RenderStatus {
    let reference = match entry {
        None => return RenderStatus::Failed(RenderFailure::Missing),
        Some(None) => return RenderStatus::Failed(RenderFailure::Null),
        Some(Some(reference)) => reference,
    };

    match Url::parse(reference) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => RenderStatus::Resolved(url),
        Ok(url) => RenderStatus::Failed(RenderFailure::InvalidReference {
            reference: reference.clone(),
            reason: format!("unsupported scheme `{}`", url.scheme()),
        }),
        Err(err) => RenderStatus::Failed(RenderFailure::InvalidReference {
            reference: reference.clone(),
            reason: err.to_string(),
        }),
    }
}
