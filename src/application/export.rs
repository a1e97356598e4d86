//! End-to-end export: select nodes, render them in one batch, fetch the results.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::cancel::CancelSignal;
use crate::application::fetch::{AssetFetcher, DEFAULT_CONCURRENCY, FetchFailure, FetchReport};
use crate::application::ports::{
    AssetDownloader, AssetSink, DocumentSource, Renderer, SourceError, TransportError,
};
use crate::application::rendering::{RenderFailure, RenderOutcome, RenderStatus, interpret};
use crate::domain::error::ValidationError;
use crate::domain::export::{ExportRequest, ImageFormat, check_scale};
use crate::domain::naming::{AssetNamer, NamingStrategy};
use crate::domain::selector::Selector;
use crate::domain::tree::{Document, NodeId};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to load document: {0}")]
    Source(#[from] SourceError),
    #[error("render call failed: {0}")]
    Render(TransportError),
}

/// Caller-controlled knobs of one export run.
#[derive(Debug, Clone)]
pub struct ExportParams {
    pub document_key: String,
    pub scale: f64,
    pub format: ImageFormat,
    /// Identifiers the caller asked for explicitly. Those the selector does
    /// not choose are reported as [`ExportStatus::NotSelected`].
    pub ids: Vec<NodeId>,
    pub naming: NamingStrategy,
    pub concurrency: NonZeroUsize,
    pub deadline: Option<Duration>,
}

impl ExportParams {
    pub fn new(document_key: impl Into<String>, scale: f64, format: ImageFormat) -> Self {
        Self {
            document_key: document_key.into(),
            scale,
            format,
            ids: Vec::new(),
            naming: NamingStrategy::default(),
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportStatus {
    Exported {
        size_bytes: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        checksum: Option<String>,
    },
    RenderedOnly {
        cause: FetchFailure,
    },
    RenderFailed {
        cause: RenderFailure,
    },
    NotSelected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportEntry {
    pub id: NodeId,
    #[serde(flatten)]
    pub status: ExportStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub selected: usize,
    pub exported: usize,
    pub rendered_only: usize,
    pub render_failed: usize,
    pub not_selected: usize,
}

/// Consolidated result of one export run, in selection order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub document_key: String,
    pub format: ImageFormat,
    pub scale: f64,
    pub entries: Vec<ExportEntry>,
    pub summary: ExportSummary,
}

impl ExportReport {
    fn new(params: &ExportParams, entries: Vec<ExportEntry>) -> Self {
        let mut summary = ExportSummary::default();
        for entry in &entries {
            match entry.status {
                ExportStatus::Exported { .. } => summary.exported += 1,
                ExportStatus::RenderedOnly { .. } => summary.rendered_only += 1,
                ExportStatus::RenderFailed { .. } => summary.render_failed += 1,
                ExportStatus::NotSelected => summary.not_selected += 1,
            }
        }
        summary.selected = entries.len() - summary.not_selected;

        Self {
            document_key: params.document_key.clone(),
            format: params.format,
            scale: params.scale,
            entries,
            summary,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ExportStatus> {
        self.entries
            .iter()
            .find(|entry| entry.id.as_str() == id)
            .map(|entry| &entry.status)
    }

    /// True when every selected node was exported.
    pub fn is_complete(&self) -> bool {
        self.summary.exported == self.summary.selected
    }
}

/// Wires the collaborators of an export together.
#[derive(Clone)]
pub struct Exporter {
    source: Arc<dyn DocumentSource>,
    renderer: Arc<dyn Renderer>,
    downloader: Arc<dyn AssetDownloader>,
    sink: Option<Arc<dyn AssetSink>>,
    cancel: Option<CancelSignal>,
}

impl Exporter {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        renderer: Arc<dyn Renderer>,
        downloader: Arc<dyn AssetDownloader>,
    ) -> Self {
        Self {
            source,
            renderer,
            downloader,
            sink: None,
            cancel: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AssetSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Load `params.document_key` and export the nodes `selector` picks.
    pub async fn export(
        &self,
        selector: &Selector,
        params: &ExportParams,
    ) -> Result<ExportReport, ExportError> {
        check_scale(params.scale)?;
        let document = self.source.document(&params.document_key).await?;
        self.run(&document, selector, params).await
    }

    /// Export from an already loaded document.
    pub async fn run(
        &self,
        document: &Document,
        selector: &Selector,
        params: &ExportParams,
    ) -> Result<ExportReport, ExportError> {
        check_scale(params.scale)?;

        let selected = selector.select(document.traverse());
        info!(
            target = "figport::export",
            document = %params.document_key,
            selector = selector.description(),
            nodes = document.len(),
            selected = selected.len(),
            "selection complete"
        );

        let not_selected = unselected(&params.ids, &selected);
        if selected.is_empty() {
            return Ok(ExportReport::new(params, not_selected));
        }

        let request = ExportRequest::build(
            params.document_key.as_str(),
            params.scale,
            params.format,
            selected,
        )?;

        let response = self
            .renderer
            .render(&request)
            .await
            .map_err(ExportError::Render)?;
        let rendered = interpret(&request, &response);

        let stems = file_stems(document, &rendered, params.naming);
        let mut fetcher = AssetFetcher::new(self.downloader.clone(), params.concurrency)
            .with_deadline(params.deadline)
            .with_cancel(self.cancel.clone());
        if let Some(sink) = &self.sink {
            fetcher = fetcher.with_sink(sink.clone());
        }
        let fetched = fetcher.fetch_named(&rendered, &stems).await;

        let mut entries = assemble(&rendered, fetched);
        entries.extend(not_selected);
        let report = ExportReport::new(params, entries);

        if report.is_complete() {
            info!(
                target = "figport::export",
                document = %report.document_key,
                exported = report.summary.exported,
                "export complete"
            );
        } else {
            warn!(
                target = "figport::export",
                document = %report.document_key,
                exported = report.summary.exported,
                rendered_only = report.summary.rendered_only,
                render_failed = report.summary.render_failed,
                "export finished with failures"
            );
        }

        Ok(report)
    }
}

fn unselected(requested: &[NodeId], selected: &[NodeId]) -> Vec<ExportEntry> {
    let selected: HashSet<&NodeId> = selected.iter().collect();
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|id| !selected.contains(id) && seen.insert(*id))
        .map(|id| ExportEntry {
            id: id.clone(),
            status: ExportStatus::NotSelected,
        })
        .collect()
}

fn file_stems(
    document: &Document,
    rendered: &RenderOutcome,
    naming: NamingStrategy,
) -> HashMap<NodeId, String> {
    let mut namer = AssetNamer::new(naming);
    rendered
        .resolved()
        .map(|(id, _)| {
            let name = document.node(id.as_str()).map(|node| node.name()).unwrap_or_default();
            (id.clone(), namer.stem_for(id, name))
        })
        .collect()
}

fn assemble(rendered: &RenderOutcome, fetched: FetchReport) -> Vec<ExportEntry> {
    let mut fetched: HashMap<NodeId, _> = fetched
        .into_outcomes()
        .into_iter()
        .map(|outcome| (outcome.id, outcome.result))
        .collect();

    rendered
        .entries()
        .iter()
        .map(|entry| {
            let status = match &entry.status {
                RenderStatus::Failed(cause) => ExportStatus::RenderFailed {
                    cause: cause.clone(),
                },
                RenderStatus::Resolved(_) => match fetched.remove(&entry.id) {
                    Some(Ok(asset)) => ExportStatus::Exported {
                        size_bytes: asset.bytes.len() as u64,
                        path: asset.stored.as_ref().map(|stored| stored.path.clone()),
                        checksum: asset.stored.map(|stored| stored.checksum),
                    },
                    Some(Err(cause)) => ExportStatus::RenderedOnly { cause },
                    // Every resolved reference has a fetch slot.
                    None => ExportStatus::RenderedOnly {
                        cause: FetchFailure::Cancelled,
                    },
                },
            };
            ExportEntry {
                id: entry.id.clone(),
                status,
            }
        })
        .collect()
}
