//! Bounded-concurrency download of rendered assets.
//!
//! Every resolved reference of a [`RenderOutcome`] yields exactly one
//! [`FetchOutcome`]. At most `concurrency` downloads run at a time; a failed
//! or slow download only affects its own slot. A deadline or cancellation
//! stops the run: outstanding downloads are dropped and every unfinished
//! slot is marked with the interruption cause.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{StreamExt, pin_mut, stream};
use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};
use url::Url;

use crate::application::cancel::CancelSignal;
use crate::application::ports::{AssetDownloader, AssetSink, StoredAsset};
use crate::application::rendering::RenderOutcome;
use crate::domain::export::ImageFormat;
use crate::domain::naming::{AssetNamer, NamingStrategy, derive_file_stem};
use crate::domain::tree::NodeId;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Why a single asset could not be fetched or stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchFailure {
    #[error("download failed: {message}")]
    Network { message: String },
    #[error("download returned status {status}")]
    Status { status: u16 },
    #[error("download timed out")]
    Timeout,
    #[error("download truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },
    #[error("download returned an empty body")]
    EmptyBody,
    #[error("failed to store asset: {message}")]
    Storage { message: String },
    #[error("export deadline expired before the download finished")]
    Deadline,
    #[error("export cancelled before the download finished")]
    Cancelled,
}

impl FetchFailure {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub format: ImageFormat,
    pub bytes: Bytes,
    pub stored: Option<StoredAsset>,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub id: NodeId,
    pub result: Result<FetchedAsset, FetchFailure>,
}

/// One outcome per resolved reference, in render order.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    outcomes: Vec<FetchOutcome>,
}

impl FetchReport {
    pub fn outcomes(&self) -> &[FetchOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<FetchOutcome> {
        self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Result<FetchedAsset, FetchFailure>> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.id.as_str() == id)
            .map(|outcome| &outcome.result)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&NodeId, &FetchFailure)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (&outcome.id, err)))
    }
}

struct FetchJob {
    id: NodeId,
    url: Url,
    file_stem: String,
}

/// Downloads (and optionally persists) rendered assets.
#[derive(Clone)]
pub struct AssetFetcher {
    downloader: Arc<dyn AssetDownloader>,
    sink: Option<Arc<dyn AssetSink>>,
    concurrency: NonZeroUsize,
    deadline: Option<Duration>,
    cancel: Option<CancelSignal>,
}

impl AssetFetcher {
    pub fn new(downloader: Arc<dyn AssetDownloader>, concurrency: NonZeroUsize) -> Self {
        Self {
            downloader,
            sink: None,
            concurrency,
            deadline: None,
            cancel: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AssetSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Bound the whole fetch run, measured from the start of [`AssetFetcher::fetch`].
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<CancelSignal>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    /// Fetch every resolved reference, naming stored files after node ids.
    pub async fn fetch(&self, outcome: &RenderOutcome) -> FetchReport {
        let mut namer = AssetNamer::new(NamingStrategy::Id);
        let stems = outcome
            .resolved()
            .map(|(id, _)| (id.clone(), namer.stem_for(id, id.as_str())))
            .collect();
        self.fetch_named(outcome, &stems).await
    }

    /// Fetch every resolved reference using caller-assigned file stems.
    pub async fn fetch_named(
        &self,
        outcome: &RenderOutcome,
        stems: &HashMap<NodeId, String>,
    ) -> FetchReport {
        let jobs: Vec<FetchJob> = outcome
            .resolved()
            .map(|(id, url)| FetchJob {
                id: id.clone(),
                url: url.clone(),
                file_stem: stems.get(id).cloned().unwrap_or_else(|| {
                    derive_file_stem(id.as_str()).unwrap_or_else(|_| "node".to_string())
                }),
            })
            .collect();
        let format = outcome.format();
        let deadline = self.deadline.map(|limit| Instant::now() + limit);
        let mut slots: Vec<Option<Result<FetchedAsset, FetchFailure>>> =
            std::iter::repeat_with(|| None).take(jobs.len()).collect();
        let mut cancel = self.cancel.clone();

        info!(
            target = "figport::fetch",
            total = jobs.len(),
            skipped = outcome.len() - jobs.len(),
            concurrency = self.concurrency.get(),
            "fetching rendered assets"
        );

        let interruption = {
            let in_flight = stream::iter(jobs.iter().enumerate())
                .map(|(slot, job)| async move { (slot, self.fetch_one(job, format).await) })
                .buffer_unordered(self.concurrency.get());
            let expiry = wait_until(deadline);
            let cancelled = wait_cancelled(cancel.as_mut());
            pin_mut!(in_flight, expiry, cancelled);

            loop {
                tokio::select! {
                    biased;
                    next = in_flight.next() => match next {
                        Some((slot, result)) => slots[slot] = Some(result),
                        None => break None,
                    },
                    () = &mut expiry => break Some(FetchFailure::Deadline),
                    () = &mut cancelled => break Some(FetchFailure::Cancelled),
                }
            }
        };

        if let Some(cause) = &interruption {
            let unfinished = slots.iter().filter(|slot| slot.is_none()).count();
            warn!(
                target = "figport::fetch",
                cause = %cause,
                unfinished,
                "fetch interrupted"
            );
        }

        // A slot is only empty when the run was interrupted.
        let cause = interruption.unwrap_or(FetchFailure::Cancelled);
        let outcomes = jobs
            .into_iter()
            .zip(slots)
            .map(|(job, slot)| FetchOutcome {
                id: job.id,
                result: slot.unwrap_or_else(|| Err(cause.clone())),
            })
            .collect();

        FetchReport { outcomes }
    }

    async fn fetch_one(
        &self,
        job: &FetchJob,
        format: ImageFormat,
    ) -> Result<FetchedAsset, FetchFailure> {
        let started = std::time::Instant::now();
        let result = self.download_and_store(job, format).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        histogram!("figport_fetch_ms").record(elapsed_ms as f64);

        match &result {
            Ok(asset) => {
                counter!("figport_fetch_success_total").increment(1);
                debug!(
                    target = "figport::fetch",
                    node_id = %job.id,
                    bytes = asset.bytes.len(),
                    elapsed_ms,
                    "asset fetched"
                );
            }
            Err(failure) => {
                counter!("figport_fetch_failed_total").increment(1);
                warn!(
                    target = "figport::fetch",
                    node_id = %job.id,
                    error = %failure,
                    elapsed_ms,
                    "asset fetch failed"
                );
            }
        }

        result
    }

    async fn download_and_store(
        &self,
        job: &FetchJob,
        format: ImageFormat,
    ) -> Result<FetchedAsset, FetchFailure> {
        let bytes = self.downloader.download(&job.url).await?;
        if bytes.is_empty() {
            return Err(FetchFailure::EmptyBody);
        }

        let stored = match &self.sink {
            Some(sink) => Some(
                sink.store(&job.id, &job.file_stem, format, bytes.clone())
                    .await
                    .map_err(|err| FetchFailure::storage(err.to_string()))?,
            ),
            None => None,
        };

        Ok(FetchedAsset {
            format,
            bytes,
            stored,
        })
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn wait_cancelled(signal: Option<&mut CancelSignal>) {
    match signal {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}
