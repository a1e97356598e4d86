use std::process;
use std::sync::Arc;

use figport::application::cancel::{CancelHandle, cancellation};
use figport::application::error::AppError;
use figport::application::export::{ExportParams, Exporter};
use figport::config::{ExportArgs, Settings};
use figport::domain::selector::Selector;
use figport::domain::tree::NodeId;
use figport::infra::error::InfraError;
use figport::infra::http::HttpDownloader;
use figport::infra::storage::AssetDirectory;
use figport_api_types::NodeType;
use tracing::{info, warn};

use super::{client, print_json};

pub async fn run(settings: &Settings, args: ExportArgs) -> Result<(), AppError> {
    let key = args.key.trim().to_string();
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::validation(format!(
            "document key `{}` must be non-empty and contain only letters, digits, `-` or `_`",
            args.key
        )));
    }

    let client = Arc::new(client(settings)?);
    let downloader = Arc::new(HttpDownloader::new(settings.api.timeout)?);
    let output_dir = settings.export.output_dir.join(&key);
    let sink = Arc::new(
        AssetDirectory::new(output_dir.clone())
            .map_err(|err| InfraError::output_directory(&output_dir, err))?,
    );

    let ids: Vec<NodeId> = args.ids.into_iter().map(NodeId::from).collect();
    let selector = build_selector(args.types, &ids, args.include_hidden);

    let params = ExportParams {
        document_key: key,
        scale: settings.export.scale,
        format: settings.export.format,
        ids,
        naming: settings.export.naming,
        concurrency: settings.export.concurrency,
        deadline: settings.export.deadline,
    };

    info!(
        target = "figport::export",
        document = %params.document_key,
        selector = selector.description(),
        format = %params.format,
        scale = params.scale,
        output_dir = %output_dir.display(),
        "starting export"
    );

    let (handle, signal) = cancellation();
    let interrupt = tokio::spawn(cancel_on_interrupt(handle));

    let exporter = Exporter::new(client.clone(), client, downloader)
        .with_sink(sink)
        .with_cancel(signal);
    let result = exporter.export(&selector, &params).await;
    interrupt.abort();

    print_json(&result?)
}

fn build_selector(types: Vec<NodeType>, ids: &[NodeId], include_hidden: bool) -> Selector {
    let types = if types.is_empty() {
        vec![NodeType::Frame]
    } else {
        types
    };

    let mut selector = Selector::by_types(types);
    if !ids.is_empty() {
        selector = selector.and(Selector::by_ids(ids.iter().cloned()));
    }
    if !include_hidden {
        selector = selector.visible_only();
    }
    selector
}

/// First interrupt stops outstanding downloads; a second one exits immediately.
async fn cancel_on_interrupt(handle: CancelHandle) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!(
        target = "figport::export",
        "interrupt received, cancelling outstanding downloads"
    );
    handle.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        process::exit(130);
    }
}
