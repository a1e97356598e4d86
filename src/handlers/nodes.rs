use figport::application::error::AppError;
use figport::application::ports::DocumentSource;
use figport::config::{NodesArgs, Settings};
use figport::domain::selector::Selector;
use figport_api_types::NodeType;
use serde::Serialize;

use super::{client, print_json};

#[derive(Serialize)]
struct NodeRow<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: NodeType,
    name: &'a str,
    depth: usize,
    visible: bool,
    displayed: bool,
}

pub async fn run(settings: &Settings, args: NodesArgs) -> Result<(), AppError> {
    let document = client(settings)?.document(&args.key).await?;
    let selector = if args.types.is_empty() {
        Selector::all()
    } else {
        Selector::by_types(args.types)
    };

    let rows: Vec<NodeRow<'_>> = document
        .traverse()
        .filter(|node| selector.matches(node))
        .map(|node| NodeRow {
            id: node.id().as_str(),
            kind: node.kind(),
            name: node.name(),
            depth: node.depth(),
            visible: node.is_visible(),
            displayed: node.is_displayed(),
        })
        .collect();

    print_json(&rows)
}
