//! Predicate-based selection of exportable nodes.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::tree::{Node, NodeId, NodeType};

type Predicate = Arc<dyn Fn(&Node) -> bool + Send + Sync>;

/// Filters a flattened document down to the identifiers worth exporting.
///
/// Selection preserves traversal order and never fails: an empty result is
/// a valid answer.
#[derive(Clone)]
pub struct Selector {
    description: String,
    predicate: Predicate,
}

impl Selector {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn all() -> Self {
        Self::new("all", |_| true)
    }

    pub fn by_type(kind: NodeType) -> Self {
        Self::new(format!("type = {kind}"), move |node| node.kind() == kind)
    }

    pub fn by_types(kinds: impl IntoIterator<Item = NodeType>) -> Self {
        let kinds: Vec<NodeType> = kinds.into_iter().collect();
        let description = format!(
            "type in [{}]",
            kinds
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self::new(description, move |node| kinds.contains(&node.kind()))
    }

    pub fn by_ids(ids: impl IntoIterator<Item = NodeId>) -> Self {
        let ids: HashSet<NodeId> = ids.into_iter().collect();
        Self::new(format!("{} explicit ids", ids.len()), move |node| {
            ids.contains(node.id())
        })
    }

    /// Restrict to nodes that are displayed, i.e. neither hidden themselves
    /// nor inside a hidden ancestor.
    pub fn visible_only(self) -> Self {
        let description = format!("{} and displayed", self.description);
        self.and_predicate(description, |node| node.is_displayed())
    }

    pub fn and(self, other: Selector) -> Self {
        let description = format!("{} and {}", self.description, other.description);
        let rhs = other.predicate;
        self.and_predicate(description, move |node| rhs(node))
    }

    fn and_predicate<F>(self, description: String, rhs: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        let lhs = self.predicate;
        Self::new(description, move |node| lhs(node) && rhs(node))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn matches(&self, node: &Node) -> bool {
        (self.predicate)(node)
    }

    /// Identifiers of matching nodes, in the order they were supplied.
    pub fn select<'a>(&self, nodes: impl IntoIterator<Item = &'a Node>) -> Vec<NodeId> {
        nodes
            .into_iter()
            .filter(|node| self.matches(node))
            .map(|node| node.id().clone())
            .collect()
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
