//! Process-wide handle to the active compiled graph.
//!
//! The handle is an atomically swappable pointer. Publication installs a new
//! graph; readers pin the current one with a cheap atomic load. A
//! [`Processor`](crate::processor::Processor) pins the handle once at
//! construction, so replacing the active graph never affects a pass already
//! in flight.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use super::compilation::Graph;

static ACTIVE: ArcSwapOption<Graph> = ArcSwapOption::const_empty();

/// Installs `graph` as the process-wide active graph.
///
/// Returns the shared handle so the caller can also construct processors
/// against it directly.
pub fn publish_graph(graph: Graph) -> Arc<Graph> {
    let graph = Arc::new(graph);
    publish_graph_arc(graph.clone());
    graph
}

/// Installs an already-shared graph as the active graph.
pub fn publish_graph_arc(graph: Arc<Graph>) {
    tracing::debug!(nodes = graph.len(), "publishing active graph");
    ACTIVE.store(Some(graph));
}

/// Pins the currently active graph, if any has been published.
#[must_use]
pub fn load_graph() -> Option<Arc<Graph>> {
    ACTIVE.load_full()
}

/// Removes the active graph. Intended for test isolation.
pub fn clear_graph() {
    ACTIVE.store(None);
}
