//! Graph compilation: validation, child derivation, and cycle detection.
//!
//! Compilation turns accumulated registrations into an immutable [`Graph`].
//! Three things happen here: every parent reference is checked against the
//! registry, child edges are derived as the exact transpose of the parent
//! lists, and a Kahn-style topological peel proves the graph acyclic. The
//! peel's layers are kept on the compiled graph; execution itself is
//! event-driven, but the layers make diagnostics and tests deterministic.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::builder::GraphBuilder;
use crate::node::Compute;
use crate::types::AttrId;

/// Errors produced by registration and compilation.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// The registration itself is malformed.
    #[error("invalid registration for attribute [{id}]: {reason}")]
    #[diagnostic(
        code(attrflow::graph::invalid_registration),
        help("Give every attribute a non-empty id, and a compute whenever it has parents.")
    )]
    InvalidRegistration { id: AttrId, reason: &'static str },

    /// A parent reference points at an id that was never registered.
    #[error("attribute [{node}] depends on missing attribute [{parent}]")]
    #[diagnostic(
        code(attrflow::graph::missing_dependency),
        help("Register the parent attribute before compiling.")
    )]
    MissingDependency { node: AttrId, parent: AttrId },

    /// The registrations contain at least one dependency cycle.
    #[error("cycle detected in graph")]
    #[diagnostic(
        code(attrflow::graph::cycle_detected),
        help("Attribute dependencies must form a DAG; break the cycle and re-register.")
    )]
    CycleDetected,
}

/// One attribute in a compiled graph.
///
/// Immutable after compilation. `parents` is sorted and deduplicated;
/// `children` is the derived transpose, also sorted.
#[derive(Clone)]
pub struct CompiledNode {
    pub id: AttrId,
    pub parents: Vec<AttrId>,
    pub children: Vec<AttrId>,
    pub compute: Option<Arc<dyn Compute>>,
}

/// An immutable, validated dependency graph.
///
/// Produced by [`GraphBuilder::compile`]; shared read-only across all
/// [`Processor`](crate::processor::Processor)s, typically behind an `Arc` via
/// [`publish_graph`](super::publish_graph).
pub struct Graph {
    nodes: FxHashMap<AttrId, CompiledNode>,
    layers: Vec<Vec<AttrId>>,
}

impl Graph {
    /// Look up one compiled node.
    #[must_use]
    pub fn node(&self, id: &AttrId) -> Option<&CompiledNode> {
        self.nodes.get(id)
    }

    /// All compiled nodes, keyed by id.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<AttrId, CompiledNode> {
        &self.nodes
    }

    /// Topological layers from the compile-time peel, each sorted by id.
    ///
    /// Layer `k` contains exactly the attributes whose longest parent chain
    /// has length `k`.
    #[must_use]
    pub fn layers(&self) -> &[Vec<AttrId>] {
        &self.layers
    }

    /// Number of attributes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` for the empty graph.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` when `id` is an attribute of this graph.
    #[must_use]
    pub fn contains(&self, id: &AttrId) -> bool {
        self.nodes.contains_key(id)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl GraphBuilder {
    /// Compiles the registrations into an immutable [`Graph`].
    ///
    /// Validation performed, in order:
    ///
    /// 1. every listed parent exists as a registered attribute;
    /// 2. child edges are derived as the transpose of the parent lists;
    /// 3. a Kahn-style peel drains zero-indegree attributes layer by layer;
    ///    anything left undrained proves a cycle.
    ///
    /// Each drained layer is sorted by id, so layer contents and order are
    /// deterministic for a given registration set.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingDependency`] naming the referencing node and the
    /// unknown parent, or [`GraphError::CycleDetected`].
    #[tracing::instrument(skip(self), fields(nodes = self.nodes.len()))]
    pub fn compile(self) -> Result<Graph, GraphError> {
        let mut children: FxHashMap<AttrId, Vec<AttrId>> = FxHashMap::default();
        let mut indegree: FxHashMap<AttrId, usize> = FxHashMap::default();

        for (id, registration) in &self.nodes {
            indegree.insert(id.clone(), registration.parents.len());
            for parent in &registration.parents {
                if !self.nodes.contains_key(parent) {
                    return Err(GraphError::MissingDependency {
                        node: id.clone(),
                        parent: parent.clone(),
                    });
                }
                children.entry(parent.clone()).or_default().push(id.clone());
            }
        }

        let mut frontier: Vec<AttrId> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| id.clone())
            .collect();
        frontier.sort();

        let mut layers: Vec<Vec<AttrId>> = Vec::new();
        let mut drained = 0usize;
        while !frontier.is_empty() {
            drained += frontier.len();
            let mut next: Vec<AttrId> = Vec::new();
            for id in &frontier {
                for child in children.get(id).map(Vec::as_slice).unwrap_or_default() {
                    if let Some(degree) = indegree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(child.clone());
                        }
                    }
                }
            }
            next.sort();
            layers.push(std::mem::replace(&mut frontier, next));
        }

        if drained < self.nodes.len() {
            return Err(GraphError::CycleDetected);
        }

        let mut nodes = FxHashMap::default();
        for (id, registration) in self.nodes {
            let mut child_ids = children.remove(&id).unwrap_or_default();
            child_ids.sort();
            nodes.insert(
                id.clone(),
                CompiledNode {
                    id,
                    parents: registration.parents,
                    children: child_ids,
                    compute: registration.compute,
                },
            );
        }

        tracing::debug!(nodes = nodes.len(), layers = layers.len(), "graph compiled");
        Ok(Graph { nodes, layers })
    }
}
