//! GraphBuilder implementation for registering attribute graphs.
//!
//! This module contains the mutable registration surface. Validation that
//! spans nodes (missing parents, cycles) happens in
//! [`compile`](GraphBuilder::compile); registration only checks what a single
//! node can get wrong on its own.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::compilation::GraphError;
use crate::node::Compute;
use crate::types::AttrId;

/// One registered attribute, prior to compilation.
#[derive(Clone)]
pub(super) struct Registration {
    /// Sorted, deduplicated parent ids.
    pub(super) parents: Vec<AttrId>,
    /// How to recompute the attribute; `None` marks a pure input sink.
    pub(super) compute: Option<Arc<dyn Compute>>,
}

/// Builder for registering attribute graphs.
///
/// `GraphBuilder` accumulates registrations into an in-progress graph. Each
/// registration names an attribute, the attributes it reads, and the
/// [`Compute`] that combines them. Registering the same id again replaces the
/// earlier entry. [`compile`](Self::compile) freezes the result.
///
/// # Examples
///
/// ```rust
/// use attrflow::graphs::GraphBuilder;
/// use attrflow::node::compute_fn;
/// use attrflow::types::AttrId;
///
/// let mut builder = GraphBuilder::new();
/// builder.source("base")?;
/// builder.computed("derived", ["base"], compute_fn(|_ctx, deps| {
///     deps.get(&AttrId::new("base"))
///         .cloned()
///         .ok_or(attrflow::node::ComputeError::MissingInput { what: "base" })
/// }))?;
/// let graph = builder.compile()?;
/// # let _ = graph;
/// # Ok::<(), attrflow::graphs::GraphError>(())
/// ```
#[derive(Default)]
pub struct GraphBuilder {
    /// Registrations keyed by attribute id; last registration wins.
    pub(super) nodes: FxHashMap<AttrId, Registration>,
}

impl GraphBuilder {
    /// Creates a new, empty graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an attribute with its parents and optional compute.
    ///
    /// Parents are normalized: sorted, with duplicates removed. A later
    /// registration with the same `id` replaces the earlier one. Child edges
    /// and cross-references are not derived here; that is
    /// [`compile`](Self::compile)'s job.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidRegistration`] when `id` is empty, or when
    /// `parents` is non-empty while `compute` is `None` (a node with
    /// dependencies but no way to combine them is meaningless).
    pub fn register(
        &mut self,
        id: impl Into<AttrId>,
        parents: impl IntoIterator<Item = impl Into<AttrId>>,
        compute: Option<Arc<dyn Compute>>,
    ) -> Result<(), GraphError> {
        let id = id.into();
        if id.is_empty() {
            return Err(GraphError::InvalidRegistration {
                id,
                reason: "attribute id must not be empty",
            });
        }

        let mut parents: Vec<AttrId> = parents.into_iter().map(Into::into).collect();
        if !parents.is_empty() && compute.is_none() {
            return Err(GraphError::InvalidRegistration {
                id,
                reason: "an attribute with parents requires a compute",
            });
        }
        parents.sort();
        parents.dedup();

        if self.nodes.contains_key(&id) {
            tracing::debug!(attr = %id, "replacing earlier registration");
        }
        self.nodes.insert(id, Registration { parents, compute });
        Ok(())
    }

    /// Registers a pure input sink: no parents, no compute.
    ///
    /// Source attributes only ever change through the input overlay of a
    /// pass.
    pub fn source(&mut self, id: impl Into<AttrId>) -> Result<(), GraphError> {
        self.register(id, Vec::<AttrId>::new(), None)
    }

    /// Registers a computed attribute. Shorthand for [`register`](Self::register)
    /// with a compute present.
    pub fn computed(
        &mut self,
        id: impl Into<AttrId>,
        parents: impl IntoIterator<Item = impl Into<AttrId>>,
        compute: Arc<dyn Compute>,
    ) -> Result<(), GraphError> {
        self.register(id, parents, Some(compute))
    }

    /// Number of registered attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
