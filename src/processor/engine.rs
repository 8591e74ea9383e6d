use miette::Diagnostic;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::config::ProcessorConfig;
use crate::graphs::{load_graph, CompiledNode, Graph};
use crate::node::{ComputeContext, ComputeError};
use crate::tasks::TaskGroup;
use crate::types::{AttrId, AttrMap, DirtySet, Value};

/// Errors surfaced by [`Processor::process`].
#[derive(Debug, Error, Diagnostic)]
pub enum ProcessError {
    /// No graph has been published to the global handle.
    #[error("no active graph has been published")]
    #[diagnostic(
        code(attrflow::processor::no_active_graph),
        help("Publish a compiled graph with publish_graph before constructing from the handle.")
    )]
    NoActiveGraph,

    /// `process` was called a second time on the same processor.
    #[error("evaluation pass already run for this processor")]
    #[diagnostic(
        code(attrflow::processor::pass_already_run),
        help("Processors are single-use; harvest the snapshot with into_parts and build a new one.")
    )]
    PassAlreadyRun,

    /// A compute returned an error; the pass was aborted.
    #[error("compute for attribute [{attr}] failed: {source}")]
    #[diagnostic(code(attrflow::processor::compute))]
    Compute {
        attr: AttrId,
        #[source]
        source: ComputeError,
    },

    /// The pass cancellation signal fired.
    #[error("evaluation pass cancelled")]
    #[diagnostic(code(attrflow::processor::cancelled))]
    Cancelled,

    /// A worker task panicked or was aborted.
    #[error("worker task join error: {0}")]
    #[diagnostic(code(attrflow::processor::join))]
    Join(#[from] JoinError),
}

/// Snapshot and dirty set of one pass, guarded by a single lock.
///
/// Writes are serialized through the write half; dependency views are
/// assembled under the read half. The eligibility hand-off guarantees every
/// parent's write is visible before any child reads.
struct PassState {
    data: AttrMap,
    dirty: DirtySet,
}

/// Everything the pool workers share during one pass.
struct PassShared {
    graph: Arc<Graph>,
    input: AttrMap,
    state: RwLock<PassState>,
    /// Per-attribute count of parents not yet terminal. Only the decrementer
    /// that reaches zero enqueues the attribute.
    remaining: FxHashMap<AttrId, AtomicUsize>,
    /// Attributes not yet terminal; reaching zero closes the ready queue.
    pending: AtomicUsize,
    ready_tx: Mutex<Option<flume::Sender<AttrId>>>,
    ready_rx: flume::Receiver<AttrId>,
}

impl PassShared {
    fn enqueue(&self, attr: AttrId) {
        let guard = self.ready_tx.lock();
        if let Some(tx) = guard.as_ref() {
            // Capacity equals the node count and each attribute is enqueued
            // exactly once, so this never blocks or overflows.
            let _ = tx.try_send(attr);
        }
    }

    fn close_queue(&self) {
        self.ready_tx.lock().take();
    }
}

/// Executes one evaluation pass over a pinned graph.
///
/// A processor is single-use: construct it with the prior snapshot and the
/// pass's input overlay, call [`process`](Self::process) once, then harvest
/// [`snapshot`](Self::snapshot) and [`dirty`](Self::dirty) (or
/// [`into_parts`](Self::into_parts) to feed the next pass). The snapshot and
/// input maps are owned by the processor, so the caller's copies are never
/// touched.
///
/// Within a pass each attribute moves through
/// `Waiting → Ready → (Overridden | Pruned | Computing) → Done[±dirty]`;
/// terminal states decrement the children's remaining-parent counters, and a
/// counter reaching zero hands the child to the worker pool.
pub struct Processor {
    graph: Arc<Graph>,
    data: AttrMap,
    input: AttrMap,
    dirty: DirtySet,
    parallelism: usize,
    spent: bool,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("data", &self.data)
            .field("input", &self.input)
            .field("dirty", &self.dirty)
            .field("parallelism", &self.parallelism)
            .field("spent", &self.spent)
            .finish_non_exhaustive()
    }
}

impl Processor {
    /// Creates a processor against an explicit graph.
    pub fn new(graph: Arc<Graph>, snapshot: AttrMap, input: AttrMap, config: ProcessorConfig) -> Self {
        Self {
            graph,
            data: snapshot,
            input,
            dirty: DirtySet::default(),
            parallelism: config.parallelism,
            spent: false,
        }
    }

    /// Creates a processor pinned to the currently published graph.
    ///
    /// The handle is read exactly once, here; publishing a different graph
    /// afterwards does not affect this processor.
    ///
    /// # Errors
    ///
    /// [`ProcessError::NoActiveGraph`] when nothing has been published.
    pub fn from_active(
        snapshot: AttrMap,
        input: AttrMap,
        config: ProcessorConfig,
    ) -> Result<Self, ProcessError> {
        let graph = load_graph().ok_or(ProcessError::NoActiveGraph)?;
        Ok(Self::new(graph, snapshot, input, config))
    }

    /// The attribute snapshot as of the last completed pass.
    #[must_use]
    pub fn snapshot(&self) -> &AttrMap {
        &self.data
    }

    /// The attributes whose value was replaced during the pass.
    #[must_use]
    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    /// Consumes the processor, yielding the final snapshot and dirty set.
    ///
    /// The snapshot is the natural input for the next pass's processor.
    #[must_use]
    pub fn into_parts(self) -> (AttrMap, DirtySet) {
        (self.data, self.dirty)
    }

    /// Runs one evaluation pass.
    ///
    /// Scheduling is event-driven: zero-indegree attributes seed a ready
    /// queue, `parallelism` pool workers drain it, and every terminal
    /// attribute fans out to its children. An attribute present in the input
    /// overlay takes the input value without consulting its compute; an
    /// attribute with no dirty parent is pruned; everything else recomputes
    /// and is marked dirty only when the result differs from the prior value
    /// under deep equality.
    ///
    /// # Errors
    ///
    /// The first [`ProcessError::Compute`] or [`ProcessError::Cancelled`]
    /// observed. On failure the pass token has fired, in-flight sibling
    /// results are discarded, and the snapshot and dirty set are left in an
    /// unspecified partial state; retry with a fresh processor instead of
    /// reading them.
    #[instrument(
        skip(self, cancel),
        fields(nodes = self.graph.len(), parallelism = self.parallelism),
        err
    )]
    pub async fn process(&mut self, cancel: &CancellationToken) -> Result<(), ProcessError> {
        if self.spent {
            return Err(ProcessError::PassAlreadyRun);
        }
        self.spent = true;

        let node_count = self.graph.len();
        if node_count == 0 {
            tracing::debug!("empty graph, nothing to evaluate");
            return Ok(());
        }

        for key in self.input.keys() {
            if !self.graph.contains(key) {
                tracing::debug!(attr = %key, "input names an attribute absent from the graph, ignoring");
            }
        }

        let (ready_tx, ready_rx) = flume::bounded(node_count);
        let mut remaining = FxHashMap::default();
        for (id, node) in self.graph.nodes() {
            remaining.insert(id.clone(), AtomicUsize::new(node.parents.len()));
            if node.parents.is_empty() {
                let _ = ready_tx.try_send(id.clone());
            }
        }

        let shared = Arc::new(PassShared {
            graph: self.graph.clone(),
            input: std::mem::take(&mut self.input),
            state: RwLock::new(PassState {
                data: std::mem::take(&mut self.data),
                dirty: std::mem::take(&mut self.dirty),
            }),
            remaining,
            pending: AtomicUsize::new(node_count),
            ready_tx: Mutex::new(Some(ready_tx)),
            ready_rx,
        });

        let mut group: TaskGroup<ProcessError> =
            TaskGroup::new(self.parallelism, cancel.child_token());
        for _ in 0..self.parallelism {
            let shared = Arc::clone(&shared);
            let token = group.token();
            group.spawn(async move { worker(shared, token).await });
        }
        let result = group.join().await;

        // All workers have joined, so the pass state can be reclaimed. After a
        // failed pass this is partial data; process() documents it as such.
        if let Some(shared) = Arc::into_inner(shared) {
            let state = shared.state.into_inner();
            self.data = state.data;
            self.dirty = state.dirty;
            self.input = shared.input;
        }

        result
    }
}

/// One pool worker: drain ready attributes until the queue closes or the
/// pass token fires.
async fn worker(shared: Arc<PassShared>, cancel: CancellationToken) -> Result<(), ProcessError> {
    loop {
        let attr = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProcessError::Cancelled),
            received = shared.ready_rx.recv_async() => match received {
                Ok(attr) => attr,
                // Queue closed: every attribute reached a terminal state.
                Err(_) => return Ok(()),
            },
        };
        run_node(&shared, &cancel, attr).await?;
    }
}

/// Drive one attribute to its terminal state, then fan out to its children.
async fn run_node(
    shared: &PassShared,
    cancel: &CancellationToken,
    attr: AttrId,
) -> Result<(), ProcessError> {
    let Some(node) = shared.graph.node(&attr) else {
        return Ok(());
    };

    if let Some(value) = evaluate(shared, cancel, node).await? {
        let mut state = shared.state.write();
        state.data.insert(attr.clone(), value);
        state.dirty.insert(attr.clone());
    }

    for child in &node.children {
        if let Some(remaining) = shared.remaining.get(child) {
            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                shared.enqueue(child.clone());
            }
        }
    }
    if shared.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
        shared.close_queue();
    }

    Ok(())
}

/// Produce the attribute's replacement value, or `None` when it keeps its
/// prior value (pruned, or recomputed to an equal result).
async fn evaluate(
    shared: &PassShared,
    cancel: &CancellationToken,
    node: &CompiledNode,
) -> Result<Option<Value>, ProcessError> {
    // Input override: the overlay models an external observation and is
    // authoritative, so the compute is never consulted.
    if let Some(value) = shared.input.get(&node.id) {
        let changed = {
            let state = shared.state.read();
            state.data.get(&node.id) != Some(value)
        };
        tracing::trace!(attr = %node.id, changed, "input override");
        return Ok(changed.then(|| value.clone()));
    }

    let Some(compute) = node.compute.as_ref() else {
        return Ok(None);
    };

    // Pruning: with every parent clean the prior value still holds.
    let deps = {
        let state = shared.state.read();
        if !node.parents.iter().any(|parent| state.dirty.contains(parent)) {
            tracing::trace!(attr = %node.id, "pruned, no dirty parent");
            return Ok(None);
        }
        node.parents
            .iter()
            .filter_map(|parent| {
                state
                    .data
                    .get(parent)
                    .map(|value| (parent.clone(), value.clone()))
            })
            .collect::<AttrMap>()
    };

    let ctx = ComputeContext {
        attr: node.id.clone(),
        cancellation: cancel.clone(),
    };
    let value = compute.run(ctx, deps).await.map_err(|source| match source {
        ComputeError::Cancelled => ProcessError::Cancelled,
        source => ProcessError::Compute {
            attr: node.id.clone(),
            source,
        },
    })?;

    let changed = {
        let state = shared.state.read();
        state.data.get(&node.id) != Some(&value)
    };
    tracing::trace!(attr = %node.id, changed, "computed");
    Ok(changed.then_some(value))
}
