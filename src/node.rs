use crate::types::{AttrId, AttrMap, Value};
use async_trait::async_trait;
use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Execution context passed to computes during an evaluation pass.
///
/// `ComputeContext` tells a compute which attribute it is producing and hands
/// it the pass-wide cancellation token. Long-running computes are expected to
/// observe the token at their suspension points; when any sibling fails or
/// the caller cancels the pass, the token fires and cooperative computes
/// return early.
///
/// # Examples
///
/// ```rust,no_run
/// use attrflow::node::{Compute, ComputeContext, ComputeError};
/// use attrflow::types::{AttrMap, Value};
/// use async_trait::async_trait;
///
/// struct Sum;
///
/// #[async_trait]
/// impl Compute for Sum {
///     async fn run(&self, ctx: ComputeContext, deps: AttrMap) -> Result<Value, ComputeError> {
///         if ctx.cancellation.is_cancelled() {
///             return Err(ComputeError::Cancelled);
///         }
///         let total: i64 = deps.values().filter_map(|v| v.as_i64()).sum();
///         Ok(total.into())
///     }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct ComputeContext {
    /// The attribute this invocation is producing a value for.
    pub attr: AttrId,
    /// Pass-wide cancellation signal, shared by all workers of one pass.
    pub cancellation: CancellationToken,
}

impl ComputeContext {
    /// Returns an error when the pass has been cancelled, for use with `?`
    /// at a compute's own checkpoints.
    pub fn check_cancelled(&self) -> Result<(), ComputeError> {
        if self.cancellation.is_cancelled() {
            Err(ComputeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Core trait for attribute computations.
///
/// A `Compute` produces the new value of one attribute from the current
/// values of its parents. The dependency view `deps` maps each parent id to
/// the value it holds after all parents reached a terminal state in the
/// current pass; parents with no value in the snapshot are omitted.
///
/// # Design Principles
///
/// - **Deterministic**: same dependency view, same result
/// - **Side-effect free**: the evaluator may skip an invocation entirely when
///   no parent changed
/// - **Cooperative**: observe `ctx.cancellation` in anything long-running
///
/// Implementations must be `Send + Sync`; one compute may be invoked from any
/// worker of the pool.
#[async_trait]
pub trait Compute: Send + Sync {
    /// Produce the attribute's new value from its parents' values.
    ///
    /// # Parameters
    /// * `ctx` - identity of the attribute plus the pass cancellation token
    /// * `deps` - read-only copy of each parent's current value
    ///
    /// # Returns
    /// * `Ok(Value)` - the candidate value, compared against the prior
    ///   snapshot value by the evaluator
    /// * `Err(ComputeError)` - fatal, aborts the pass
    async fn run(&self, ctx: ComputeContext, deps: AttrMap) -> Result<Value, ComputeError>;
}

/// Errors a compute can return.
///
/// Any error aborts the pass: the shared cancellation token fires, sibling
/// computes stop at their next suspension point, and
/// [`Processor::process`](crate::processor::Processor::process) surfaces the
/// first error observed.
#[derive(Debug, Error, Diagnostic)]
pub enum ComputeError {
    /// A parent value the compute requires is missing from the dependency view.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(attrflow::compute::missing_input),
        help("Check that the parent attribute holds a value in the snapshot or input.")
    )]
    MissingInput { what: &'static str },

    /// Domain-specific failure described by the compute itself.
    #[error("compute failed: {0}")]
    #[diagnostic(code(attrflow::compute::failed))]
    Failed(String),

    /// JSON extraction or construction error.
    #[error(transparent)]
    #[diagnostic(code(attrflow::compute::serde_json))]
    Serde(#[from] serde_json::Error),

    /// The pass was cancelled while this compute was running.
    #[error("compute cancelled")]
    #[diagnostic(code(attrflow::compute::cancelled))]
    Cancelled,
}

/// Adapter turning a plain closure into a [`Compute`].
///
/// Registration sites rarely want a named struct per attribute; `FnCompute`
/// wraps any suitable closure so graphs can be declared inline. Use
/// [`compute_fn`] for the common case.
pub struct FnCompute<F>(F);

#[async_trait]
impl<F> Compute for FnCompute<F>
where
    F: Fn(ComputeContext, AttrMap) -> Result<Value, ComputeError> + Send + Sync,
{
    async fn run(&self, ctx: ComputeContext, deps: AttrMap) -> Result<Value, ComputeError> {
        (self.0)(ctx, deps)
    }
}

/// Wrap a synchronous closure as a shareable compute.
///
/// # Examples
///
/// ```rust
/// use attrflow::node::compute_fn;
/// use attrflow::types::AttrId;
///
/// let double = compute_fn(|_ctx, deps| {
///     let a = deps
///         .get(&AttrId::new("a"))
///         .and_then(|v| v.as_i64())
///         .unwrap_or_default();
///     Ok((a * 2).into())
/// });
/// # let _ = double;
/// ```
pub fn compute_fn<F>(f: F) -> Arc<dyn Compute>
where
    F: Fn(ComputeContext, AttrMap) -> Result<Value, ComputeError> + Send + Sync + 'static,
{
    Arc::new(FnCompute(f))
}
