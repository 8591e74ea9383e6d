#![allow(dead_code)]

use attrflow::node::{compute_fn, Compute, ComputeContext, ComputeError};
use attrflow::types::{AttrId, AttrMap, Value};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Extract an i64 dependency or fail the compute.
pub fn dep_i64(deps: &AttrMap, name: &'static str) -> Result<i64, ComputeError> {
    deps.get(&AttrId::new(name))
        .and_then(Value::as_i64)
        .ok_or(ComputeError::MissingInput { what: name })
}

/// Compute returning `parent * 2`.
pub fn doubler(parent: &'static str) -> Arc<dyn Compute> {
    compute_fn(move |_ctx, deps| Ok(json!(dep_i64(&deps, parent)? * 2)))
}

/// Compute returning `parent + n`.
pub fn adder(parent: &'static str, n: i64) -> Arc<dyn Compute> {
    compute_fn(move |_ctx, deps| Ok(json!(dep_i64(&deps, parent)? + n)))
}

/// Compute summing every dependency value.
pub fn summer() -> Arc<dyn Compute> {
    compute_fn(|_ctx, deps| {
        let total: i64 = deps.values().filter_map(Value::as_i64).sum();
        Ok(json!(total))
    })
}

/// Compute that always fails.
pub fn failing(message: &'static str) -> Arc<dyn Compute> {
    compute_fn(move |_ctx, _deps| Err(ComputeError::Failed(message.to_string())))
}

/// Compute that copies its single parent and counts invocations.
pub struct CountingCopy {
    pub parent: &'static str,
    pub invocations: Arc<AtomicUsize>,
}

#[async_trait]
impl Compute for CountingCopy {
    async fn run(&self, _ctx: ComputeContext, deps: AttrMap) -> Result<Value, ComputeError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        deps.get(&AttrId::new(self.parent))
            .cloned()
            .ok_or(ComputeError::MissingInput { what: self.parent })
    }
}

/// Compute that sleeps until cancelled or a long timeout elapses.
pub struct BlockingCompute {
    pub sleep_ms: u64,
}

#[async_trait]
impl Compute for BlockingCompute {
    async fn run(&self, ctx: ComputeContext, _deps: AttrMap) -> Result<Value, ComputeError> {
        tokio::select! {
            _ = ctx.cancellation.cancelled() => Err(ComputeError::Cancelled),
            _ = sleep(Duration::from_millis(self.sleep_ms)) => Ok(json!(0)),
        }
    }
}

/// Build an `AttrMap` from `(id, value)` pairs.
pub fn attr_map<const N: usize>(entries: [(&str, Value); N]) -> AttrMap {
    entries
        .into_iter()
        .map(|(id, value)| (AttrId::new(id), value))
        .collect()
}
