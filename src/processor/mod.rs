//! Evaluation passes over compiled graphs.
//!
//! A [`Processor`] owns one evaluation pass: constructed with a pinned
//! [`Graph`](crate::graphs::Graph), a prior snapshot, and an input overlay,
//! it recomputes exactly the attributes whose value could have changed and
//! records which ones did. Scheduling is event-driven: a node becomes
//! eligible when its last parent reaches a terminal state, and up to
//! `parallelism` computes run concurrently.
//!
//! # Quick Start
//!
//! ```rust
//! use attrflow::graphs::GraphBuilder;
//! use attrflow::node::{compute_fn, ComputeError};
//! use attrflow::processor::{Processor, ProcessorConfig};
//! use attrflow::types::{AttrId, AttrMap};
//! use serde_json::json;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = GraphBuilder::new();
//! builder.source("a")?;
//! builder.computed("b", ["a"], compute_fn(|_ctx, deps| {
//!     let a = deps
//!         .get(&AttrId::new("a"))
//!         .and_then(|v| v.as_i64())
//!         .ok_or(ComputeError::MissingInput { what: "a" })?;
//!     Ok(json!(a * 2))
//! }))?;
//! let graph = Arc::new(builder.compile()?);
//!
//! let mut input = AttrMap::default();
//! input.insert("a".into(), json!(5));
//!
//! let mut processor =
//!     Processor::new(graph, AttrMap::default(), input, ProcessorConfig::default());
//! processor.process(&CancellationToken::new()).await?;
//!
//! assert_eq!(processor.snapshot()[&AttrId::new("b")], json!(10));
//! assert!(processor.dirty().contains(&AttrId::new("b")));
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;

pub use config::{ProcessorConfig, DEFAULT_PARALLELISM};
pub use engine::{ProcessError, Processor};
