//! Graph definition and compilation for incremental evaluation.
//!
//! This module provides the registration and compilation machinery for
//! dependency graphs. The entry point is [`GraphBuilder`]: callers register
//! attributes with their parent lists and optional computes, then
//! [`compile`](GraphBuilder::compile) validates the topology and freezes it
//! into an immutable [`Graph`] that [`Processor`](crate::processor::Processor)
//! instances share read-only.
//!
//! # Core Concepts
//!
//! - **Registration**: one attribute id, its parents, and an optional
//!   [`Compute`](crate::node::Compute)
//! - **Compilation**: cross-reference validation, child-edge derivation, and
//!   Kahn-style cycle detection
//! - **Publication**: [`publish_graph`] installs a compiled graph as the
//!   process-wide active graph; [`load_graph`] pins it
//!
//! # Quick Start
//!
//! ```rust
//! use attrflow::graphs::GraphBuilder;
//! use attrflow::node::compute_fn;
//! use attrflow::types::AttrId;
//!
//! let mut builder = GraphBuilder::new();
//! builder.source("a")?;
//! builder.computed("b", ["a"], compute_fn(|_ctx, deps| {
//!     let a = deps
//!         .get(&AttrId::new("a"))
//!         .and_then(|v| v.as_i64())
//!         .unwrap_or_default();
//!     Ok((a * 2).into())
//! }))?;
//!
//! let graph = builder.compile()?;
//! assert_eq!(graph.len(), 2);
//! # Ok::<(), attrflow::graphs::GraphError>(())
//! ```

mod builder;
mod compilation;
mod handle;


pub use builder::GraphBuilder;
pub use compilation::{CompiledNode, Graph, GraphError};
pub use handle::{clear_graph, load_graph, publish_graph, publish_graph_arc};
