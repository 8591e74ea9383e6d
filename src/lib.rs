//! ```text
//! GraphBuilder ─┬─► compile ─► Graph ─► publish_graph / load_graph
//!               │              │
//!               │              └─► Processor::process
//!               │                  │
//!               │                  ├─► TaskGroup (P workers, shared cancellation)
//!               │                  ├─► Compute impls ─► new attribute values
//!               │                  └─► snapshot + dirty set
//!               │
//!               └─► ProcessorConfig wires parallelism end-to-end
//! ```
//!
//! Attrflow is an incremental dependency-graph evaluator. Callers register
//! named attributes together with the attributes each depends on, compile the
//! registration into an immutable DAG, and run evaluation passes that
//! recompute exactly the attributes whose value could have changed, in
//! parallel where the graph allows it, pruning branches whose inputs are
//! unchanged.

pub mod graphs;
pub mod node;
pub mod processor;
pub mod tasks;
pub mod types;
