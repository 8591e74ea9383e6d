use proptest::prelude::*;

use attrflow::graphs::GraphBuilder;
use attrflow::node::{compute_fn, ComputeError};
use attrflow::processor::{Processor, ProcessorConfig};
use attrflow::types::{AttrId, AttrMap, Value};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Generate small DAG shapes: element `i` holds the parent indices of node
/// `i`, all strictly smaller than `i` so the shape is acyclic by
/// construction. Node 0 is always a source.
fn graph_shape() -> impl Strategy<Value = Vec<Vec<usize>>> {
    proptest::collection::vec(
        proptest::collection::vec(any::<prop::sample::Index>(), 0..=2),
        1..10,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, picks)| {
                if i == 0 {
                    Vec::new()
                } else {
                    let mut parents: Vec<usize> =
                        picks.into_iter().map(|pick| pick.index(i)).collect();
                    parents.sort_unstable();
                    parents.dedup();
                    parents
                }
            })
            .collect()
    })
}

fn attr(i: usize) -> AttrId {
    AttrId::new(format!("n{i}"))
}

fn block_on<F: std::future::Future<Output = ()>>(fut: F) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(fut);
}

proptest! {
    /// For arbitrary DAG shapes and seed-derived snapshots/inputs:
    /// every compute runs at most once, a dirty mark implies the value
    /// changed, a clean node keeps its prior value, and an input equal to
    /// the prior value never dirties its attribute.
    #[test]
    fn pass_invariants_hold(shape in graph_shape(), seed in any::<u64>()) {
        block_on(async move {
            let mut builder = GraphBuilder::new();
            let mut counters: Vec<Arc<AtomicUsize>> = Vec::new();
            for (i, parents) in shape.iter().enumerate() {
                let counter = Arc::new(AtomicUsize::new(0));
                counters.push(counter.clone());
                if parents.is_empty() {
                    builder.source(attr(i)).unwrap();
                } else {
                    let parent_ids: Vec<AttrId> = parents.iter().map(|p| attr(*p)).collect();
                    let view = parent_ids.clone();
                    builder
                        .computed(attr(i), parent_ids, compute_fn(move |_ctx, deps| {
                            counter.fetch_add(1, Ordering::SeqCst);
                            let mut total = 1i64;
                            for parent in &view {
                                total += deps
                                    .get(parent)
                                    .and_then(Value::as_i64)
                                    .ok_or(ComputeError::MissingInput { what: "parent" })?;
                            }
                            Ok(json!(total))
                        }))
                        .unwrap();
                }
            }
            let graph = Arc::new(builder.compile().unwrap());

            // Seed-derived prior snapshot and input overlay.
            let mut snapshot = AttrMap::default();
            let mut input = AttrMap::default();
            for i in 0..shape.len() {
                if (seed >> (i % 60)) & 1 == 1 {
                    snapshot.insert(attr(i), json!(((seed >> (i % 50)) & 7) as i64));
                }
                if shape[i].is_empty() && (seed >> ((i + 17) % 60)) & 1 == 1 {
                    input.insert(attr(i), json!(((seed >> ((i + 31) % 50)) & 7) as i64));
                }
            }

            let initial = snapshot.clone();
            let pass_input = input.clone();
            let mut processor =
                Processor::new(graph, snapshot, input, ProcessorConfig::new(Some(4)));
            processor.process(&CancellationToken::new()).await.unwrap();

            for (i, counter) in counters.iter().enumerate() {
                let runs = counter.load(Ordering::SeqCst);
                assert!(runs <= 1, "compute for {} ran {runs} times", attr(i));
            }

            let (final_snapshot, dirty) = processor.into_parts();
            for i in 0..shape.len() {
                let id = attr(i);
                let before = initial.get(&id);
                let after = final_snapshot.get(&id);
                if dirty.contains(&id) {
                    assert_ne!(before, after, "{id} dirty but unchanged");
                } else {
                    assert_eq!(before, after, "{id} clean but changed");
                }
                if let Some(provided) = pass_input.get(&id) {
                    if before == Some(provided) {
                        assert!(!dirty.contains(&id), "{id} dirtied by an equal input");
                    }
                }
            }
        });
    }
}
