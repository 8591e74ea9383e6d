mod common;
use common::*;

use attrflow::graphs::{clear_graph, load_graph, publish_graph, GraphBuilder};
use attrflow::processor::{Processor, ProcessorConfig};
use attrflow::types::{AttrId, AttrMap};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn single_chain(offset: i64) -> attrflow::graphs::Graph {
    let mut builder = GraphBuilder::new();
    builder.source("A").unwrap();
    builder.computed("B", ["A"], adder("A", offset)).unwrap();
    builder.compile().unwrap()
}

// The handle is process-global state, so every scenario lives in one test.
#[tokio::test]
async fn publish_load_and_pinning() {
    clear_graph();
    assert!(load_graph().is_none());

    let first = publish_graph(single_chain(1));
    let loaded = load_graph().expect("first graph published");
    assert!(Arc::ptr_eq(&first, &loaded));

    // A processor constructed from the handle pins the graph it saw.
    let mut pinned = Processor::from_active(
        AttrMap::default(),
        attr_map([("A", json!(10))]),
        ProcessorConfig::new(Some(2)),
    )
    .unwrap();

    // Swapping the active graph must not affect the pinned pass.
    let second = publish_graph(single_chain(100));
    let reloaded = load_graph().expect("second graph published");
    assert!(Arc::ptr_eq(&second, &reloaded));
    assert!(!Arc::ptr_eq(&first, &reloaded));

    pinned.process(&CancellationToken::new()).await.unwrap();
    assert_eq!(pinned.snapshot()[&AttrId::new("B")], json!(11));

    // A processor constructed now sees the replacement graph.
    let mut fresh = Processor::from_active(
        AttrMap::default(),
        attr_map([("A", json!(10))]),
        ProcessorConfig::new(Some(2)),
    )
    .unwrap();
    fresh.process(&CancellationToken::new()).await.unwrap();
    assert_eq!(fresh.snapshot()[&AttrId::new("B")], json!(110));

    clear_graph();
    assert!(load_graph().is_none());
}
