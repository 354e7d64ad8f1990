//! Graph queries end to end: JSON request in, envelope out.
//!
//! Each test builds an [`AppState`] over an in-memory model and talks to it
//! only through the dispatcher, the way the host UI does.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use tracegraph_core::{EdgeKind, InMemoryModel, NodeId};
use tracegraph_server::config::ServerConfig;
use tracegraph_server::hub::ChannelHub;
use tracegraph_server::schema::{Envelope, Request};
use tracegraph_server::state::AppState;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// NAV -> Shop.Home -> Shop.ACT_Load, with one user role allowed on both.
fn shop_model() -> InMemoryModel {
    InMemoryModel::new()
        .with_page("Shop.Home")
        .with_microflow("Shop.ACT_Load")
        .with_navigation("Responsive", "Shop.Home")
        .with_reference("Shop.Home", "Shop.ACT_Load", EdgeKind::Calls)
        .with_user_role("Customer", &["Shop.Buyer"])
        .with_allowed_role("Shop.Home", "Shop.Buyer")
        .with_allowed_role("Shop.ACT_Load", "Shop.Buyer")
}

fn app(model: InMemoryModel, include_security: bool) -> (AppState, UnboundedReceiver<Envelope>) {
    let (hub, rx) = ChannelHub::unbounded();
    let config = ServerConfig {
        include_security,
        include_trace: false,
        ..ServerConfig::default()
    };
    let state = AppState::new(Arc::new(model), Arc::new(hub), &config, Handle::current());
    (state, rx)
}

async fn next(rx: &mut UnboundedReceiver<Envelope>) -> Envelope {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an envelope")
        .expect("hub closed")
}

/// Sends an RPC and returns its `data`, failing on `RPC_ERROR`.
async fn call(
    state: &AppState,
    rx: &mut UnboundedReceiver<Envelope>,
    method: &str,
    params: Value,
) -> Value {
    state.dispatcher.dispatch(Request::rpc("req", method, params));
    match next(rx).await {
        Envelope::RpcSuccess { req_id, data } => {
            assert_eq!(req_id, "req");
            data
        }
        other => panic!("{method} failed: {other:?}"),
    }
}

fn ids(nodes: &Value) -> Vec<String> {
    nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn navigation_chain_without_security() {
    let (state, mut rx) = app(shop_model(), false);

    let graph = call(&state, &mut rx, "getTraceabilityGraph", Value::Null).await;
    assert_eq!(
        ids(&graph["nodes"]),
        vec!["Navigation.Responsive", "Shop.Home", "Shop.ACT_Load"]
    );
    assert_eq!(graph["edges"].as_array().unwrap().len(), 2);
    assert_eq!(graph["nodes"][0]["name"], "Home Page (Responsive)");
    assert_eq!(graph["nodes"][0]["module"], "Navigation");
    assert_eq!(
        graph["edges"][0],
        json!({"source": "Navigation.Responsive", "target": "Shop.Home", "type": "SHOWS"})
    );

    let downstream = call(
        &state,
        &mut rx,
        "findCommonDownstream",
        json!({"nodeIds": ["Navigation.Responsive"]}),
    )
    .await;
    assert_eq!(ids(&downstream["nodes"]), vec!["Shop.Home", "Shop.ACT_Load"]);
    assert_eq!(
        downstream["edges"],
        json!([{"source": "Shop.Home", "target": "Shop.ACT_Load", "type": "CALLS"}])
    );

    let paths = call(
        &state,
        &mut rx,
        "findPaths",
        json!({"startNodeId": "Navigation.Responsive", "endNodeId": "Shop.ACT_Load"}),
    )
    .await;
    assert_eq!(paths.as_array().unwrap().len(), 1);
    assert_eq!(
        ids(&paths[0]),
        vec!["Navigation.Responsive", "Shop.Home", "Shop.ACT_Load"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn security_layer_links_roles_to_documents() {
    let (state, mut rx) = app(shop_model(), true);

    let graph = call(&state, &mut rx, "getTraceabilityGraph", Value::Null).await;
    let edges = graph["edges"].as_array().unwrap();
    assert!(edges.contains(&json!({"source": "Customer", "target": "Shop.Buyer", "type": "CONTAINS"})));
    assert!(edges.contains(&json!({"source": "Shop.Buyer", "target": "Shop.Home", "type": "CAN_OPEN"})));
    assert!(edges.contains(&json!({"source": "Shop.Buyer", "target": "Shop.ACT_Load", "type": "CAN_EXECUTE"})));

    let upstream = call(
        &state,
        &mut rx,
        "findCommonUpstream",
        json!({"nodeIds": ["Shop.ACT_Load"]}),
    )
    .await;
    let mut found = ids(&upstream["nodes"]);
    found.sort();
    assert_eq!(
        found,
        vec!["Customer", "Navigation.Responsive", "Shop.Buyer", "Shop.Home"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_ids_yield_empty_results() {
    let (state, mut rx) = app(shop_model(), false);

    let paths = call(
        &state,
        &mut rx,
        "findPaths",
        json!({"startNodeId": "Nope.Missing", "endNodeId": "Shop.Home"}),
    )
    .await;
    assert_eq!(paths, json!([]));

    let upstream = call(&state, &mut rx, "findCommonUpstream", json!({"nodeIds": []})).await;
    assert_eq!(upstream, json!({"nodes": [], "edges": []}));

    let subgraph = call(&state, &mut rx, "getSubgraph", json!({"nodeIds": ["Nope.Missing"]})).await;
    assert_eq!(subgraph, json!({"nodes": [], "edges": []}));
}

#[tokio::test(flavor = "multi_thread")]
async fn cycles_are_reported() {
    let model = InMemoryModel::new()
        .with_page("Loop.Start")
        .with_microflow("Loop.ACT_A")
        .with_microflow("Loop.ACT_B")
        .with_navigation("Responsive", "Loop.Start")
        .with_reference("Loop.Start", "Loop.ACT_A", EdgeKind::Calls)
        .with_reference("Loop.ACT_A", "Loop.ACT_B", EdgeKind::Calls)
        .with_reference("Loop.ACT_B", "Loop.ACT_A", EdgeKind::Calls)
        .with_reference("Loop.ACT_B", "Loop.ACT_B", EdgeKind::Calls);
    let (state, mut rx) = app(model, false);

    let cycles = call(&state, &mut rx, "findCycles", Value::Null).await;
    assert_eq!(cycles, json!([["Loop.ACT_A", "Loop.ACT_B"]]));
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn elements_and_locate() {
    let model = Arc::new(shop_model());
    let (hub, mut rx) = ChannelHub::unbounded();
    let state = AppState::new(
        Arc::clone(&model),
        Arc::new(hub),
        &ServerConfig::default(),
        Handle::current(),
    );

    let elements = call(&state, &mut rx, "getAllElements", Value::Null).await;
    assert_eq!(ids(&elements), vec!["Shop.ACT_Load", "Shop.Home"]);

    let located = call(
        &state,
        &mut rx,
        "locateElement",
        json!({"qualifiedName": "Shop.ACT_Load", "elementType": "MICROFLOW"}),
    )
    .await;
    assert_eq!(located, json!({"success": true}));
    assert_eq!(model.located(), vec![NodeId::from("Shop.ACT_Load")]);
}

// ---------------------------------------------------------------------------
// Impact job
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn impact_job_reports_per_node_progress() {
    let (state, mut rx) = app(shop_model(), false);
    let task = state
        .dispatcher
        .dispatch(Request::job_start(
            "impact",
            "graph:impact",
            json!({"nodeIds": ["Navigation.Responsive", "Shop.Home"]}),
        ))
        .unwrap();
    task.await.unwrap();

    assert_eq!(next(&mut rx).await.type_name(), "JOB_STARTED");
    let mut progress = Vec::new();
    let result = loop {
        match next(&mut rx).await {
            Envelope::JobProgress { progress: p, .. } => progress.push(p),
            Envelope::JobSuccess { data, .. } => break data,
            other => panic!("unexpected {other:?}"),
        }
    };

    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].percent, 50.0);
    assert_eq!(progress[1].percent, 100.0);
    assert_eq!(progress[0].metadata.as_ref().unwrap()["nodeId"], "Navigation.Responsive");

    assert_eq!(
        result["impacts"][0]["affected"],
        json!(["Shop.ACT_Load", "Shop.Home"])
    );
    assert_eq!(result["impacts"][1]["affected"], json!(["Shop.ACT_Load"]));
    assert_eq!(ids(&result["common"]["nodes"]), vec!["Shop.ACT_Load"]);
}
