use std::path::PathBuf;

use compositor::config::load_config;
use compositor::context::Context;
use compositor::error::CompositorError;
use compositor::evaluator::Evaluator;
use compositor::gpu::HeadlessBackend;
use compositor::graph::NodeGraph;
use compositor::schedule::Schedule;
use compositor::texture_pool::TexturePool;

use serde_json::json;

fn test_data_dir() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap().join("test_data")
}

fn load_graph(file_name: &str) -> NodeGraph {
    let json_str = std::fs::read_to_string(test_data_dir().join(file_name)).unwrap();
    NodeGraph::load(&json_str).expect("Failed to load graph")
}

#[test]
fn test_graph_file_evaluates_with_config_file() {
    let graph = load_graph("invert.json");
    let config = load_config(&test_data_dir().join("compositor.toml")).unwrap();
    assert_eq!(config.local_size, [8, 8]);
    assert!(!config.half_precision);

    let backend = HeadlessBackend::new();
    let log = backend.dispatch_log();
    let context = Context::new(&graph, TexturePool::new(Box::new(backend)), config);
    let schedule = Schedule::compute(&graph).unwrap();

    // The reroute forwards and the blur feeds nothing that is output.
    let scheduled: Vec<_> = schedule
        .iter()
        .map(|id| graph.get_node(id).unwrap().name.as_str())
        .collect();
    assert_eq!(scheduled, vec!["RGB", "Invert", "Composite"]);

    let summary = Evaluator::default().evaluate(&context, &schedule).unwrap();
    assert_eq!(summary.outputs.len(), 1);
    assert_eq!(summary.outputs["Composite"].size, [1, 1]);

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0].bindings.uniforms,
        vec![
            ("Fac".to_string(), [0.5, 0.0, 0.0, 0.0]),
            ("Color".to_string(), [0.8, 0.2, 0.1, 1.0]),
        ]
    );
}

#[test]
fn test_graph_survives_save_and_load() {
    let graph = load_graph("invert.json");
    let saved = graph.save().unwrap();
    let loaded = NodeGraph::load(&saved).unwrap();
    assert_eq!(graph, loaded);
    assert_eq!(loaded.nodes().len(), 5);
    assert_eq!(loaded.links().len(), 4);
}

#[test]
fn test_link_to_missing_socket_is_rejected_on_load() {
    let graph = json!({
        "nodes": [
            {
                "id": "4c1e2b9a-0d3f-4f7e-8a6b-1e2d3c4b5a01",
                "name": "Value",
                "type_id": "input.value",
                "outputs": [{ "identifier": "Value", "name": "Value", "socket_type": "float" }]
            },
            {
                "id": "4c1e2b9a-0d3f-4f7e-8a6b-1e2d3c4b5a02",
                "name": "Composite",
                "type_id": "output.composite",
                "inputs": [{ "identifier": "Image", "name": "Image", "socket_type": "color" }]
            }
        ],
        "links": [
            {
                "from": { "node_id": "4c1e2b9a-0d3f-4f7e-8a6b-1e2d3c4b5a01", "identifier": "Val" },
                "to": { "node_id": "4c1e2b9a-0d3f-4f7e-8a6b-1e2d3c4b5a02", "identifier": "Image" }
            }
        ]
    });

    let result = NodeGraph::load(&graph.to_string());
    assert!(matches!(result, Err(CompositorError::MalformedGraph(_))));
}

#[test]
fn test_invalid_json_is_a_json_error() {
    assert!(matches!(
        NodeGraph::load("{ \"nodes\": [ }"),
        Err(CompositorError::Json(_))
    ));
}
