use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;

use compositor::config::{CompositorConfig, load_config};
use compositor::context::Context;
use compositor::evaluator::Evaluator;
use compositor::gpu::HeadlessBackend;
use compositor::graph::NodeGraph;
use compositor::schedule::Schedule;
use compositor::texture_pool::TexturePool;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err("Usage: compositor <graph.json> [config.toml]".into());
    }

    let json_str = fs::read_to_string(&args[1])?;
    let graph = NodeGraph::load(&json_str)?;
    let config = match args.get(2) {
        Some(path) => load_config(Path::new(path))?,
        None => CompositorConfig::default(),
    };

    let backend = HeadlessBackend::new();
    let dispatch_log = backend.dispatch_log();
    let context = Context::new(&graph, TexturePool::new(Box::new(backend)), config);

    let schedule = Schedule::compute(&graph)?;
    let summary = Evaluator::default().evaluate(&context, &schedule)?;

    println!(
        "Evaluated {} nodes ({} unlinked inputs)",
        summary.node_operation_count, summary.single_value_operation_count
    );
    let mut outputs: Vec<_> = summary.outputs.iter().collect();
    outputs.sort_by(|a, b| a.0.cmp(b.0));
    for (name, image) in outputs {
        if image.is_single_value {
            println!("{}: single value {:?}", name, image.pixels);
        } else {
            println!("{}: {}x{} image", name, image.size[0], image.size[1]);
        }
    }
    println!("Dispatches: {}", dispatch_log.borrow().len());

    let pool = context.into_texture_pool();
    println!(
        "Texture pool: {} allocated, {} in use",
        pool.allocated_count(),
        pool.in_use_count()
    );
    Ok(())
}
