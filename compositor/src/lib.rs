pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod gpu;
pub mod graph;
pub mod input_descriptor;
pub mod node_operation;
pub mod operation;
pub mod operations;
pub mod registry;
pub mod result;
pub mod schedule;
pub mod texture_pool;
pub mod unsupported_node_operation;
pub mod util;
pub mod utilities;

pub use error::CompositorError;
pub use evaluator::{EvaluationSummary, Evaluator};
pub use operation::Operation;
pub use result::OperationResult;
