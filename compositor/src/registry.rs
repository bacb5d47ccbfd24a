//! Maps node types to the operations that evaluate them.

use std::collections::HashMap;

use uuid::Uuid;

use crate::context::Context;
use crate::error::CompositorError;
use crate::graph::Node;
use crate::operation::Operation;
use crate::operations::{
    CompositeOperation, ImageInputOperation, RgbOperation, ShaderNodeOperation, ValueOperation,
};
use crate::unsupported_node_operation::UnsupportedNodeOperation;
use crate::utilities::is_gpu_material_node;

pub type OperationConstructor = for<'a> fn(
    &'a Context<'a>,
    Uuid,
) -> Result<Box<dyn Operation<'a> + 'a>, CompositorError>;

pub struct OperationRegistry {
    constructors: HashMap<String, OperationConstructor>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Create a registry with all built-in operations registered.
    pub fn with_builtin_operations() -> Self {
        let mut registry = Self::new();
        registry.register("input.value", |context, node| ValueOperation::boxed(context, node));
        registry.register("input.rgb", |context, node| RgbOperation::boxed(context, node));
        registry.register("input.image", |context, node| {
            ImageInputOperation::boxed(context, node)
        });
        registry.register("output.composite", |context, node| {
            CompositeOperation::boxed(context, node)
        });
        registry.register("output.viewer", |context, node| {
            CompositeOperation::boxed(context, node)
        });
        registry
    }

    /// Register the operation for a node type, replacing any previous one.
    pub fn register(&mut self, type_id: &str, constructor: OperationConstructor) {
        self.constructors.insert(type_id.to_string(), constructor);
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.constructors.contains_key(type_id)
    }

    /// Build the operation for `node`.
    ///
    /// Registered types use their constructor. Other nodes with a shader are
    /// evaluated by dispatching it, and the rest get an
    /// [`UnsupportedNodeOperation`].
    pub fn create_operation<'a>(
        &self,
        context: &'a Context<'a>,
        node: &Node,
    ) -> Result<Box<dyn Operation<'a> + 'a>, CompositorError> {
        if let Some(constructor) = self.constructors.get(&node.type_id) {
            return constructor(context, node.id);
        }
        if is_gpu_material_node(node) {
            return ShaderNodeOperation::boxed(context, node.id);
        }
        UnsupportedNodeOperation::boxed(context, node.id)
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::with_builtin_operations()
    }
}
