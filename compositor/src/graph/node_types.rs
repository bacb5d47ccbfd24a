//! Node type definitions and the built-in node library.

use std::collections::HashMap;

use super::node::Node;
use super::socket::{SocketDefinition, SocketType, SocketValue};
use crate::error::CompositorError;

/// Definition of a node type. Nodes are instantiated from it with fresh ids.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTypeDefinition {
    /// Unique type identifier (e.g. "color.invert", "output.composite")
    pub type_id: String,
    pub inputs: Vec<SocketDefinition>,
    pub outputs: Vec<SocketDefinition>,
    /// Shader used to evaluate the node as a GPU material node.
    pub shader: Option<String>,
}

impl NodeTypeDefinition {
    pub fn new(type_id: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            shader: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<SocketDefinition>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<SocketDefinition>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_shader(mut self, shader: &str) -> Self {
        self.shader = Some(shader.to_string());
        self
    }

    /// Create a node of this type.
    pub fn instantiate(&self, name: &str) -> Node {
        let mut node = Node::new(name, &self.type_id)
            .with_inputs(self.inputs.clone())
            .with_outputs(self.outputs.clone());
        node.shader = self.shader.clone();
        node
    }
}

/// Node types known to the editor, keyed by type id.
#[derive(Debug, Clone, Default)]
pub struct NodeTypeLibrary {
    types: HashMap<String, NodeTypeDefinition>,
}

impl NodeTypeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_types() -> Self {
        let mut library = Self::new();
        for definition in builtin_node_types() {
            library.register(definition);
        }
        library
    }

    pub fn register(&mut self, definition: NodeTypeDefinition) {
        self.types.insert(definition.type_id.clone(), definition);
    }

    pub fn get(&self, type_id: &str) -> Option<&NodeTypeDefinition> {
        self.types.get(type_id)
    }

    pub fn create_node(&self, type_id: &str, name: &str) -> Result<Node, CompositorError> {
        self.get(type_id)
            .map(|definition| definition.instantiate(name))
            .ok_or_else(|| CompositorError::malformed(format!("Unknown node type: {}", type_id)))
    }
}

fn inp(identifier: &str, name: &str, socket_type: SocketType) -> SocketDefinition {
    SocketDefinition::new(identifier, name, socket_type)
}

fn out(identifier: &str, name: &str, socket_type: SocketType) -> SocketDefinition {
    SocketDefinition::new(identifier, name, socket_type)
}

fn node(type_id: &str) -> NodeTypeDefinition {
    NodeTypeDefinition::new(type_id)
}

fn builtin_node_types() -> Vec<NodeTypeDefinition> {
    use SocketType::*;

    vec![
        // ==================== Input ====================
        // Constant float taken from the `value` property.
        node("input.value").with_outputs(vec![out("Value", "Value", Float)]),
        // Constant color taken from the `color` property.
        node("input.rgb").with_outputs(vec![out("Color", "Color", Color)]),
        // Image supplied to the evaluation under the node's name.
        node("input.image").with_outputs(vec![
            out("Image", "Image", Color),
            out("Alpha", "Alpha", Float),
        ]),
        // ==================== Output ====================
        // Final image of the compositor.
        node("output.composite").with_inputs(vec![
            inp("Image", "Image", Color).with_default(SocketValue::color([0.0, 0.0, 0.0, 1.0])),
        ]),
        // Preview of an intermediate result.
        node("output.viewer").with_inputs(vec![
            inp("Image", "Image", Color).with_default(SocketValue::color([0.0, 0.0, 0.0, 1.0])),
        ]),
        // ==================== Color ====================
        node("color.invert")
            .with_shader("compositor_invert")
            .with_inputs(vec![
                inp("Fac", "Fac", Float)
                    .with_default(SocketValue::float(1.0))
                    .single_value()
                    .with_domain_priority(1),
                inp("Color", "Color", Color).with_default(SocketValue::color([1.0; 4])),
            ])
            .with_outputs(vec![out("Color", "Color", Color)]),
        node("color.brightness_contrast")
            .with_shader("compositor_bright_contrast")
            .with_inputs(vec![
                inp("Image", "Image", Color).with_default(SocketValue::color([1.0; 4])),
                inp("Bright", "Brightness", Float)
                    .with_default(SocketValue::float(0.0))
                    .single_value(),
                inp("Contrast", "Contrast", Float)
                    .with_default(SocketValue::float(0.0))
                    .single_value(),
            ])
            .with_outputs(vec![out("Image", "Image", Color)]),
        node("color.mix")
            .with_shader("compositor_mix_blend")
            .with_inputs(vec![
                inp("Fac", "Fac", Float)
                    .with_default(SocketValue::float(1.0))
                    .with_domain_priority(2),
                inp("Image", "Image", Color).with_default(SocketValue::color([1.0; 4])),
                inp("Image_001", "Image", Color)
                    .with_default(SocketValue::color([1.0; 4]))
                    .with_domain_priority(1),
            ])
            .with_outputs(vec![out("Image", "Image", Color)]),
        // ==================== Converter ====================
        node("converter.separate_rgba")
            .with_shader("compositor_separate_rgba")
            .with_inputs(vec![
                inp("Image", "Image", Color).with_default(SocketValue::color([1.0; 4])),
            ])
            .with_outputs(vec![
                out("R", "R", Float),
                out("G", "G", Float),
                out("B", "B", Float),
                out("A", "A", Float),
            ]),
        node("converter.normalize")
            .with_shader("compositor_normalize")
            .with_inputs(vec![inp("Value", "Value", Float).with_default(SocketValue::float(1.0))])
            .with_outputs(vec![out("Value", "Value", Float)]),
        // ==================== Filter ====================
        // No shader yet; evaluated by the unsupported stub.
        node("filter.blur")
            .with_inputs(vec![
                inp("Image", "Image", Color).with_default(SocketValue::color([1.0; 4])),
                inp("Size", "Size", Float)
                    .with_default(SocketValue::float(1.0))
                    .single_value(),
            ])
            .with_outputs(vec![out("Image", "Image", Color)]),
        node("filter.defocus")
            .with_inputs(vec![
                inp("Image", "Image", Color).with_default(SocketValue::color([1.0; 4])),
                inp("Z", "Z", Float).with_default(SocketValue::float(1.0)),
            ])
            .with_outputs(vec![out("Image", "Image", Color)]),
        // ==================== Shader ====================
        node("shader.emission")
            .with_inputs(vec![inp("Color", "Color", Color)])
            .with_outputs(vec![out("Emission", "Emission", Shader)]),
    ]
}
