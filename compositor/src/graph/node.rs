//! Graph node instances.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::socket::{InputSocket, OutputSocket, SocketDefinition, SocketType, SocketValue};

/// How a node takes part in evaluation.
///
/// Group, group input and reroute nodes only forward values between sockets;
/// they are resolved away by socket resolution and never get an operation.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeRole {
    #[default]
    Regular,
    /// A node group instance. Each input forwards to the outputs with the same
    /// identifier on the group input nodes of this group.
    Group,
    /// Exposes the inputs of `group_node_id` inside the group.
    GroupInput { group_node_id: Uuid },
    /// Forwards its single input to all of its outputs.
    Reroute,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Node {
    pub id: Uuid,
    /// Unique, user-visible name. Input and output images are keyed by it.
    pub name: String,
    /// Node type identifier, e.g. "color.invert".
    pub type_id: String,
    #[serde(default)]
    pub role: NodeRole,
    #[serde(default)]
    pub inputs: Vec<SocketDefinition>,
    #[serde(default)]
    pub outputs: Vec<SocketDefinition>,
    /// Shader the node is evaluated with on the GPU, if it has one.
    #[serde(default)]
    pub shader: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, SocketValue>,
}

impl Node {
    pub fn new(name: &str, type_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            type_id: type_id.to_string(),
            role: NodeRole::Regular,
            inputs: Vec::new(),
            outputs: Vec::new(),
            shader: None,
            properties: HashMap::new(),
        }
    }

    pub fn group(name: &str, inputs: Vec<SocketDefinition>) -> Self {
        let mut node = Self::new(name, "group");
        node.role = NodeRole::Group;
        node.inputs = inputs;
        node
    }

    pub fn group_input(name: &str, group_node_id: Uuid, outputs: Vec<SocketDefinition>) -> Self {
        let mut node = Self::new(name, "group.input");
        node.role = NodeRole::GroupInput { group_node_id };
        node.outputs = outputs;
        node
    }

    pub fn reroute(name: &str, socket_type: SocketType) -> Self {
        let mut node = Self::new(name, "layout.reroute");
        node.role = NodeRole::Reroute;
        node.inputs = vec![SocketDefinition::new("Input", "Input", socket_type)];
        node.outputs = vec![SocketDefinition::new("Output", "Output", socket_type)];
        node
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

    pub fn with_property(mut self, name: &str, value: SocketValue) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    pub fn input(&self, identifier: &str) -> Option<&SocketDefinition> {
        self.inputs.iter().find(|s| s.identifier == identifier)
    }

    pub fn output(&self, identifier: &str) -> Option<&SocketDefinition> {
        self.outputs.iter().find(|s| s.identifier == identifier)
    }

    pub fn input_sockets(&self) -> impl Iterator<Item = InputSocket> + '_ {
        self.inputs
            .iter()
            .map(|s| InputSocket::new(self.id, &s.identifier))
    }

    pub fn output_sockets(&self) -> impl Iterator<Item = OutputSocket> + '_ {
        self.outputs
            .iter()
            .map(|s| OutputSocket::new(self.id, &s.identifier))
    }

    pub fn property(&self, name: &str) -> Option<&SocketValue> {
        self.properties.get(name)
    }

    /// True for nodes that only forward values and are never evaluated.
    pub fn is_forwarding(&self) -> bool {
        !matches!(self.role, NodeRole::Regular)
    }

    /// Output nodes are the roots a schedule is computed from.
    pub fn is_output(&self) -> bool {
        self.role == NodeRole::Regular && self.type_id.starts_with("output.")
    }
}
