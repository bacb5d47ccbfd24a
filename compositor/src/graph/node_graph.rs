//! The read-only node graph queried during evaluation.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::link::Link;
use super::node::{Node, NodeRole};
use super::socket::{InputSocket, OutputSocket};
use crate::error::CompositorError;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NodeGraph {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    links: Vec<Link>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a graph from JSON and check that its links are well formed.
    pub fn load(json_str: &str) -> Result<Self, CompositorError> {
        let graph: NodeGraph = serde_json::from_str(json_str)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn save(&self) -> Result<String, CompositorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn add_node(&mut self, node: Node) -> Uuid {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn get_node(&self, id: Uuid) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Like `get_node`, but a missing node is a malformed graph.
    pub fn node(&self, id: Uuid) -> Result<&Node, CompositorError> {
        self.get_node(id)
            .ok_or_else(|| CompositorError::malformed(format!("Node {} not found", id)))
    }

    pub fn find_node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Link an output to an input after validating the link.
    pub fn add_link(&mut self, from: OutputSocket, to: InputSocket) -> Result<(), CompositorError> {
        let link = Link::new(from, to);
        self.validate_link(&link)?;
        self.links.push(link);
        Ok(())
    }

    /// Convenience for linking by node id and socket identifier.
    pub fn connect(
        &mut self,
        from_node: Uuid,
        from_identifier: &str,
        to_node: Uuid,
        to_identifier: &str,
    ) -> Result<(), CompositorError> {
        self.add_link(
            OutputSocket::new(from_node, from_identifier),
            InputSocket::new(to_node, to_identifier),
        )
    }

    /// The link feeding the given input, if any.
    pub fn link_to_input(&self, input: &InputSocket) -> Option<&Link> {
        self.links.iter().find(|l| &l.to == input)
    }

    /// All links leaving the given output (fan-out).
    pub fn links_from_output<'a>(
        &'a self,
        output: &'a OutputSocket,
    ) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| &l.from == output)
    }

    /// If `output` belongs to a forwarding node, the input whose value it
    /// carries. Returns `None` for outputs of evaluated nodes.
    pub fn forwarded_input(
        &self,
        output: &OutputSocket,
    ) -> Result<Option<InputSocket>, CompositorError> {
        let node = self.node(output.node_id)?;
        match &node.role {
            NodeRole::Regular | NodeRole::Group => Ok(None),
            NodeRole::Reroute => {
                let input = node.inputs.first().ok_or_else(|| {
                    CompositorError::malformed(format!("Reroute node '{}' has no input", node.name))
                })?;
                Ok(Some(InputSocket::new(node.id, &input.identifier)))
            }
            NodeRole::GroupInput { group_node_id } => {
                let group = self.node(*group_node_id)?;
                if group.input(&output.identifier).is_none() {
                    return Err(CompositorError::malformed(format!(
                        "Group '{}' has no input '{}' for its group input node '{}'",
                        group.name, output.identifier, node.name
                    )));
                }
                Ok(Some(InputSocket::new(group.id, &output.identifier)))
            }
        }
    }

    /// If `input` belongs to a forwarding node, the outputs its value is
    /// forwarded to. Returns `None` for inputs of evaluated nodes.
    pub fn forwarded_outputs(
        &self,
        input: &InputSocket,
    ) -> Result<Option<Vec<OutputSocket>>, CompositorError> {
        let node = self.node(input.node_id)?;
        match &node.role {
            NodeRole::Regular | NodeRole::GroupInput { .. } => Ok(None),
            NodeRole::Reroute => Ok(Some(node.output_sockets().collect())),
            NodeRole::Group => {
                let outputs = self
                    .nodes
                    .iter()
                    .filter(|n| n.role == NodeRole::GroupInput { group_node_id: node.id })
                    .filter(|n| n.output(&input.identifier).is_some())
                    .map(|n| OutputSocket::new(n.id, &input.identifier))
                    .collect();
                Ok(Some(outputs))
            }
        }
    }

    /// Check every link of a graph that was not built through `add_link`.
    pub fn validate(&self) -> Result<(), CompositorError> {
        let mut linked_inputs = HashSet::new();
        for link in &self.links {
            self.validate_sockets(link)?;
            if !linked_inputs.insert(&link.to) {
                return Err(CompositorError::malformed(format!(
                    "Input {} has more than one incoming link",
                    link.to
                )));
            }
        }
        Ok(())
    }

    /// Validate a link before adding it.
    ///
    /// Checks:
    /// - Both sockets exist
    /// - No self-links
    /// - The input is not linked already
    /// - No cycles
    fn validate_link(&self, link: &Link) -> Result<(), CompositorError> {
        self.validate_sockets(link)?;

        if link.from.node_id == link.to.node_id {
            return Err(CompositorError::malformed(
                "Cannot link a node to itself".to_string(),
            ));
        }

        if self.link_to_input(&link.to).is_some() {
            return Err(CompositorError::malformed(format!(
                "Input {} already has a link",
                link.to
            )));
        }

        if self.would_create_cycle(link.from.node_id, link.to.node_id) {
            return Err(CompositorError::malformed(format!(
                "Link {} -> {} would create a cycle",
                link.from, link.to
            )));
        }

        Ok(())
    }

    fn validate_sockets(&self, link: &Link) -> Result<(), CompositorError> {
        let from = self.node(link.from.node_id)?;
        if from.output(&link.from.identifier).is_none() {
            return Err(CompositorError::malformed(format!(
                "Node '{}' has no output '{}'",
                from.name, link.from.identifier
            )));
        }
        let to = self.node(link.to.node_id)?;
        if to.input(&link.to.identifier).is_none() {
            return Err(CompositorError::malformed(format!(
                "Node '{}' has no input '{}'",
                to.name, link.to.identifier
            )));
        }
        Ok(())
    }

    /// True if `to_node` can already reach `from_node`, counting forwarding
    /// from a group node into its group input nodes as an edge.
    fn would_create_cycle(&self, from_node: Uuid, to_node: Uuid) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(to_node);

        while let Some(current) = queue.pop_front() {
            if current == from_node {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            for link in &self.links {
                if link.from.node_id == current {
                    queue.push_back(link.to.node_id);
                }
            }
            for node in &self.nodes {
                if node.role == (NodeRole::GroupInput { group_node_id: current }) {
                    queue.push_back(node.id);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::socket::{SocketDefinition, SocketType};

    fn passthrough(name: &str) -> Node {
        Node::new(name, "test.passthrough")
            .with_inputs(vec![SocketDefinition::new("In", "In", SocketType::Color)])
            .with_outputs(vec![SocketDefinition::new("Out", "Out", SocketType::Color)])
    }

    #[test]
    fn test_input_accepts_a_single_link() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(passthrough("a"));
        let b = graph.add_node(passthrough("b"));
        let c = graph.add_node(passthrough("c"));

        graph.connect(a, "Out", c, "In").unwrap();
        let result = graph.connect(b, "Out", c, "In");
        assert!(matches!(result, Err(CompositorError::MalformedGraph(_))));
    }

    #[test]
    fn test_self_link_is_rejected() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(passthrough("a"));
        let result = graph.connect(a, "Out", a, "In");
        assert!(result.unwrap_err().to_string().contains("itself"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(passthrough("a"));
        let b = graph.add_node(passthrough("b"));
        graph.connect(a, "Out", b, "In").unwrap();
        assert!(graph.connect(b, "Out", a, "In").is_err());
    }

    #[test]
    fn test_unknown_socket_is_rejected() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(passthrough("a"));
        let b = graph.add_node(passthrough("b"));
        assert!(graph.connect(a, "Missing", b, "In").is_err());
        assert!(graph.connect(a, "Out", b, "Missing").is_err());
    }

    #[test]
    fn test_output_fans_out() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(passthrough("a"));
        let b = graph.add_node(passthrough("b"));
        let c = graph.add_node(passthrough("c"));
        graph.connect(a, "Out", b, "In").unwrap();
        graph.connect(a, "Out", c, "In").unwrap();

        let output = OutputSocket::new(a, "Out");
        assert_eq!(graph.links_from_output(&output).count(), 2);
    }

    #[test]
    fn test_group_input_forwards_to_group_socket() {
        let mut graph = NodeGraph::new();
        let group = graph.add_node(Node::group(
            "group",
            vec![SocketDefinition::new("Color", "Color", SocketType::Color)],
        ));
        let group_input = graph.add_node(Node::group_input(
            "group input",
            group,
            vec![SocketDefinition::new("Color", "Color", SocketType::Color)],
        ));

        let forwarded = graph
            .forwarded_input(&OutputSocket::new(group_input, "Color"))
            .unwrap();
        assert_eq!(forwarded, Some(InputSocket::new(group, "Color")));

        let targets = graph
            .forwarded_outputs(&InputSocket::new(group, "Color"))
            .unwrap();
        assert_eq!(targets, Some(vec![OutputSocket::new(group_input, "Color")]));
    }

    #[test]
    fn test_duplicate_links_in_loaded_graph_are_rejected() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(passthrough("a"));
        let b = graph.add_node(passthrough("b"));
        graph.connect(a, "Out", b, "In").unwrap();

        let mut json: serde_json::Value = serde_json::from_str(&graph.save().unwrap()).unwrap();
        let link = json["links"][0].clone();
        json["links"].as_array_mut().unwrap().push(link);

        let result = NodeGraph::load(&json.to_string());
        assert!(matches!(result, Err(CompositorError::MalformedGraph(_))));
    }
}
