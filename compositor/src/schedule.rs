//! The ordered set of nodes an evaluation runs.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::debug;
use uuid::Uuid;

use crate::error::CompositorError;
use crate::graph::NodeGraph;
use crate::utilities::get_input_origin_socket;

/// Nodes to evaluate, in an order where every node comes after the nodes it
/// reads from. Forwarding nodes never appear in a schedule.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schedule {
    order: Vec<Uuid>,
    members: HashSet<Uuid>,
}

impl Schedule {
    /// Use an order computed elsewhere. The caller guarantees it is
    /// topological.
    pub fn from_order(order: Vec<Uuid>) -> Self {
        let members = order.iter().copied().collect();
        Self { order, members }
    }

    /// Schedule every node the output nodes of `graph` depend on.
    ///
    /// Nodes not reachable from an output are left out. Ties are broken by
    /// the position of the nodes in the graph, so the same graph always
    /// yields the same schedule.
    pub fn compute(graph: &NodeGraph) -> Result<Self, CompositorError> {
        let position: HashMap<Uuid, usize> = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index))
            .collect();

        // Walk upstream from the outputs, recording producer -> consumer edges.
        let mut members = HashSet::new();
        let mut dependents: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let mut in_degree: HashMap<Uuid, usize> = HashMap::new();
        let mut stack: Vec<Uuid> = graph
            .nodes()
            .iter()
            .filter(|node| node.is_output())
            .map(|node| node.id)
            .collect();

        while let Some(node_id) = stack.pop() {
            if !members.insert(node_id) {
                continue;
            }
            in_degree.entry(node_id).or_insert(0);
            let node = graph.node(node_id)?;
            let mut producers = HashSet::new();
            for input in node.input_sockets() {
                let origin = get_input_origin_socket(graph, &input)?;
                if let Some(output) = origin.as_output() {
                    producers.insert(output.node_id);
                }
            }
            for producer in producers {
                if producer == node_id {
                    return Err(CompositorError::malformed(format!(
                        "Node '{}' reads its own output",
                        node.name
                    )));
                }
                dependents.entry(producer).or_default().push(node_id);
                *in_degree.entry(node_id).or_insert(0) += 1;
                stack.push(producer);
            }
        }

        // Kahn's algorithm, always taking the ready node earliest in the graph.
        let mut ready: BTreeSet<(usize, Uuid)> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| (position[id], *id))
            .collect();
        let mut order = Vec::with_capacity(members.len());

        while let Some((_, node_id)) = ready.pop_first() {
            order.push(node_id);
            for dependent in dependents.get(&node_id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert((position[dependent], *dependent));
                    }
                }
            }
        }

        if order.len() != members.len() {
            return Err(CompositorError::malformed(
                "Cycle detected among scheduled nodes".to_string(),
            ));
        }

        debug!("Scheduled {} of {} nodes", order.len(), graph.nodes().len());
        Ok(Self { order, members })
    }

    pub fn contains(&self, node_id: Uuid) -> bool {
        self.members.contains(&node_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeTypeLibrary, SocketType};

    #[test]
    fn test_schedule_orders_producers_first_and_skips_dead_nodes() {
        let library = NodeTypeLibrary::with_builtin_types();
        let mut graph = NodeGraph::new();
        let composite =
            graph.add_node(library.create_node("output.composite", "Composite").unwrap());
        let invert = graph.add_node(library.create_node("color.invert", "Invert").unwrap());
        let rgb = graph.add_node(library.create_node("input.rgb", "RGB").unwrap());
        let unused = graph.add_node(library.create_node("color.invert", "Unused").unwrap());
        graph.connect(rgb, "Color", invert, "Color").unwrap();
        graph.connect(invert, "Color", composite, "Image").unwrap();

        let schedule = Schedule::compute(&graph).unwrap();
        assert_eq!(schedule.iter().collect::<Vec<_>>(), vec![rgb, invert, composite]);
        assert!(!schedule.contains(unused));
    }

    #[test]
    fn test_forwarding_nodes_are_not_scheduled() {
        let library = NodeTypeLibrary::with_builtin_types();
        let mut graph = NodeGraph::new();
        let rgb = graph.add_node(library.create_node("input.rgb", "RGB").unwrap());
        let reroute = graph.add_node(Node::reroute("Reroute", SocketType::Color));
        let viewer = graph.add_node(library.create_node("output.viewer", "Viewer").unwrap());
        graph.connect(rgb, "Color", reroute, "Input").unwrap();
        graph.connect(reroute, "Output", viewer, "Image").unwrap();

        let schedule = Schedule::compute(&graph).unwrap();
        assert_eq!(schedule.len(), 2);
        assert!(!schedule.contains(reroute));
        assert_eq!(schedule.iter().collect::<Vec<_>>(), vec![rgb, viewer]);
    }

    #[test]
    fn test_graph_without_outputs_has_empty_schedule() {
        let library = NodeTypeLibrary::with_builtin_types();
        let mut graph = NodeGraph::new();
        graph.add_node(library.create_node("input.value", "Value").unwrap());
        assert!(Schedule::compute(&graph).unwrap().is_empty());
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let library = NodeTypeLibrary::with_builtin_types();
        let mut graph = NodeGraph::new();
        let mix = graph.add_node(library.create_node("color.mix", "Mix").unwrap());
        let a = graph.add_node(library.create_node("input.rgb", "A").unwrap());
        let b = graph.add_node(library.create_node("input.rgb", "B").unwrap());
        let composite =
            graph.add_node(library.create_node("output.composite", "Composite").unwrap());
        graph.connect(b, "Color", mix, "Image_001").unwrap();
        graph.connect(a, "Color", mix, "Image").unwrap();
        graph.connect(mix, "Image", composite, "Image").unwrap();

        let first = Schedule::compute(&graph).unwrap();
        for _ in 0..10 {
            assert_eq!(Schedule::compute(&graph).unwrap(), first);
        }
        assert_eq!(first.iter().collect::<Vec<_>>(), vec![a, b, mix, composite]);
    }
}
