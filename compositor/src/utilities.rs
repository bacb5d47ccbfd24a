//! Socket resolution and dispatch helpers shared by operations and the evaluator.

use std::collections::HashSet;

use crate::error::CompositorError;
use crate::gpu::{GpuBackend, ShaderBindings, ShaderHandle};
use crate::graph::{
    InputSocket, Node, NodeGraph, OutputSocket, Socket, SocketDefinition, SocketType,
};
use crate::input_descriptor::InputDescriptor;
use crate::result::ResultType;

/// Local work-group size assumed for compositor shaders. 16x16 suits image
/// processing kernels that do not use shared memory.
pub const DEFAULT_LOCAL_SIZE: [u32; 2] = [16, 16];

/// Get the origin socket of the given input.
///
/// An unlinked input is its own origin. A linked input resolves to the output
/// linked to it, walking through reroute and group input nodes. When such a
/// forwarding chain ends at an unlinked input, that input is the origin.
pub fn get_input_origin_socket(
    graph: &NodeGraph,
    input: &InputSocket,
) -> Result<Socket, CompositorError> {
    let mut current = input.clone();
    let mut visited = HashSet::new();
    loop {
        if !visited.insert(current.clone()) {
            return Err(CompositorError::malformed(format!(
                "Forwarding cycle through input {}",
                current
            )));
        }
        let Some(link) = graph.link_to_input(&current) else {
            return Ok(Socket::Input(current));
        };
        match graph.forwarded_input(&link.from)? {
            Some(forwarded) => current = forwarded,
            None => return Ok(Socket::Output(link.from.clone())),
        }
    }
}

/// Get the output linked to the given input, or `None` if the input is not
/// ultimately fed by an output.
pub fn get_output_linked_to_input(
    graph: &NodeGraph,
    input: &InputSocket,
) -> Result<Option<OutputSocket>, CompositorError> {
    let origin = get_input_origin_socket(graph, input)?;
    Ok(origin.as_output().cloned())
}

/// Get the result type that corresponds to the type of the given socket.
pub fn get_node_socket_result_type(socket_type: SocketType) -> Result<ResultType, CompositorError> {
    match socket_type {
        SocketType::Float => Ok(ResultType::Float),
        SocketType::Vector => Ok(ResultType::Vector),
        SocketType::Color => Ok(ResultType::Color),
        SocketType::Shader => Err(CompositorError::UnsupportedSocketType(format!(
            "{} sockets have no compositor result",
            socket_type
        ))),
    }
}

/// The inputs that read the given output, after walking through forwarding
/// nodes. Forwarding inputs themselves are never returned.
pub fn get_output_target_inputs(
    graph: &NodeGraph,
    output: &OutputSocket,
) -> Result<Vec<InputSocket>, CompositorError> {
    let mut targets = Vec::new();
    let mut pending = vec![output.clone()];
    let mut visited = HashSet::new();

    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            return Err(CompositorError::malformed(format!(
                "Forwarding cycle through output {}",
                current
            )));
        }
        for link in graph.links_from_output(&current) {
            match graph.forwarded_outputs(&link.to)? {
                Some(forwarded) => pending.extend(forwarded),
                None => targets.push(link.to.clone()),
            }
        }
    }
    Ok(targets)
}

/// Returns true if any node reading the given output satisfies `condition`.
pub fn is_output_linked_to_node_conditioned(
    graph: &NodeGraph,
    output: &OutputSocket,
    mut condition: impl FnMut(&Node) -> bool,
) -> Result<bool, CompositorError> {
    for input in get_output_target_inputs(graph, output)? {
        if condition(graph.node(input.node_id)?) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Returns the number of inputs reading the given output that satisfy `condition`.
pub fn number_of_inputs_linked_to_output_conditioned(
    graph: &NodeGraph,
    output: &OutputSocket,
    mut condition: impl FnMut(&InputSocket) -> bool,
) -> Result<usize, CompositorError> {
    let targets = get_output_target_inputs(graph, output)?;
    Ok(targets.iter().filter(|input| condition(input)).count())
}

/// A node is a GPU material node if it is evaluated with a shader.
pub fn is_gpu_material_node(node: &Node) -> bool {
    node.shader.is_some()
}

/// Get the input descriptor of the given input socket.
pub fn input_descriptor_from_input_socket(
    socket: &SocketDefinition,
) -> Result<InputDescriptor, CompositorError> {
    Ok(InputDescriptor {
        result_type: get_node_socket_result_type(socket.socket_type)?,
        default_value: socket.default_value,
        domain_priority: socket.domain_priority,
        expects_single_value: socket.expects_single_value,
        skip_realization: socket.skip_realization,
    })
}

/// Number of work groups needed to cover `global_size` invocations with
/// groups of `local_size`. The grid may overshoot, so shaders must bound
/// check against the real size.
pub fn compute_dispatch_global(global_size: [u32; 2], local_size: [u32; 2]) -> [u32; 2] {
    [
        global_size[0].div_ceil(local_size[0]),
        global_size[1].div_ceil(local_size[1]),
    ]
}

/// Dispatch `shader` over a 2D compute space covering `global_size`.
pub fn dispatch_compute(
    backend: &mut dyn GpuBackend,
    shader: &ShaderHandle,
    bindings: &ShaderBindings,
    global_size: [u32; 2],
    local_size: [u32; 2],
) -> Result<(), CompositorError> {
    let group_count = compute_dispatch_global(global_size, local_size);
    if group_count.contains(&0) {
        return Ok(());
    }
    backend.dispatch(shader, bindings, group_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SocketValue;

    fn color_node(name: &str) -> Node {
        Node::new(name, "test.color")
            .with_inputs(vec![SocketDefinition::new("In", "In", SocketType::Color)])
            .with_outputs(vec![SocketDefinition::new("Out", "Out", SocketType::Color)])
    }

    #[test]
    fn test_dispatch_grid_rounds_up() {
        assert_eq!(compute_dispatch_global([100, 100], [16, 16]), [7, 7]);
        assert_eq!(compute_dispatch_global([16, 16], [16, 16]), [1, 1]);
        assert_eq!(compute_dispatch_global([0, 0], [16, 16]), [0, 0]);
        assert_eq!(compute_dispatch_global([17, 1], [16, 16]), [2, 1]);
        assert_eq!(compute_dispatch_global([1920, 1080], DEFAULT_LOCAL_SIZE), [120, 68]);
    }

    #[test]
    fn test_unlinked_input_is_its_own_origin() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(color_node("a"));
        let input = InputSocket::new(a, "In");

        let origin = get_input_origin_socket(&graph, &input).unwrap();
        assert_eq!(origin, Socket::Input(input.clone()));
        assert_eq!(get_output_linked_to_input(&graph, &input).unwrap(), None);
    }

    #[test]
    fn test_directly_linked_input_resolves_to_output() {
        let mut graph = NodeGraph::new();
        let a = graph.add_node(color_node("a"));
        let b = graph.add_node(color_node("b"));
        graph.connect(a, "Out", b, "In").unwrap();

        let origin = get_input_origin_socket(&graph, &InputSocket::new(b, "In")).unwrap();
        assert_eq!(origin, Socket::Output(OutputSocket::new(a, "Out")));
    }

    #[test]
    fn test_unlinked_group_input_is_terminal_origin() {
        let mut graph = NodeGraph::new();
        let group = graph.add_node(Node::group(
            "group",
            vec![
                SocketDefinition::new("Color", "Color", SocketType::Color)
                    .with_default(SocketValue::color([0.5, 0.5, 0.5, 1.0])),
            ],
        ));
        let group_input = graph.add_node(Node::group_input(
            "group input",
            group,
            vec![SocketDefinition::new("Color", "Color", SocketType::Color)],
        ));
        let inner = graph.add_node(color_node("inner"));
        graph.connect(group_input, "Color", inner, "In").unwrap();

        let origin = get_input_origin_socket(&graph, &InputSocket::new(inner, "In")).unwrap();
        assert_eq!(origin, Socket::Input(InputSocket::new(group, "Color")));
    }

    #[test]
    fn test_origin_walks_through_group_and_reroute() {
        let mut graph = NodeGraph::new();
        let source = graph.add_node(color_node("source"));
        let reroute = graph.add_node(Node::reroute("reroute", SocketType::Color));
        let group = graph.add_node(Node::group(
            "group",
            vec![SocketDefinition::new("Color", "Color", SocketType::Color)],
        ));
        let group_input = graph.add_node(Node::group_input(
            "group input",
            group,
            vec![SocketDefinition::new("Color", "Color", SocketType::Color)],
        ));
        let inner = graph.add_node(color_node("inner"));

        graph.connect(source, "Out", reroute, "Input").unwrap();
        graph.connect(reroute, "Output", group, "Color").unwrap();
        graph.connect(group_input, "Color", inner, "In").unwrap();

        let origin = get_input_origin_socket(&graph, &InputSocket::new(inner, "In")).unwrap();
        assert_eq!(origin, Socket::Output(OutputSocket::new(source, "Out")));

        let targets = get_output_target_inputs(&graph, &OutputSocket::new(source, "Out")).unwrap();
        assert_eq!(targets, vec![InputSocket::new(inner, "In")]);
    }

    #[test]
    fn test_conditioned_count_only_counts_matching_consumers() {
        let mut graph = NodeGraph::new();
        let source = graph.add_node(color_node("source"));
        let consumers: Vec<_> = (0..4)
            .map(|i| graph.add_node(color_node(&format!("consumer {}", i))))
            .collect();
        for consumer in &consumers {
            graph.connect(source, "Out", *consumer, "In").unwrap();
        }

        let output = OutputSocket::new(source, "Out");
        let count = number_of_inputs_linked_to_output_conditioned(&graph, &output, |input| {
            input.node_id == consumers[0] || input.node_id == consumers[2]
        })
        .unwrap();
        assert_eq!(count, 2);

        assert!(is_output_linked_to_node_conditioned(&graph, &output, |node| {
            node.name == "consumer 3"
        })
        .unwrap());
        assert!(!is_output_linked_to_node_conditioned(&graph, &output, |node| {
            node.name == "source"
        })
        .unwrap());
    }

    #[test]
    fn test_shader_socket_has_no_result_type() {
        assert!(matches!(
            get_node_socket_result_type(SocketType::Shader),
            Err(CompositorError::UnsupportedSocketType(_))
        ));
        assert_eq!(
            get_node_socket_result_type(SocketType::Vector).unwrap(),
            ResultType::Vector
        );
    }

    #[test]
    fn test_input_descriptor_mirrors_socket() {
        let socket = SocketDefinition::new("Fac", "Fac", SocketType::Float)
            .with_default(SocketValue::float(1.0))
            .single_value()
            .with_domain_priority(2);
        let descriptor = input_descriptor_from_input_socket(&socket).unwrap();
        assert_eq!(descriptor.result_type, ResultType::Float);
        assert_eq!(descriptor.default_value, Some(SocketValue::float(1.0)));
        assert!(descriptor.expects_single_value);
        assert!(!descriptor.skip_realization);
        assert_eq!(descriptor.domain_priority, 2);
    }
}
