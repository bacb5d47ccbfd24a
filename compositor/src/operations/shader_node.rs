//! Nodes evaluated by a single compute shader dispatch.

use log::trace;
use uuid::Uuid;

use crate::context::Context;
use crate::error::CompositorError;
use crate::gpu::{ShaderBindings, ShaderHandle};
use crate::node_operation::{NodeOperation, delegate_node_operation};
use crate::operation::{InputResults, Operation};
use crate::utilities::dispatch_compute;

/// Runs the node's shader over the domain of its inputs.
///
/// Image inputs are bound as sampled textures and single value inputs as
/// uniforms, both under their socket identifiers. Every needed output gets a
/// texture of the domain size bound as a writable image.
pub struct ShaderNodeOperation<'a> {
    operation: NodeOperation<'a>,
    shader: ShaderHandle,
}

impl<'a> ShaderNodeOperation<'a> {
    pub fn new(context: &'a Context<'a>, node_id: Uuid) -> Result<Self, CompositorError> {
        let operation = NodeOperation::new(context, node_id)?;
        let node = operation.node_data();
        let shader = node.shader.as_deref().ok_or_else(|| {
            CompositorError::dispatch(format!("Node '{}' has no shader", node.name))
        })?;
        Ok(Self {
            shader: ShaderHandle::new(shader),
            operation,
        })
    }

    pub fn boxed(
        context: &'a Context<'a>,
        node_id: Uuid,
    ) -> Result<Box<dyn Operation<'a> + 'a>, CompositorError> {
        Ok(Box::new(Self::new(context, node_id)?))
    }

    /// Size of the image input with the lowest domain priority, ties going to
    /// the earlier input. Operations without image inputs run on one pixel.
    fn compute_domain(&self, inputs: &InputResults<'_, 'a>) -> [u32; 2] {
        let node = self.operation.node_data();
        let base = self.operation.base();
        node.inputs
            .iter()
            .filter_map(|socket| {
                let descriptor = base.get_input_descriptor(&socket.identifier)?;
                if descriptor.expects_single_value || descriptor.skip_realization {
                    return None;
                }
                let result = inputs.get(&socket.identifier)?;
                if result.is_single_value() || !result.is_allocated() {
                    return None;
                }
                Some((descriptor.domain_priority, result.size()))
            })
            .min_by_key(|(priority, _)| *priority)
            .map(|(_, size)| size)
            .unwrap_or([1, 1])
    }
}

impl<'a> Operation<'a> for ShaderNodeOperation<'a> {
    delegate_node_operation!('a);

    fn execute(&mut self, inputs: &mut InputResults<'_, 'a>) -> Result<(), CompositorError> {
        let node = self.operation.node_data();
        let needed: Vec<&str> = node
            .outputs
            .iter()
            .map(|socket| socket.identifier.as_str())
            .filter(|identifier| self.operation.should_compute_output(identifier))
            .collect();
        if needed.is_empty() {
            trace!("Skipping {}: no output is read", self.operation.label());
            return Ok(());
        }

        let domain = self.compute_domain(inputs);
        let mut bindings = ShaderBindings::default();
        for socket in &node.inputs {
            let Some(result) = inputs.get(&socket.identifier) else {
                continue;
            };
            match result.texture() {
                Some(texture) if !result.is_single_value() => {
                    bindings.bind_texture(&socket.identifier, texture)
                }
                _ => bindings.bind_uniform(&socket.identifier, result.value()),
            }
        }

        let context = self.operation.base().context();
        let config = context.config();
        let mut pool = context.texture_pool();
        for identifier in needed {
            let texture = self
                .operation
                .base_mut()
                .get_result_mut(identifier)
                .allocate_texture(domain, &mut pool, config.half_precision)?;
            bindings.bind_image(identifier, texture);
        }

        dispatch_compute(
            pool.backend_mut(),
            &self.shader,
            &bindings,
            domain,
            config.local_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompositorConfig;
    use crate::context::InputImage;
    use crate::gpu::{DispatchLog, HeadlessBackend};
    use crate::graph::{NodeGraph, NodeTypeLibrary};
    use crate::operation::ResultLocation;
    use crate::operations::ImageInputOperation;
    use crate::schedule::Schedule;
    use crate::texture_pool::TexturePool;

    /// Two images of different sizes mixed together and composited.
    struct MixGraph {
        graph: NodeGraph,
        large: Uuid,
        small: Uuid,
        mix: Uuid,
    }

    fn mix_graph() -> MixGraph {
        let library = NodeTypeLibrary::with_builtin_types();
        let mut graph = NodeGraph::new();
        let large = graph.add_node(library.create_node("input.image", "Large").unwrap());
        let small = graph.add_node(library.create_node("input.image", "Small").unwrap());
        let mix = graph.add_node(library.create_node("color.mix", "Mix").unwrap());
        let composite =
            graph.add_node(library.create_node("output.composite", "Composite").unwrap());
        graph.connect(large, "Image", mix, "Image").unwrap();
        graph.connect(small, "Image", mix, "Image_001").unwrap();
        graph.connect(mix, "Image", composite, "Image").unwrap();
        MixGraph {
            graph,
            large,
            small,
            mix,
        }
    }

    fn context(graph: &NodeGraph) -> (Context<'_>, DispatchLog) {
        let backend = HeadlessBackend::new();
        let log = backend.dispatch_log();
        let config = CompositorConfig {
            local_size: [4, 4],
            ..CompositorConfig::default()
        };
        let context = Context::new(graph, TexturePool::new(Box::new(backend)), config)
            .with_input_image("Large", InputImage::filled([8, 4], [1.0; 4]))
            .with_input_image("Small", InputImage::filled([2, 2], [0.5; 4]));
        (context, log)
    }

    #[test]
    fn test_domain_is_the_highest_priority_image_input() {
        let mix_graph = mix_graph();
        let (context, log) = context(&mix_graph.graph);
        let schedule = Schedule::compute(&mix_graph.graph).unwrap();

        let mut operations = vec![
            ImageInputOperation::boxed(&context, mix_graph.large).unwrap(),
            ImageInputOperation::boxed(&context, mix_graph.small).unwrap(),
            ShaderNodeOperation::boxed(&context, mix_graph.mix).unwrap(),
        ];
        for operation in operations.iter_mut() {
            operation.compute_results_reference_counts(&schedule).unwrap();
        }
        for (input, producer) in [("Image", 0), ("Image_001", 1)] {
            operations[2].base_mut().map_input_to_result(
                input,
                ResultLocation {
                    operation: producer,
                    identifier: "Image".to_string(),
                },
            );
        }
        for index in 0..operations.len() {
            let (upstream, rest) = operations.split_at_mut(index);
            rest[0].evaluate(upstream).unwrap();
        }

        // "Image" has priority 0 and wins over "Image_001".
        assert_eq!(operations[2].get_result("Image").size(), [8, 4]);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].shader.name(), "compositor_mix_blend");
        assert_eq!(log[0].group_count, [2, 1]);
        let bound: Vec<&str> = log[0]
            .bindings
            .textures
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(bound, vec!["Image", "Image_001"]);
        assert!(log[0].bindings.uniforms.is_empty());

        // Both images were released by the mix; only its output is held.
        assert_eq!(context.texture_pool().in_use_count(), 1);
    }

    #[test]
    fn test_linked_result_is_bound_with_its_own_type() {
        let library = NodeTypeLibrary::with_builtin_types();
        let mut graph = NodeGraph::new();
        let image = graph.add_node(library.create_node("input.image", "Small").unwrap());
        let invert = graph.add_node(library.create_node("color.invert", "Invert").unwrap());
        let composite =
            graph.add_node(library.create_node("output.composite", "Composite").unwrap());
        graph.connect(image, "Alpha", invert, "Color").unwrap();
        graph.connect(invert, "Color", composite, "Image").unwrap();
        let (context, log) = context(&graph);
        let schedule = Schedule::compute(&graph).unwrap();

        let mut operations = vec![
            ImageInputOperation::boxed(&context, image).unwrap(),
            ShaderNodeOperation::boxed(&context, invert).unwrap(),
        ];
        for operation in operations.iter_mut() {
            operation.compute_results_reference_counts(&schedule).unwrap();
        }
        operations[1].base_mut().map_input_to_result(
            "Color",
            ResultLocation {
                operation: 0,
                identifier: "Alpha".to_string(),
            },
        );
        for index in 0..operations.len() {
            let (upstream, rest) = operations.split_at_mut(index);
            rest[0].evaluate(upstream).unwrap();
        }

        // The float alpha reaches the color input as a one channel texture.
        let log = log.borrow();
        let (name, texture) = log[0].bindings.textures[0].clone();
        assert_eq!(name, "Color");
        let pixels = context.texture_pool().backend().read_texture(texture).unwrap();
        assert_eq!(pixels, vec![0.5; 4]);
        assert_eq!(operations[1].get_result("Color").size(), [2, 2]);
    }

    #[test]
    fn test_unread_outputs_skip_the_dispatch() {
        let mix_graph = mix_graph();
        let (context, log) = context(&mix_graph.graph);

        let mut operation = ShaderNodeOperation::boxed(&context, mix_graph.mix).unwrap();
        operation
            .compute_results_reference_counts(&Schedule::from_order(vec![mix_graph.mix]))
            .unwrap();
        operation.evaluate(&mut []).unwrap();
        assert!(log.borrow().is_empty());
        assert!(!operation.get_result("Image").is_allocated());
    }

    #[test]
    fn test_node_without_shader_is_rejected() {
        let library = NodeTypeLibrary::with_builtin_types();
        let mut graph = NodeGraph::new();
        let blur = graph.add_node(library.create_node("filter.blur", "Blur").unwrap());
        let (context, _) = context(&graph);
        assert!(matches!(
            ShaderNodeOperation::new(&context, blur),
            Err(CompositorError::Dispatch(_))
        ));
    }
}
