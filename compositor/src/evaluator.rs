//! Drives one evaluation of a schedule.

use std::collections::HashMap;

use log::{debug, trace};
use uuid::Uuid;

use crate::context::{Context, OutputImage};
use crate::error::CompositorError;
use crate::graph::{InputSocket, Node, OutputSocket, Socket};
use crate::operation::{Operation, ResultLocation};
use crate::operations::InputSingleValueOperation;
use crate::operations::input_single_value::OUTPUT_IDENTIFIER;
use crate::registry::OperationRegistry;
use crate::schedule::Schedule;
use crate::util::timing::ScopedTimer;
use crate::utilities::{get_input_origin_socket, input_descriptor_from_input_socket};

/// Where a scheduled input reads its value from.
enum InputSource {
    /// Index of the single value operation created for an unlinked input.
    SingleValue(usize),
    Output(OutputSocket),
}

/// What an evaluation did.
#[derive(Debug, Default)]
pub struct EvaluationSummary {
    pub node_operation_count: usize,
    pub single_value_operation_count: usize,
    /// Images read back by output nodes, keyed by node name.
    pub outputs: HashMap<String, OutputImage>,
}

pub struct Evaluator {
    registry: OperationRegistry,
}

impl Evaluator {
    pub fn new(registry: OperationRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Evaluate every node of `schedule`.
    ///
    /// Operations for unlinked inputs are evaluated first, then node
    /// operations in schedule order. Each result is released by each of its
    /// consumers, so the pool holds no textures in use once evaluation
    /// succeeds. Any error aborts the evaluation.
    pub fn evaluate<'a>(
        &self,
        context: &'a Context<'a>,
        schedule: &Schedule,
    ) -> Result<EvaluationSummary, CompositorError> {
        let _timer = ScopedTimer::debug(format!("Evaluating {} scheduled nodes", schedule.len()));
        if context.config().reset_texture_pool {
            context.texture_pool().reset();
        }
        let graph = context.graph();

        let mut nodes: Vec<&'a Node> = Vec::with_capacity(schedule.len());
        for node_id in schedule.iter() {
            let node = graph.node(node_id)?;
            if node.is_forwarding() {
                debug!("Skipping forwarding node '{}'", node.name);
                continue;
            }
            nodes.push(node);
        }

        // Unlinked inputs get an operation providing their value.
        let mut operations: Vec<Box<dyn Operation<'a> + 'a>> = Vec::new();
        let mut sources: Vec<(Uuid, &'a str, InputSource)> = Vec::new();
        for &node in &nodes {
            for socket in &node.inputs {
                let input = InputSocket::new(node.id, &socket.identifier);
                let source = match get_input_origin_socket(graph, &input)? {
                    Socket::Input(origin) => {
                        let descriptor = input_descriptor_from_input_socket(socket)?;
                        operations.push(Box::new(InputSingleValueOperation::new(
                            context,
                            origin,
                            &descriptor,
                        )?));
                        InputSource::SingleValue(operations.len() - 1)
                    }
                    Socket::Output(output) => InputSource::Output(output),
                };
                sources.push((node.id, socket.identifier.as_str(), source));
            }
        }
        let single_value_operation_count = operations.len();

        let mut node_index: HashMap<Uuid, usize> = HashMap::with_capacity(nodes.len());
        for &node in &nodes {
            node_index.insert(node.id, operations.len());
            operations.push(self.registry.create_operation(context, node)?);
        }

        for operation in operations.iter_mut() {
            operation.compute_results_reference_counts(schedule)?;
        }

        for (consumer_id, identifier, source) in sources {
            let consumer = node_index[&consumer_id];
            let location = match source {
                InputSource::SingleValue(operation) => ResultLocation {
                    operation,
                    identifier: OUTPUT_IDENTIFIER.to_string(),
                },
                InputSource::Output(output) => {
                    let producer = node_index.get(&output.node_id).copied().ok_or_else(|| {
                        CompositorError::malformed(format!(
                            "{} is read by a scheduled node but its node is not scheduled",
                            output
                        ))
                    })?;
                    if producer >= consumer {
                        return Err(CompositorError::malformed(format!(
                            "{} is scheduled after the node reading it",
                            output
                        )));
                    }
                    ResultLocation {
                        operation: producer,
                        identifier: output.identifier,
                    }
                }
            };
            operations[consumer]
                .base_mut()
                .map_input_to_result(identifier, location);
        }

        if let Err(error) = execute_operations(&mut operations) {
            // Consumers that never ran cannot release what they read.
            for operation in operations.iter_mut() {
                operation.discard_results();
            }
            context.take_output_images();
            debug!(
                "Evaluation aborted; {} textures in use",
                context.texture_pool().in_use_count()
            );
            return Err(error);
        }
        trace!(
            "{} textures in use after evaluation",
            context.texture_pool().in_use_count()
        );

        Ok(EvaluationSummary {
            node_operation_count: nodes.len(),
            single_value_operation_count,
            outputs: context.take_output_images(),
        })
    }
}

fn execute_operations<'a>(
    operations: &mut [Box<dyn Operation<'a> + 'a>],
) -> Result<(), CompositorError> {
    for index in 0..operations.len() {
        let (upstream, rest) = operations.split_at_mut(index);
        let operation = &mut rest[0];
        let _timer = ScopedTimer::trace_lazy(|| format!("Executing {}", operation.label()));
        operation.evaluate(upstream)?;
        operation.release_unconsumed_results();
    }
    Ok(())
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(OperationRegistry::with_builtin_operations())
    }
}
