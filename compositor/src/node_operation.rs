//! Operations that evaluate a single graph node.

use log::trace;
use uuid::Uuid;

use crate::context::Context;
use crate::error::CompositorError;
use crate::graph::{Node, OutputSocket};
use crate::operation::{OperationBase, OperationState};
use crate::result::OperationResult;
use crate::schedule::Schedule;
use crate::utilities::{
    get_node_socket_result_type, input_descriptor_from_input_socket,
    number_of_inputs_linked_to_output_conditioned,
};

/// Implements the bookkeeping methods of [`Operation`](crate::operation::Operation)
/// for a type holding its [`NodeOperation`] in an `operation` field.
macro_rules! delegate_node_operation {
    ($lt:lifetime) => {
        fn base(&self) -> &$crate::operation::OperationBase<$lt> {
            self.operation.base()
        }

        fn base_mut(&mut self) -> &mut $crate::operation::OperationBase<$lt> {
            self.operation.base_mut()
        }

        fn compute_results_reference_counts(
            &mut self,
            schedule: &$crate::schedule::Schedule,
        ) -> Result<(), $crate::error::CompositorError> {
            self.operation.compute_results_reference_counts(schedule)
        }

        fn label(&self) -> String {
            self.operation.label()
        }
    };
}
pub(crate) use delegate_node_operation;

/// State for an operation evaluating one node. Concrete node operations own
/// one and delegate the [`Operation`](crate::operation::Operation) plumbing
/// to it.
pub struct NodeOperation<'a> {
    base: OperationBase<'a>,
    node: &'a Node,
}

impl<'a> NodeOperation<'a> {
    /// Populate one result per output and one input descriptor per input of
    /// the node.
    pub fn new(context: &'a Context<'a>, node_id: Uuid) -> Result<Self, CompositorError> {
        let node = context.graph().node(node_id)?;
        let mut base = OperationBase::new(context);

        for output in &node.outputs {
            let result_type = get_node_socket_result_type(output.socket_type)?;
            base.populate_result(&output.identifier, OperationResult::new(result_type));
        }
        for input in &node.inputs {
            base.declare_input_descriptor(
                &input.identifier,
                input_descriptor_from_input_socket(input)?,
            );
        }

        Ok(Self { base, node })
    }

    pub fn base(&self) -> &OperationBase<'a> {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut OperationBase<'a> {
        &mut self.base
    }

    pub fn node(&self) -> Uuid {
        self.node.id
    }

    pub fn node_data(&self) -> &'a Node {
        self.node
    }

    pub fn state(&self) -> OperationState {
        self.base.state()
    }

    /// Count, for every output, the inputs of scheduled nodes that read it.
    /// Inputs of unscheduled nodes will never read the result and are not
    /// counted.
    pub fn compute_results_reference_counts(
        &mut self,
        schedule: &Schedule,
    ) -> Result<(), CompositorError> {
        assert_eq!(
            self.base.state(),
            OperationState::Constructed,
            "reference counts of '{}' computed twice",
            self.node.name
        );
        let graph = self.base.context().graph();
        let node = self.node;
        for output in node.output_sockets() {
            let count = number_of_inputs_linked_to_output_conditioned(graph, &output, |input| {
                schedule.contains(input.node_id)
            })?;
            trace!("{} has {} scheduled consumers", output, count);
            self.base
                .get_result_mut(&output.identifier)
                .set_initial_reference_count(count as u32);
        }
        self.base.set_state(OperationState::ReferenceCounted);
        Ok(())
    }

    /// True if any scheduled node reads the output `identifier`.
    ///
    /// Panics before reference counts are computed.
    pub fn should_compute_output(&self, identifier: &str) -> bool {
        self.base.get_result(identifier).should_compute()
    }

    pub fn output_socket(&self, identifier: &str) -> OutputSocket {
        OutputSocket::new(self.node.id, identifier)
    }

    pub fn label(&self) -> String {
        format!("{} '{}'", self.node.type_id, self.node.name)
    }
}
