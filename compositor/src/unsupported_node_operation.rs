use log::warn;
use uuid::Uuid;

use crate::context::Context;
use crate::error::CompositorError;
use crate::node_operation::{NodeOperation, delegate_node_operation};
use crate::operation::{InputResults, Operation};

/// Stands in for nodes the compositor cannot evaluate. Every needed output is
/// written as a zero single value so downstream nodes still get an input.
pub struct UnsupportedNodeOperation<'a> {
    operation: NodeOperation<'a>,
}

impl<'a> UnsupportedNodeOperation<'a> {
    pub fn new(context: &'a Context<'a>, node_id: Uuid) -> Result<Self, CompositorError> {
        let operation = NodeOperation::new(context, node_id)?;
        warn!(
            "Node {} is not supported by the compositor; its outputs will be zero",
            operation.label()
        );
        Ok(Self { operation })
    }

    pub fn boxed(
        context: &'a Context<'a>,
        node_id: Uuid,
    ) -> Result<Box<dyn Operation<'a> + 'a>, CompositorError> {
        Ok(Box::new(Self::new(context, node_id)?))
    }

    pub fn node_operation(&self) -> &NodeOperation<'a> {
        &self.operation
    }
}

impl<'a> Operation<'a> for UnsupportedNodeOperation<'a> {
    delegate_node_operation!('a);

    fn execute(&mut self, _inputs: &mut InputResults<'_, 'a>) -> Result<(), CompositorError> {
        let context = self.operation.base().context();
        let half_precision = context.config().half_precision;
        let node = self.operation.node_data();
        let mut pool = context.texture_pool();
        for output in &node.outputs {
            if !self.operation.should_compute_output(&output.identifier) {
                continue;
            }
            self.operation
                .base_mut()
                .get_result_mut(&output.identifier)
                .allocate_invalid(&mut pool, half_precision)?;
        }
        Ok(())
    }
}
