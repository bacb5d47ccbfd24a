//! Constant input nodes.

use uuid::Uuid;

use crate::context::Context;
use crate::error::CompositorError;
use crate::graph::{SocketType, SocketValue};
use crate::node_operation::{NodeOperation, delegate_node_operation};
use crate::operation::{InputResults, Operation};

/// Write the `property` of the node to its only output as a single value.
fn write_constant(
    operation: &mut NodeOperation<'_>,
    output: &str,
    property: &str,
    socket_type: SocketType,
) -> Result<(), CompositorError> {
    if !operation.should_compute_output(output) {
        return Ok(());
    }
    let node = operation.node_data();
    let value = node
        .property(property)
        .and_then(|value| value.convert_to(socket_type))
        .or_else(|| SocketValue::zero(socket_type))
        .map(|value| value.to_pixel())
        .unwrap_or_default();

    let context = operation.base().context();
    let mut pool = context.texture_pool();
    let result = operation.base_mut().get_result_mut(output);
    result.allocate_single_value(&mut pool, context.config().half_precision)?;
    result.set_value(value, &mut pool)
}

/// `input.value`: the `value` property as a float.
pub struct ValueOperation<'a> {
    operation: NodeOperation<'a>,
}

impl<'a> ValueOperation<'a> {
    pub fn boxed(
        context: &'a Context<'a>,
        node_id: Uuid,
    ) -> Result<Box<dyn Operation<'a> + 'a>, CompositorError> {
        Ok(Box::new(Self {
            operation: NodeOperation::new(context, node_id)?,
        }))
    }
}

impl<'a> Operation<'a> for ValueOperation<'a> {
    delegate_node_operation!('a);

    fn execute(&mut self, _inputs: &mut InputResults<'_, 'a>) -> Result<(), CompositorError> {
        write_constant(&mut self.operation, "Value", "value", SocketType::Float)
    }
}

/// `input.rgb`: the `color` property.
pub struct RgbOperation<'a> {
    operation: NodeOperation<'a>,
}

impl<'a> RgbOperation<'a> {
    pub fn boxed(
        context: &'a Context<'a>,
        node_id: Uuid,
    ) -> Result<Box<dyn Operation<'a> + 'a>, CompositorError> {
        Ok(Box::new(Self {
            operation: NodeOperation::new(context, node_id)?,
        }))
    }
}

impl<'a> Operation<'a> for RgbOperation<'a> {
    delegate_node_operation!('a);

    fn execute(&mut self, _inputs: &mut InputResults<'_, 'a>) -> Result<(), CompositorError> {
        write_constant(&mut self.operation, "Color", "color", SocketType::Color)
    }
}
