//! Operation providing the value of an unlinked input.

use crate::context::Context;
use crate::error::CompositorError;
use crate::graph::{InputSocket, SocketType, SocketValue};
use crate::input_descriptor::InputDescriptor;
use crate::operation::{InputResults, Operation, OperationBase, OperationState};
use crate::result::{OperationResult, ResultType};
use crate::schedule::Schedule;

pub const OUTPUT_IDENTIFIER: &str = "Output";

/// Holds the default value of an input socket that nothing is linked to, as a
/// single value of the type the consuming input expects. Each one feeds
/// exactly one input.
pub struct InputSingleValueOperation<'a> {
    base: OperationBase<'a>,
    origin: InputSocket,
    value: SocketValue,
}

impl<'a> InputSingleValueOperation<'a> {
    /// `origin` is the unlinked socket the value comes from and `descriptor`
    /// describes the input that reads it. They differ when the value is
    /// forwarded from an unlinked group input.
    pub fn new(
        context: &'a Context<'a>,
        origin: InputSocket,
        descriptor: &InputDescriptor,
    ) -> Result<Self, CompositorError> {
        let node = context.graph().node(origin.node_id)?;
        let socket = node.input(&origin.identifier).ok_or_else(|| {
            CompositorError::malformed(format!("Input {} does not exist", origin))
        })?;
        let target_type = socket_type(descriptor.result_type);
        let value = socket
            .default_value
            .and_then(|value| value.convert_to(target_type))
            .or_else(|| SocketValue::zero(target_type))
            .ok_or_else(|| {
                CompositorError::UnsupportedSocketType(format!(
                    "No single value of type {} for {}",
                    target_type, origin
                ))
            })?;

        let mut base = OperationBase::new(context);
        base.populate_result(OUTPUT_IDENTIFIER, OperationResult::new(descriptor.result_type));
        Ok(Self { base, origin, value })
    }

    pub fn origin(&self) -> &InputSocket {
        &self.origin
    }

    pub fn value(&self) -> SocketValue {
        self.value
    }
}

fn socket_type(result_type: ResultType) -> SocketType {
    match result_type {
        ResultType::Float => SocketType::Float,
        ResultType::Vector => SocketType::Vector,
        ResultType::Color => SocketType::Color,
    }
}

impl<'a> Operation<'a> for InputSingleValueOperation<'a> {
    fn base(&self) -> &OperationBase<'a> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OperationBase<'a> {
        &mut self.base
    }

    fn execute(&mut self, _inputs: &mut InputResults<'_, 'a>) -> Result<(), CompositorError> {
        let context = self.base.context();
        let mut pool = context.texture_pool();
        let result = self.base.get_result_mut(OUTPUT_IDENTIFIER);
        result.allocate_single_value(&mut pool, context.config().half_precision)?;
        result.set_value(self.value.to_pixel(), &mut pool)
    }

    /// The result is read by the one input it was created for.
    fn compute_results_reference_counts(
        &mut self,
        _schedule: &Schedule,
    ) -> Result<(), CompositorError> {
        self.base
            .get_result_mut(OUTPUT_IDENTIFIER)
            .set_initial_reference_count(1);
        self.base.set_state(OperationState::ReferenceCounted);
        Ok(())
    }

    fn label(&self) -> String {
        format!("single value for {}", self.origin)
    }
}
