use log::debug;
use uuid::Uuid;

use crate::context::{Context, OutputImage};
use crate::error::CompositorError;
use crate::node_operation::{NodeOperation, delegate_node_operation};
use crate::operation::{InputResults, Operation};

/// `output.composite` and `output.viewer`: reads back the `Image` input and
/// stores it in the context under the node's name.
pub struct CompositeOperation<'a> {
    operation: NodeOperation<'a>,
}

impl<'a> CompositeOperation<'a> {
    pub fn boxed(
        context: &'a Context<'a>,
        node_id: Uuid,
    ) -> Result<Box<dyn Operation<'a> + 'a>, CompositorError> {
        Ok(Box::new(Self {
            operation: NodeOperation::new(context, node_id)?,
        }))
    }
}

impl<'a> Operation<'a> for CompositeOperation<'a> {
    delegate_node_operation!('a);

    fn execute(&mut self, inputs: &mut InputResults<'_, 'a>) -> Result<(), CompositorError> {
        let node = self.operation.node_data();
        let Some(input) = inputs.get("Image") else {
            return Ok(());
        };
        let Some(texture) = input.texture() else {
            return Err(CompositorError::dispatch(format!(
                "Input of '{}' was never computed",
                node.name
            )));
        };

        let context = self.operation.base().context();
        let pixels = context.texture_pool().backend().read_texture(texture)?;
        let image = OutputImage {
            size: input.size(),
            pixels,
            is_single_value: input.is_single_value(),
        };
        debug!(
            "'{}' received a {}x{} image",
            node.name, image.size[0], image.size[1]
        );
        context.store_output_image(&node.name, image);
        inputs.release("Image");
        Ok(())
    }
}
