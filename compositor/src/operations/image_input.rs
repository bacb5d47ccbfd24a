use log::warn;
use uuid::Uuid;

use crate::context::{Context, InputImage};
use crate::error::CompositorError;
use crate::node_operation::{NodeOperation, delegate_node_operation};
use crate::operation::{InputResults, Operation};
use crate::texture_pool::TexturePool;

/// `input.image`: uploads the image supplied under the node's name. The
/// `Image` output carries the pixels and `Alpha` their alpha channel.
pub struct ImageInputOperation<'a> {
    operation: NodeOperation<'a>,
}

impl<'a> ImageInputOperation<'a> {
    pub fn boxed(
        context: &'a Context<'a>,
        node_id: Uuid,
    ) -> Result<Box<dyn Operation<'a> + 'a>, CompositorError> {
        Ok(Box::new(Self {
            operation: NodeOperation::new(context, node_id)?,
        }))
    }

    fn upload(
        &mut self,
        output: &str,
        image: &InputImage,
        pixels: &[f32],
        pool: &mut TexturePool,
    ) -> Result<(), CompositorError> {
        let half_precision = self.operation.base().context().config().half_precision;
        let result = self.operation.base_mut().get_result_mut(output);
        let texture = result.allocate_texture(image.size, pool, half_precision)?;
        pool.backend_mut().update_texture(texture, pixels)
    }
}

impl<'a> Operation<'a> for ImageInputOperation<'a> {
    delegate_node_operation!('a);

    fn execute(&mut self, _inputs: &mut InputResults<'_, 'a>) -> Result<(), CompositorError> {
        let context = self.operation.base().context();
        let node = self.operation.node_data();
        let compute_image = self.operation.should_compute_output("Image");
        let compute_alpha = self.operation.should_compute_output("Alpha");
        if !compute_image && !compute_alpha {
            return Ok(());
        }

        let Some(image) = context.input_image(&node.name) else {
            warn!("No image supplied for '{}'; using zero", node.name);
            let half_precision = context.config().half_precision;
            let mut pool = context.texture_pool();
            for (output, needed) in [("Image", compute_image), ("Alpha", compute_alpha)] {
                if needed {
                    self.operation
                        .base_mut()
                        .get_result_mut(output)
                        .allocate_invalid(&mut pool, half_precision)?;
                }
            }
            return Ok(());
        };

        let expected = image.size[0] as usize * image.size[1] as usize * 4;
        if image.pixels.len() != expected {
            return Err(CompositorError::dispatch(format!(
                "Image for '{}' is {}x{} but holds {} floats",
                node.name,
                image.size[0],
                image.size[1],
                image.pixels.len()
            )));
        }

        let mut pool = context.texture_pool();
        if compute_image {
            self.upload("Image", image, &image.pixels, &mut pool)?;
        }
        if compute_alpha {
            let alpha: Vec<f32> = image.pixels.chunks_exact(4).map(|pixel| pixel[3]).collect();
            self.upload("Alpha", image, &alpha, &mut pool)?;
        }
        Ok(())
    }
}
