//! Evaluation context: everything operations share during one evaluation.

use std::cell::{RefCell, RefMut};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::CompositorConfig;
use crate::graph::NodeGraph;
use crate::texture_pool::TexturePool;

/// RGBA image handed to the evaluation for an image input node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InputImage {
    pub size: [u32; 2],
    /// Row-major RGBA floats, `size[0] * size[1] * 4` of them.
    pub pixels: Vec<f32>,
}

impl InputImage {
    pub fn new(size: [u32; 2], pixels: Vec<f32>) -> Self {
        Self { size, pixels }
    }

    /// An image filled with a single color.
    pub fn filled(size: [u32; 2], color: [f32; 4]) -> Self {
        let pixel_count = size[0] as usize * size[1] as usize;
        let mut pixels = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            pixels.extend_from_slice(&color);
        }
        Self { size, pixels }
    }
}

/// Image read back by an output node.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputImage {
    pub size: [u32; 2],
    pub pixels: Vec<f32>,
    /// The output only received a single value, stored as one pixel.
    pub is_single_value: bool,
}

/// Created fresh for each evaluation. Owns the texture pool for the duration
/// of the evaluation; take it back with [`Context::into_texture_pool`] to
/// reuse textures in the next one.
pub struct Context<'a> {
    graph: &'a NodeGraph,
    config: CompositorConfig,
    texture_pool: RefCell<TexturePool>,
    input_images: HashMap<String, InputImage>,
    output_images: RefCell<HashMap<String, OutputImage>>,
}

impl<'a> Context<'a> {
    pub fn new(graph: &'a NodeGraph, texture_pool: TexturePool, config: CompositorConfig) -> Self {
        Self {
            graph,
            config,
            texture_pool: RefCell::new(texture_pool),
            input_images: HashMap::new(),
            output_images: RefCell::new(HashMap::new()),
        }
    }

    /// Supply the image read by the image input node called `node_name`.
    pub fn with_input_image(mut self, node_name: &str, image: InputImage) -> Self {
        self.input_images.insert(node_name.to_string(), image);
        self
    }

    pub fn graph(&self) -> &'a NodeGraph {
        self.graph
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Mutable access to the pool. Do not hold the guard across calls that
    /// borrow it again.
    pub fn texture_pool(&self) -> RefMut<'_, TexturePool> {
        self.texture_pool.borrow_mut()
    }

    pub fn input_image(&self, node_name: &str) -> Option<&InputImage> {
        self.input_images.get(node_name)
    }

    pub fn store_output_image(&self, node_name: &str, image: OutputImage) {
        self.output_images
            .borrow_mut()
            .insert(node_name.to_string(), image);
    }

    /// Output images written so far, keyed by output node name.
    pub fn take_output_images(&self) -> HashMap<String, OutputImage> {
        std::mem::take(&mut *self.output_images.borrow_mut())
    }

    pub fn into_texture_pool(self) -> TexturePool {
        self.texture_pool.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;

    #[test]
    fn test_filled_image_has_rgba_per_pixel() {
        let image = InputImage::filled([3, 2], [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(image.pixels.len(), 24);
        assert_eq!(&image.pixels[20..], &[0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn test_output_images_are_taken_once() {
        let graph = NodeGraph::new();
        let pool = TexturePool::new(Box::new(HeadlessBackend::new()));
        let context = Context::new(&graph, pool, CompositorConfig::default());
        context.store_output_image(
            "Composite",
            OutputImage {
                size: [1, 1],
                pixels: vec![1.0; 4],
                is_single_value: true,
            },
        );

        let images = context.take_output_images();
        assert_eq!(images.len(), 1);
        assert!(images["Composite"].is_single_value);
        assert!(context.take_output_images().is_empty());
    }
}
