//! Reference counted results of operations.
//!
//! An [`OperationResult`] is one output of an operation: either an image or a
//! single value, stored in a texture drawn from the [`TexturePool`]. Its
//! reference count is set once before evaluation to the number of scheduled
//! consumers, and every consumer releases it exactly once after reading. The
//! texture goes back to the pool when the count reaches zero.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::CompositorError;
use crate::gpu::{TextureFormat, TextureHandle, TextureSpec};
use crate::texture_pool::TexturePool;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultType {
    Float,
    Vector,
    Color,
}

impl ResultType {
    pub fn texture_format(self, half_precision: bool) -> TextureFormat {
        match (self, half_precision) {
            (ResultType::Float, true) => TextureFormat::R16F,
            (ResultType::Float, false) => TextureFormat::R32F,
            (ResultType::Vector | ResultType::Color, true) => TextureFormat::Rgba16F,
            (ResultType::Vector | ResultType::Color, false) => TextureFormat::Rgba32F,
        }
    }
}

#[derive(Debug)]
pub struct OperationResult {
    result_type: ResultType,
    texture: Option<TextureHandle>,
    is_single_value: bool,
    /// CPU copy of the value when `is_single_value` is set.
    value: [f32; 4],
    size: [u32; 2],
    /// `None` until the reference count has been computed.
    reference_count: Option<u32>,
}

impl OperationResult {
    pub fn new(result_type: ResultType) -> Self {
        Self {
            result_type,
            texture: None,
            is_single_value: false,
            value: [0.0; 4],
            size: [0, 0],
            reference_count: None,
        }
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    pub fn set_initial_reference_count(&mut self, count: u32) {
        self.reference_count = Some(count);
    }

    pub fn reference_count(&self) -> Option<u32> {
        self.reference_count
    }

    /// True if anything scheduled will read this result.
    ///
    /// Panics if the reference count was never computed.
    pub fn should_compute(&self) -> bool {
        match self.reference_count {
            Some(count) => count > 0,
            None => panic!("should_compute queried before the reference count was computed"),
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.texture.is_some()
    }

    pub fn is_single_value(&self) -> bool {
        self.is_single_value
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Size of the image, `[1, 1]` for single values.
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Allocate an image texture of the given size.
    pub fn allocate_texture(
        &mut self,
        size: [u32; 2],
        pool: &mut TexturePool,
        half_precision: bool,
    ) -> Result<TextureHandle, CompositorError> {
        self.allocate(size, false, pool, half_precision)
    }

    /// Allocate storage for a single value. Set the value afterwards.
    pub fn allocate_single_value(
        &mut self,
        pool: &mut TexturePool,
        half_precision: bool,
    ) -> Result<(), CompositorError> {
        self.allocate([1, 1], true, pool, half_precision)?;
        Ok(())
    }

    /// Allocate a single value set to zero, the neutral value of every type.
    pub fn allocate_invalid(
        &mut self,
        pool: &mut TexturePool,
        half_precision: bool,
    ) -> Result<(), CompositorError> {
        self.allocate_single_value(pool, half_precision)?;
        self.set_value([0.0; 4], pool)
    }

    fn allocate(
        &mut self,
        size: [u32; 2],
        is_single_value: bool,
        pool: &mut TexturePool,
        half_precision: bool,
    ) -> Result<TextureHandle, CompositorError> {
        assert!(
            self.texture.is_none(),
            "result allocated twice without being released"
        );
        let spec = TextureSpec::new(size, self.result_type.texture_format(half_precision));
        let texture = pool.acquire(spec)?;
        self.texture = Some(texture);
        self.is_single_value = is_single_value;
        self.size = size;
        Ok(texture)
    }

    pub fn set_float_value(
        &mut self,
        value: f32,
        pool: &mut TexturePool,
    ) -> Result<(), CompositorError> {
        self.set_value([value, 0.0, 0.0, 0.0], pool)
    }

    pub fn set_vector_value(
        &mut self,
        value: [f32; 3],
        pool: &mut TexturePool,
    ) -> Result<(), CompositorError> {
        self.set_value([value[0], value[1], value[2], 0.0], pool)
    }

    pub fn set_color_value(
        &mut self,
        value: [f32; 4],
        pool: &mut TexturePool,
    ) -> Result<(), CompositorError> {
        self.set_value(value, pool)
    }

    /// Store a single value and upload it to the backing texture. Float
    /// results keep only the first channel.
    pub fn set_value(
        &mut self,
        value: [f32; 4],
        pool: &mut TexturePool,
    ) -> Result<(), CompositorError> {
        assert!(
            self.is_single_value,
            "set_value on a result that is not an allocated single value"
        );
        let texture = match self.texture {
            Some(texture) => texture,
            None => panic!("set_value on a result without storage"),
        };
        self.value = match self.result_type {
            ResultType::Float => [value[0], 0.0, 0.0, 0.0],
            ResultType::Vector => [value[0], value[1], value[2], 0.0],
            ResultType::Color => value,
        };
        let components = match self.result_type {
            ResultType::Float => &self.value[..1],
            ResultType::Vector | ResultType::Color => &self.value[..],
        };
        pool.backend_mut().update_texture(texture, components)
    }

    pub fn get_float_value(&self) -> f32 {
        self.value[0]
    }

    pub fn get_vector_value(&self) -> [f32; 3] {
        [self.value[0], self.value[1], self.value[2]]
    }

    pub fn get_color_value(&self) -> [f32; 4] {
        self.value
    }

    /// The single value as four channels, whatever the type.
    pub fn value(&self) -> [f32; 4] {
        self.value
    }

    /// Called by a consumer once it is done reading. The texture returns to
    /// the pool when the last consumer releases.
    ///
    /// Panics when released before counting or more often than counted.
    pub fn release(&mut self, pool: &mut TexturePool) {
        let count = match self.reference_count {
            Some(0) => panic!("result released more times than it has consumers"),
            Some(count) => count - 1,
            None => panic!("result released before its reference count was computed"),
        };
        self.reference_count = Some(count);
        if count == 0 {
            self.free(pool);
        }
    }

    /// Return the storage of a result nobody consumes but which its operation
    /// computed anyway.
    pub fn release_unconsumed(&mut self, pool: &mut TexturePool) {
        if self.reference_count == Some(0) && self.texture.is_some() {
            trace!("Freeing unconsumed {:?} result", self.result_type);
            self.free(pool);
        }
    }

    /// Return the storage regardless of the reference count. The result
    /// can no longer be read.
    pub fn discard(&mut self, pool: &mut TexturePool) {
        if self.texture.is_some() {
            trace!("Discarding {:?} result", self.result_type);
            self.free(pool);
        }
    }

    fn free(&mut self, pool: &mut TexturePool) {
        if let Some(texture) = self.texture.take() {
            pool.release(texture);
        }
    }
}
