//! GPU backend abstraction.
//!
//! The compositor never talks to a graphics API directly. Texture storage and
//! compute dispatches go through a [`GpuBackend`], which a host application
//! implements on top of its renderer. [`HeadlessBackend`] keeps textures in
//! memory and records dispatches instead of running them.

mod headless;

pub use headless::{DispatchLog, DispatchRecord, HeadlessBackend};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CompositorError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R16F,
    Rgba16F,
    R32F,
    Rgba32F,
}

impl TextureFormat {
    pub fn channels(self) -> usize {
        match self {
            TextureFormat::R16F | TextureFormat::R32F => 1,
            TextureFormat::Rgba16F | TextureFormat::Rgba32F => 4,
        }
    }
}

/// Size and format of a texture. Textures with equal specs are interchangeable.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureSpec {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureSpec {
    pub fn new(size: [u32; 2], format: TextureFormat) -> Self {
        Self {
            width: size[0],
            height: size[1],
            format,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    /// Number of float components needed to hold the whole texture.
    pub fn component_count(&self) -> usize {
        self.width as usize * self.height as usize * self.format.channels()
    }
}

impl fmt::Display for TextureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?}", self.width, self.height, self.format)
    }
}

/// Opaque handle to a texture owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u64);

impl TextureHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Names a compute shader known to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle {
    name: String,
}

impl ShaderHandle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Resources bound to a compute dispatch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderBindings {
    /// Sampled input textures.
    pub textures: Vec<(String, TextureHandle)>,
    /// Written output images.
    pub images: Vec<(String, TextureHandle)>,
    /// Single value inputs.
    pub uniforms: Vec<(String, [f32; 4])>,
}

impl ShaderBindings {
    pub fn bind_texture(&mut self, name: &str, texture: TextureHandle) {
        self.textures.push((name.to_string(), texture));
    }

    pub fn bind_image(&mut self, name: &str, texture: TextureHandle) {
        self.images.push((name.to_string(), texture));
    }

    pub fn bind_uniform(&mut self, name: &str, value: [f32; 4]) {
        self.uniforms.push((name.to_string(), value));
    }
}

pub trait GpuBackend {
    /// Allocate a texture. Failure to allocate is `ResourceExhausted`.
    fn create_texture(&mut self, spec: &TextureSpec) -> Result<TextureHandle, CompositorError>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Upload `data`, which must hold `spec.component_count()` floats.
    fn update_texture(&mut self, texture: TextureHandle, data: &[f32])
    -> Result<(), CompositorError>;

    fn read_texture(&self, texture: TextureHandle) -> Result<Vec<f32>, CompositorError>;

    /// Submit a compute dispatch with the given number of work groups.
    fn dispatch(
        &mut self,
        shader: &ShaderHandle,
        bindings: &ShaderBindings,
        group_count: [u32; 2],
    ) -> Result<(), CompositorError>;
}
