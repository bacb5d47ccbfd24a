//! Recycling pool for textures backing operation results.
//!
//! Results acquire textures when they are first written and release them once
//! their last consumer is done with them. Released textures are kept around
//! and handed out again to any request with an equal [`TextureSpec`], so a
//! steady-state evaluation allocates nothing from the backend.

use std::collections::{HashMap, HashSet};

use log::{debug, trace, warn};

use crate::error::CompositorError;
use crate::gpu::{GpuBackend, TextureHandle, TextureSpec};

pub struct TexturePool {
    backend: Box<dyn GpuBackend>,
    available: HashMap<TextureSpec, Vec<TextureHandle>>,
    in_use: HashMap<TextureHandle, TextureSpec>,
    /// Textures handed out since the last `reset`.
    acquired_since_reset: HashSet<TextureHandle>,
}

impl TexturePool {
    pub fn new(backend: Box<dyn GpuBackend>) -> Self {
        Self {
            backend,
            available: HashMap::new(),
            in_use: HashMap::new(),
            acquired_since_reset: HashSet::new(),
        }
    }

    /// Get a texture with the given spec, reusing an available one if possible.
    pub fn acquire(&mut self, spec: TextureSpec) -> Result<TextureHandle, CompositorError> {
        let texture = match self.available.get_mut(&spec).and_then(Vec::pop) {
            Some(texture) => {
                trace!("Reusing pooled texture {:?} ({})", texture, spec);
                texture
            }
            None => self.backend.create_texture(&spec)?,
        };
        self.in_use.insert(texture, spec);
        self.acquired_since_reset.insert(texture);
        Ok(texture)
    }

    /// Give a texture back to the pool.
    ///
    /// Panics if the texture is not currently acquired; that means a result was
    /// released twice.
    pub fn release(&mut self, texture: TextureHandle) {
        let spec = match self.in_use.remove(&texture) {
            Some(spec) => spec,
            None => panic!("texture {:?} released to the pool while not in use", texture),
        };
        self.available.entry(spec).or_default().push(texture);
    }

    /// Destroy available textures that were not acquired since the previous
    /// reset. Called once before every evaluation.
    pub fn reset(&mut self) {
        let mut destroyed = 0;
        for textures in self.available.values_mut() {
            let (keep, evict): (Vec<_>, Vec<_>) = textures
                .drain(..)
                .partition(|texture| self.acquired_since_reset.contains(texture));
            for texture in evict {
                self.backend.destroy_texture(texture);
                destroyed += 1;
            }
            *textures = keep;
        }
        self.available.retain(|_, textures| !textures.is_empty());

        if !self.in_use.is_empty() {
            warn!(
                "Texture pool reset with {} textures still in use",
                self.in_use.len()
            );
        }
        self.acquired_since_reset.clear();
        debug!(
            "Texture pool reset: destroyed {}, keeping {} available",
            destroyed,
            self.available_count()
        );
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }

    pub fn available_count(&self) -> usize {
        self.available.values().map(Vec::len).sum()
    }

    /// Textures currently owned by the pool, in use or not.
    pub fn allocated_count(&self) -> usize {
        self.in_use_count() + self.available_count()
    }

    pub fn is_in_use(&self, texture: TextureHandle) -> bool {
        self.in_use.contains_key(&texture)
    }

    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn GpuBackend {
        self.backend.as_mut()
    }
}

impl Drop for TexturePool {
    fn drop(&mut self) {
        for (_, textures) in self.available.drain() {
            for texture in textures {
                self.backend.destroy_texture(texture);
            }
        }
        for (texture, _) in self.in_use.drain() {
            self.backend.destroy_texture(texture);
        }
    }
}
