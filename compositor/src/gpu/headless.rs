use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use super::{GpuBackend, ShaderBindings, ShaderHandle, TextureHandle, TextureSpec};
use crate::error::CompositorError;

/// A dispatch submitted to a [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchRecord {
    pub shader: ShaderHandle,
    pub bindings: ShaderBindings,
    pub group_count: [u32; 2],
}

/// Shared view of the dispatches recorded by a [`HeadlessBackend`], usable
/// after the backend has been moved into a texture pool.
pub type DispatchLog = Rc<RefCell<Vec<DispatchRecord>>>;

struct HeadlessTexture {
    spec: TextureSpec,
    data: Vec<f32>,
}

/// Backend that keeps textures in CPU memory and records dispatches without
/// running them. Used by tests and the command line dry run.
pub struct HeadlessBackend {
    next_id: u64,
    textures: HashMap<TextureHandle, HeadlessTexture>,
    /// Maximum number of live textures, if limited.
    texture_budget: Option<usize>,
    dispatches: DispatchLog,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            textures: HashMap::new(),
            texture_budget: None,
            dispatches: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Fail texture creation once `budget` textures are alive.
    pub fn with_texture_budget(mut self, budget: usize) -> Self {
        self.texture_budget = Some(budget);
        self
    }

    pub fn dispatch_log(&self) -> DispatchLog {
        Rc::clone(&self.dispatches)
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    fn texture(&self, texture: TextureHandle) -> Result<&HeadlessTexture, CompositorError> {
        self.textures
            .get(&texture)
            .ok_or_else(|| CompositorError::dispatch(format!("Unknown texture {:?}", texture)))
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_texture(&mut self, spec: &TextureSpec) -> Result<TextureHandle, CompositorError> {
        if let Some(budget) = self.texture_budget {
            if self.textures.len() >= budget {
                return Err(CompositorError::exhausted(format!(
                    "texture budget of {} exhausted while allocating {}",
                    budget, spec
                )));
            }
        }

        let handle = TextureHandle(self.next_id);
        self.next_id += 1;
        self.textures.insert(
            handle,
            HeadlessTexture {
                spec: *spec,
                data: vec![0.0; spec.component_count()],
            },
        );
        trace!("Created texture {:?} ({})", handle, spec);
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            trace!("Destroyed texture {:?}", texture);
        }
    }

    fn update_texture(
        &mut self,
        texture: TextureHandle,
        data: &[f32],
    ) -> Result<(), CompositorError> {
        let stored = self
            .textures
            .get_mut(&texture)
            .ok_or_else(|| CompositorError::dispatch(format!("Unknown texture {:?}", texture)))?;
        if data.len() != stored.spec.component_count() {
            return Err(CompositorError::dispatch(format!(
                "Texture {:?} ({}) expects {} components, got {}",
                texture,
                stored.spec,
                stored.spec.component_count(),
                data.len()
            )));
        }
        stored.data.copy_from_slice(data);
        Ok(())
    }

    fn read_texture(&self, texture: TextureHandle) -> Result<Vec<f32>, CompositorError> {
        Ok(self.texture(texture)?.data.clone())
    }

    fn dispatch(
        &mut self,
        shader: &ShaderHandle,
        bindings: &ShaderBindings,
        group_count: [u32; 2],
    ) -> Result<(), CompositorError> {
        for (name, texture) in bindings.textures.iter().chain(bindings.images.iter()) {
            if !self.textures.contains_key(texture) {
                return Err(CompositorError::dispatch(format!(
                    "Shader '{}' binds '{}' to unknown texture {:?}",
                    shader.name(),
                    name,
                    texture
                )));
            }
        }
        trace!(
            "Dispatching '{}' with {}x{} work groups",
            shader.name(),
            group_count[0],
            group_count[1]
        );
        self.dispatches.borrow_mut().push(DispatchRecord {
            shader: shader.clone(),
            bindings: bindings.clone(),
            group_count,
        });
        Ok(())
    }
}
