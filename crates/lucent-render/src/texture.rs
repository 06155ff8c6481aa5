//! GPU texture cache.
//!
//! Textures are decoded with `image`, uploaded once through the backend and
//! memoized by the path string the caller used. [`TextureLoading`] pairs the
//! cache with a backend so it can serve as the world's
//! [`TextureLoader`](lucent_visual::texture::TextureLoader).

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use glam::Vec2;
use lucent_visual::texture::{TextureHandle, TextureInfo, TextureLoader};
use lucent_visual::world::World;
use lucent_visual::VisualError;

use crate::backend::GpuBackend;
use crate::{BackendError, RenderError, ResultExt};

#[derive(Debug, Default)]
pub struct TextureCache {
    base_dir: Option<PathBuf>,
    entries: HashMap<String, TextureInfo>,
}

impl TextureCache {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir,
            entries: HashMap::new(),
        }
    }

    /// Load `path` (relative to the base directory, if any) or return the
    /// cached entry.
    pub fn load<B: GpuBackend>(&mut self, backend: &mut B, path: &str) -> Result<TextureInfo, RenderError> {
        if let Some(info) = self.entries.get(path) {
            return Ok(*info);
        }
        self.decode_and_upload(backend, path)
            .context(format!("TextureCache::load({path})"))
    }

    fn decode_and_upload<B: GpuBackend>(&mut self, backend: &mut B, path: &str) -> Result<TextureInfo, RenderError> {
        let full = match &self.base_dir {
            Some(dir) => dir.join(path),
            None => PathBuf::from(path),
        };
        let image = image::open(&full)
            .map_err(|e| BackendError::ResourceCreation {
                resource: "texture".to_owned(),
                details: format!("cannot decode {}: {e}", full.display()),
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        self.upload(backend, path, width, height, image.as_raw())
    }

    /// Register raw RGBA8 pixels under a new `path`.
    pub fn insert_rgba<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        path: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureInfo, RenderError> {
        if self.entries.contains_key(path) {
            return Err(RenderError::TextureExists { path: path.to_owned() });
        }
        self.upload(backend, path, width, height, rgba)
    }

    /// Swap the pixels cached under `path`. Refused while any visual in
    /// `world` still holds the old handle, since it would bind a released
    /// texture.
    pub fn replace_rgba<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        world: &World,
        path: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureInfo, RenderError> {
        let Some(old) = self.entries.get(path).copied() else {
            return self.upload(backend, path, width, height, rgba);
        };
        let users = world
            .iter()
            .filter(|v| v.texture().and_then(|t| t.handle) == Some(old.handle))
            .count();
        if users > 0 {
            return Err(RenderError::TextureInUse {
                path: path.to_owned(),
                users,
            });
        }
        let handle = backend.create_texture(width, height, rgba)?;
        backend.release_texture(old.handle);
        let info = TextureInfo {
            handle,
            size: Vec2::new(width as f32, height as f32),
        };
        self.entries.insert(path.to_owned(), info);
        tracing::debug!(path, width, height, "texture replaced");
        Ok(info)
    }

    fn upload<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        path: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureInfo, RenderError> {
        let handle = backend.create_texture(width, height, rgba)?;
        let info = TextureInfo {
            handle,
            size: Vec2::new(width as f32, height as f32),
        };
        self.entries.insert(path.to_owned(), info);
        tracing::debug!(path, width, height, "texture loaded");
        Ok(info)
    }

    pub fn get(&self, path: &str) -> Option<TextureInfo> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release cached textures. With a world, only textures that no live
    /// visual's texture component references go; without one, all do.
    /// Returns how many were released.
    pub fn clear<B: GpuBackend>(&mut self, backend: &mut B, world: Option<&World>) -> usize {
        let in_use: HashSet<TextureHandle> = match world {
            Some(world) => world
                .iter()
                .filter_map(|v| v.texture().and_then(|t| t.handle))
                .collect(),
            None => HashSet::new(),
        };
        let before = self.entries.len();
        self.entries.retain(|path, info| {
            let keep = in_use.contains(&info.handle);
            if !keep {
                tracing::trace!(path = path.as_str(), "texture released");
                backend.release_texture(info.handle);
            }
            keep
        });
        before - self.entries.len()
    }
}

/// A [`TextureCache`] borrowed together with the backend it uploads to.
pub struct TextureLoading<'a, B: GpuBackend> {
    cache: &'a mut TextureCache,
    backend: &'a mut B,
}

impl<'a, B: GpuBackend> TextureLoading<'a, B> {
    pub fn new(cache: &'a mut TextureCache, backend: &'a mut B) -> Self {
        Self { cache, backend }
    }
}

impl<B: GpuBackend> TextureLoader for TextureLoading<'_, B> {
    fn load_texture(&mut self, path: &str) -> Result<TextureInfo, VisualError> {
        self.cache
            .load(&mut *self.backend, path)
            .map_err(|e| VisualError::resource("texture", e.to_string()))
    }
}
