//! The texture-loading seam between visuals and the GPU.
//!
//! Components never talk to a GPU device. A texture component asks a
//! [`TextureLoader`] for a texture by path during `init` and records whatever
//! handle and pixel size come back; every later UV computation reads that
//! size. The render crate provides the GPU-backed loader; [`InMemoryTextures`]
//! serves tools and tests that have no device.

use std::collections::HashMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::VisualError;

/// Opaque handle to a loaded texture (its shader-resource view on the GPU).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(u64);

impl TextureHandle {
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureHandle({})", self.0)
    }
}

/// What a loader reports for a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureInfo {
    pub handle: TextureHandle,
    /// Size in pixels.
    pub size: Vec2,
}

/// Resolves texture paths to loaded textures.
///
/// Implementations are expected to memoize by path: loading the same path
/// twice returns the same handle.
pub trait TextureLoader {
    fn load_texture(&mut self, path: &str) -> Result<TextureInfo, VisualError>;
}

// ---------------------------------------------------------------------------
// InMemoryTextures
// ---------------------------------------------------------------------------

/// A device-free loader backed by a table of known texture sizes.
#[derive(Debug, Default)]
pub struct InMemoryTextures {
    entries: HashMap<String, TextureInfo>,
    next_handle: u64,
}

impl InMemoryTextures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture of the given pixel size under `path`.
    pub fn insert(&mut self, path: impl Into<String>, size: Vec2) -> TextureHandle {
        self.next_handle += 1;
        let handle = TextureHandle::from_raw(self.next_handle);
        self.entries.insert(path.into(), TextureInfo { handle, size });
        handle
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TextureLoader for InMemoryTextures {
    fn load_texture(&mut self, path: &str) -> Result<TextureInfo, VisualError> {
        self.entries
            .get(path)
            .copied()
            .ok_or_else(|| VisualError::resource("texture", format!("no texture named '{path}'")))
    }
}
