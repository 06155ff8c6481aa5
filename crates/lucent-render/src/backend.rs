//! The opaque GPU backend.
//!
//! The render system never talks to a graphics API directly. Everything it
//! needs (compile a shader, create and fill buffers, bind state, draw) goes
//! through [`GpuBackend`]. A real implementation wraps a device and its
//! immediate context; [`RecordingBackend`](crate::headless::RecordingBackend)
//! records the calls instead.
//!
//! Binding and drawing are infallible: a device accepts any handle it issued,
//! and stale handles are a programming error that the recording backend
//! catches in tests. Creation and upload calls return [`BackendError`].

use std::fmt;

use bitflags::bitflags;
use glam::Vec4;
use lucent_visual::texture::TextureHandle;

use crate::BackendError;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            #[inline]
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            #[inline]
            pub fn to_raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

gpu_handle!(
    /// A vertex or constant buffer.
    BufferHandle,
    "Buffer"
);
gpu_handle!(
    /// A compiled vertex or pixel shader.
    ShaderHandle,
    "Shader"
);
gpu_handle!(
    /// A vertex input layout validated against a vertex shader.
    InputLayoutHandle,
    "InputLayout"
);

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

bitflags! {
    /// Pipeline stages a buffer may be bound to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BindFlags: u8 {
        const VERTEX_BUFFER   = 0b0001;
        const INDEX_BUFFER    = 0b0010;
        const CONSTANT_BUFFER = 0b0100;
        const SHADER_RESOURCE = 0b1000;
    }
}

/// How the CPU updates a buffer after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// GPU-resident, updated with [`GpuBackend::update_buffer`].
    Default,
    /// CPU-writable, filled with [`GpuBackend::write_buffer`].
    Dynamic,
    /// Never changes after creation.
    Immutable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: usize,
    pub bind: BindFlags,
    pub usage: BufferUsage,
}

impl BufferDesc {
    pub fn constant(size: usize) -> Self {
        Self {
            size,
            bind: BindFlags::CONSTANT_BUFFER,
            usage: BufferUsage::Default,
        }
    }

    pub fn vertex(size: usize, usage: BufferUsage) -> Self {
        Self {
            size,
            bind: BindFlags::VERTEX_BUFFER,
            usage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    TriangleStrip,
    TriangleList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Sint32,
}

impl VertexFormat {
    pub fn size(self) -> u32 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
            Self::Uint32 | Self::Sint32 => 4,
        }
    }
}

/// One attribute of a vertex input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputElement {
    pub semantic: &'static str,
    pub semantic_index: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

impl InputElement {
    pub const fn new(semantic: &'static str, format: VertexFormat, offset: u32) -> Self {
        Self {
            semantic,
            semantic_index: 0,
            format,
            offset,
        }
    }
}

// ---------------------------------------------------------------------------
// GpuBackend
// ---------------------------------------------------------------------------

/// The device operations the render system consumes.
pub trait GpuBackend {
    /// Compile `entry_point` of `source` for the given profile, e.g. `vs_4_0`.
    fn compile_shader(
        &mut self,
        source: &str,
        entry_point: &str,
        target: &str,
        stage: ShaderStage,
    ) -> Result<ShaderHandle, BackendError>;

    fn create_input_layout(
        &mut self,
        vertex_shader: ShaderHandle,
        elements: &[InputElement],
    ) -> Result<InputLayoutHandle, BackendError>;

    /// Create a buffer, optionally filled with `initial_data`.
    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError>;

    /// Map a dynamic buffer with discard, copy `data` in, unmap.
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError>;

    /// Replace the contents of a default-usage buffer.
    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError>;

    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Create a shader-resource view over tightly packed RGBA8 pixels.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureHandle, BackendError>;

    fn release_texture(&mut self, texture: TextureHandle);

    fn bind_shaders(&mut self, vertex: ShaderHandle, pixel: ShaderHandle);

    fn bind_input_layout(&mut self, layout: InputLayoutHandle);

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, stride: u32, offset: u32);

    fn set_topology(&mut self, topology: Topology);

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle);

    fn bind_shader_resource(&mut self, slot: u32, texture: TextureHandle);

    fn clear(&mut self, color: Vec4);

    fn draw(&mut self, vertex_count: u32, start_vertex: u32);

    /// Start the overlay pass that widgets and text draw into.
    fn begin_overlay(&mut self);

    /// Finish the overlay pass. Fails if the overlay target was lost.
    fn end_overlay(&mut self) -> Result<(), BackendError>;

    fn present(&mut self, vsync: bool) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_debug_with_their_kind() {
        assert_eq!(format!("{:?}", BufferHandle::from_raw(3)), "Buffer(3)");
        assert_eq!(format!("{:?}", ShaderHandle::from_raw(9)), "Shader(9)");
    }

    #[test]
    fn constant_desc_binds_as_constant_buffer() {
        let desc = BufferDesc::constant(64);
        assert!(desc.bind.contains(BindFlags::CONSTANT_BUFFER));
        assert!(!desc.bind.contains(BindFlags::VERTEX_BUFFER));
        assert_eq!(desc.usage, BufferUsage::Default);
    }
}
