//! A device-free [`GpuBackend`] that records every call.
//!
//! Handles are issued sequentially from one counter, so a handle of one kind
//! never collides with another. Buffer contents are kept so tests can decode
//! what a renderer uploaded. [`RecordingBackend::fail_next`] makes the next
//! matching creation call fail, for exercising error paths.

use std::collections::{HashMap, HashSet};

use glam::Vec4;
use lucent_visual::texture::TextureHandle;

use crate::backend::{
    BufferDesc, BufferHandle, BufferUsage, GpuBackend, InputElement, InputLayoutHandle,
    ShaderHandle, ShaderStage, Topology,
};
use crate::BackendError;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CompileShader {
        shader: ShaderHandle,
        entry_point: String,
        target: String,
    },
    CreateInputLayout {
        layout: InputLayoutHandle,
        elements: usize,
    },
    CreateBuffer {
        buffer: BufferHandle,
        desc: BufferDesc,
    },
    WriteBuffer {
        buffer: BufferHandle,
        bytes: usize,
    },
    UpdateBuffer {
        buffer: BufferHandle,
        bytes: usize,
    },
    ReleaseBuffer {
        buffer: BufferHandle,
    },
    CreateTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
    },
    ReleaseTexture {
        texture: TextureHandle,
    },
    BindShaders {
        vertex: ShaderHandle,
        pixel: ShaderHandle,
    },
    BindInputLayout {
        layout: InputLayoutHandle,
    },
    BindVertexBuffer {
        buffer: BufferHandle,
        stride: u32,
        offset: u32,
    },
    SetTopology(Topology),
    BindConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: BufferHandle,
    },
    BindShaderResource {
        slot: u32,
        texture: TextureHandle,
    },
    Clear(Vec4),
    Draw {
        vertex_count: u32,
        start_vertex: u32,
    },
    BeginOverlay,
    EndOverlay,
    Present {
        vsync: bool,
    },
}

/// Calls that [`RecordingBackend::fail_next`] can make fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    BufferCreation,
    ShaderCompilation,
    InputLayoutCreation,
    TextureCreation,
    BufferUpload,
    Present,
}

#[derive(Debug, Clone)]
struct BufferRecord {
    desc: BufferDesc,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<GpuCommand>,
    next_handle: u64,
    buffers: HashMap<BufferHandle, BufferRecord>,
    shaders: HashSet<ShaderHandle>,
    textures: HashMap<TextureHandle, (u32, u32)>,
    pending_failures: Vec<FailurePoint>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of the given kind fail. Queued failures are
    /// consumed in order of the calls that hit them.
    pub fn fail_next(&mut self, point: FailurePoint) {
        self.pending_failures.push(point);
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Drain the command log.
    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// `(vertex_count, start_vertex)` of every recorded draw.
    pub fn draws(&self) -> Vec<(u32, u32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::Draw {
                    vertex_count,
                    start_vertex,
                } => Some((*vertex_count, *start_vertex)),
                _ => None,
            })
            .collect()
    }

    /// Current contents of a live buffer.
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_desc(&self, buffer: BufferHandle) -> Option<BufferDesc> {
        self.buffers.get(&buffer).map(|b| b.desc)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(&texture).copied()
    }

    fn issue(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn take_failure(&mut self, point: FailurePoint) -> bool {
        match self.pending_failures.iter().position(|p| *p == point) {
            Some(i) => {
                self.pending_failures.remove(i);
                true
            }
            None => false,
        }
    }

    fn fill(&mut self, buffer: BufferHandle, data: &[u8], expected: BufferUsage) -> Result<(), BackendError> {
        if self.take_failure(FailurePoint::BufferUpload) {
            return Err(BackendError::ResourceCreation {
                resource: "buffer mapping".to_owned(),
                details: "injected failure".to_owned(),
            });
        }
        let record = self.buffers.get_mut(&buffer).ok_or(BackendError::InvalidHandle {
            kind: "buffer",
            handle: buffer.to_raw(),
        })?;
        if record.desc.usage != expected {
            return Err(BackendError::ResourceCreation {
                resource: "buffer mapping".to_owned(),
                details: format!("buffer usage is {:?}, not {expected:?}", record.desc.usage),
            });
        }
        if data.len() > record.desc.size {
            return Err(BackendError::ResourceCreation {
                resource: "buffer mapping".to_owned(),
                details: format!("{} bytes do not fit in {}", data.len(), record.desc.size),
            });
        }
        record.data[..data.len()].copy_from_slice(data);
        Ok(())
    }
}

fn injected(resource: &str) -> BackendError {
    BackendError::ResourceCreation {
        resource: resource.to_owned(),
        details: "injected failure".to_owned(),
    }
}

impl GpuBackend for RecordingBackend {
    fn compile_shader(
        &mut self,
        source: &str,
        entry_point: &str,
        target: &str,
        _stage: ShaderStage,
    ) -> Result<ShaderHandle, BackendError> {
        if self.take_failure(FailurePoint::ShaderCompilation) {
            return Err(injected("shader"));
        }
        if !source.contains(entry_point) {
            return Err(BackendError::ResourceCreation {
                resource: "shader".to_owned(),
                details: format!("entry point '{entry_point}' not found"),
            });
        }
        let shader = ShaderHandle::from_raw(self.issue());
        self.shaders.insert(shader);
        self.commands.push(GpuCommand::CompileShader {
            shader,
            entry_point: entry_point.to_owned(),
            target: target.to_owned(),
        });
        Ok(shader)
    }

    fn create_input_layout(
        &mut self,
        vertex_shader: ShaderHandle,
        elements: &[InputElement],
    ) -> Result<InputLayoutHandle, BackendError> {
        if self.take_failure(FailurePoint::InputLayoutCreation) {
            return Err(injected("input layout"));
        }
        if !self.shaders.contains(&vertex_shader) {
            return Err(BackendError::InvalidHandle {
                kind: "shader",
                handle: vertex_shader.to_raw(),
            });
        }
        let layout = InputLayoutHandle::from_raw(self.issue());
        self.commands.push(GpuCommand::CreateInputLayout {
            layout,
            elements: elements.len(),
        });
        Ok(layout)
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<BufferHandle, BackendError> {
        if self.take_failure(FailurePoint::BufferCreation) {
            return Err(injected("buffer"));
        }
        if desc.size == 0 {
            return Err(BackendError::ResourceCreation {
                resource: "buffer".to_owned(),
                details: "zero-sized buffer".to_owned(),
            });
        }
        let mut data = vec![0u8; desc.size];
        if let Some(initial) = initial_data {
            let n = initial.len().min(desc.size);
            data[..n].copy_from_slice(&initial[..n]);
        }
        let buffer = BufferHandle::from_raw(self.issue());
        self.buffers.insert(buffer, BufferRecord { desc: *desc, data });
        self.commands.push(GpuCommand::CreateBuffer { buffer, desc: *desc });
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError> {
        self.fill(buffer, data, BufferUsage::Dynamic)?;
        self.commands.push(GpuCommand::WriteBuffer {
            buffer,
            bytes: data.len(),
        });
        Ok(())
    }

    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), BackendError> {
        self.fill(buffer, data, BufferUsage::Default)?;
        self.commands.push(GpuCommand::UpdateBuffer {
            buffer,
            bytes: data.len(),
        });
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_none() {
            tracing::warn!(?buffer, "release of unknown buffer");
        }
        self.commands.push(GpuCommand::ReleaseBuffer { buffer });
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<TextureHandle, BackendError> {
        if self.take_failure(FailurePoint::TextureCreation) {
            return Err(injected("texture"));
        }
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(BackendError::ResourceCreation {
                resource: "texture".to_owned(),
                details: format!("{width}x{height} needs {expected} bytes, got {}", rgba.len()),
            });
        }
        let texture = TextureHandle::from_raw(self.issue());
        self.textures.insert(texture, (width, height));
        self.commands.push(GpuCommand::CreateTexture { texture, width, height });
        Ok(texture)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        self.commands.push(GpuCommand::ReleaseTexture { texture });
    }

    fn bind_shaders(&mut self, vertex: ShaderHandle, pixel: ShaderHandle) {
        self.commands.push(GpuCommand::BindShaders { vertex, pixel });
    }

    fn bind_input_layout(&mut self, layout: InputLayoutHandle) {
        self.commands.push(GpuCommand::BindInputLayout { layout });
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, stride: u32, offset: u32) {
        debug_assert!(self.buffers.contains_key(&buffer), "binding released buffer {buffer:?}");
        self.commands.push(GpuCommand::BindVertexBuffer { buffer, stride, offset });
    }

    fn set_topology(&mut self, topology: Topology) {
        self.commands.push(GpuCommand::SetTopology(topology));
    }

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle) {
        self.commands.push(GpuCommand::BindConstantBuffer { stage, slot, buffer });
    }

    fn bind_shader_resource(&mut self, slot: u32, texture: TextureHandle) {
        self.commands.push(GpuCommand::BindShaderResource { slot, texture });
    }

    fn clear(&mut self, color: Vec4) {
        self.commands.push(GpuCommand::Clear(color));
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.commands.push(GpuCommand::Draw {
            vertex_count,
            start_vertex,
        });
    }

    fn begin_overlay(&mut self) {
        self.commands.push(GpuCommand::BeginOverlay);
    }

    fn end_overlay(&mut self) -> Result<(), BackendError> {
        self.commands.push(GpuCommand::EndOverlay);
        Ok(())
    }

    fn present(&mut self, vsync: bool) -> Result<(), BackendError> {
        if self.take_failure(FailurePoint::Present) {
            return Err(BackendError::DeviceLost);
        }
        self.commands.push(GpuCommand::Present { vsync });
        Ok(())
    }
}
