//! Shader constant buffers shared by every renderer.
//!
//! Seven buffers are created once and bound to fixed vertex-shader slots:
//! projection, view, transform, colors, custom UV, frame animation and
//! settings. Renderers only overwrite their contents per visual.

use glam::{Mat4, Vec4};
use lucent_visual::component::CustomUv;

use crate::backend::{BufferDesc, BufferHandle, GpuBackend, ShaderStage};
use crate::math::{ortho_projection, to_columns};
use crate::{RenderError, ResultExt};

pub const SLOT_PROJECTION: u32 = 0;
pub const SLOT_VIEW: u32 = 1;
pub const SLOT_TRANSFORM: u32 = 2;
pub const SLOT_COLORS: u32 = 3;
pub const SLOT_CUSTOM_UV: u32 = 4;
pub const SLOT_FRAME_ANIM: u32 = 5;
pub const SLOT_SETTINGS: u32 = 6;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct MatrixData {
    pub mat: [[f32; 4]; 4],
}

impl From<Mat4> for MatrixData {
    fn from(m: Mat4) -> Self {
        Self { mat: to_columns(m) }
    }
}

/// Four corner values: colors or UVs widened to vec4.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct CornersData {
    pub corners: [[f32; 4]; 4],
}

impl From<[Vec4; 4]> for CornersData {
    fn from(v: [Vec4; 4]) -> Self {
        Self {
            corners: v.map(|c| c.to_array()),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct Vec4Data {
    pub value: [f32; 4],
}

impl From<Vec4> for Vec4Data {
    fn from(v: Vec4) -> Self {
        Self { value: v.to_array() }
    }
}

/// Frame rect when no animation is bound: the whole texture.
pub const FULL_FRAME: Vec4 = Vec4::new(1.0, 1.0, 0.0, 0.0);

/// Handles of the shared constant buffers.
#[derive(Debug, Clone)]
pub struct ConstantBuffers {
    pub projection: BufferHandle,
    pub view: BufferHandle,
    pub transform: BufferHandle,
    pub colors: BufferHandle,
    pub custom_uv: BufferHandle,
    pub frame_anim: BufferHandle,
    pub settings: BufferHandle,
}

fn create<B: GpuBackend, T: bytemuck::Pod>(backend: &mut B, initial: T) -> Result<BufferHandle, RenderError> {
    let bytes = bytemuck::bytes_of(&initial);
    Ok(backend.create_buffer(&BufferDesc::constant(bytes.len()), Some(bytes))?)
}

impl ConstantBuffers {
    /// Create every buffer with its default contents and bind them.
    pub fn new<B: GpuBackend>(backend: &mut B, width: u32, height: u32, view: Mat4) -> Result<Self, RenderError> {
        let build = |backend: &mut B| -> Result<Self, RenderError> {
            Ok(Self {
                projection: create(backend, MatrixData::from(ortho_projection(width as f32, height as f32)))?,
                view: create(backend, MatrixData::from(view))?,
                transform: create(backend, MatrixData::from(Mat4::IDENTITY))?,
                colors: create(backend, CornersData::from([Vec4::ONE; 4]))?,
                custom_uv: create(backend, CornersData::from(CustomUv::default().data()))?,
                frame_anim: create(backend, Vec4Data::from(FULL_FRAME))?,
                settings: create(backend, Vec4Data::from(Vec4::ONE))?,
            })
        };
        let buffers = build(backend).context("ConstantBuffers::new")?;
        buffers.bind(backend);
        Ok(buffers)
    }

    /// Bind every buffer to its vertex-shader slot.
    pub fn bind<B: GpuBackend>(&self, backend: &mut B) {
        for (slot, buffer) in [
            (SLOT_PROJECTION, self.projection),
            (SLOT_VIEW, self.view),
            (SLOT_TRANSFORM, self.transform),
            (SLOT_COLORS, self.colors),
            (SLOT_CUSTOM_UV, self.custom_uv),
            (SLOT_FRAME_ANIM, self.frame_anim),
            (SLOT_SETTINGS, self.settings),
        ] {
            backend.bind_constant_buffer(ShaderStage::Vertex, slot, buffer);
        }
    }

    pub fn write_projection<B: GpuBackend>(&self, backend: &mut B, m: Mat4) -> Result<(), RenderError> {
        upload(backend, self.projection, MatrixData::from(m))
    }

    pub fn write_view<B: GpuBackend>(&self, backend: &mut B, m: Mat4) -> Result<(), RenderError> {
        upload(backend, self.view, MatrixData::from(m))
    }

    pub fn write_transform<B: GpuBackend>(&self, backend: &mut B, m: Mat4) -> Result<(), RenderError> {
        upload(backend, self.transform, MatrixData::from(m))
    }

    pub fn write_colors<B: GpuBackend>(&self, backend: &mut B, colors: [Vec4; 4]) -> Result<(), RenderError> {
        upload(backend, self.colors, CornersData::from(colors))
    }

    pub fn write_custom_uv<B: GpuBackend>(&self, backend: &mut B, uvs: [Vec4; 4]) -> Result<(), RenderError> {
        upload(backend, self.custom_uv, CornersData::from(uvs))
    }

    pub fn write_frame_anim<B: GpuBackend>(&self, backend: &mut B, data: Vec4) -> Result<(), RenderError> {
        upload(backend, self.frame_anim, Vec4Data::from(data))
    }

    /// Global tint applied on top of every visual.
    pub fn write_settings<B: GpuBackend>(&self, backend: &mut B, world_tint: Vec4) -> Result<(), RenderError> {
        upload(backend, self.settings, Vec4Data::from(world_tint))
    }

    pub fn release<B: GpuBackend>(&self, backend: &mut B) {
        for buffer in [
            self.projection,
            self.view,
            self.transform,
            self.colors,
            self.custom_uv,
            self.frame_anim,
            self.settings,
        ] {
            backend.release_buffer(buffer);
        }
    }
}

fn upload<B: GpuBackend, T: bytemuck::Pod>(backend: &mut B, buffer: BufferHandle, data: T) -> Result<(), RenderError> {
    Ok(backend.update_buffer(buffer, bytemuck::bytes_of(&data))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{FailurePoint, GpuCommand, RecordingBackend};

    #[test]
    fn buffers_start_with_defaults_and_are_bound_to_slots() {
        let mut gpu = RecordingBackend::new();
        let buffers = ConstantBuffers::new(&mut gpu, 800, 600, Mat4::IDENTITY).unwrap();

        let colors: CornersData = bytemuck::pod_read_unaligned(gpu.buffer_data(buffers.colors).unwrap());
        assert_eq!(colors.corners, [[1.0; 4]; 4]);
        let anim: Vec4Data = bytemuck::pod_read_unaligned(gpu.buffer_data(buffers.frame_anim).unwrap());
        assert_eq!(anim.value, [1.0, 1.0, 0.0, 0.0]);

        let slots: Vec<u32> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                GpuCommand::BindConstantBuffer { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(slots, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn creation_failure_names_the_call_site() {
        let mut gpu = RecordingBackend::new();
        gpu.fail_next(FailurePoint::BufferCreation);
        let err = ConstantBuffers::new(&mut gpu, 800, 600, Mat4::IDENTITY).unwrap_err();
        assert!(err.to_string().ends_with("> ConstantBuffers::new"));
    }

    #[test]
    fn write_transform_replaces_contents() {
        let mut gpu = RecordingBackend::new();
        let buffers = ConstantBuffers::new(&mut gpu, 800, 600, Mat4::IDENTITY).unwrap();
        let m = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        buffers.write_transform(&mut gpu, m).unwrap();
        let data: MatrixData = bytemuck::pod_read_unaligned(gpu.buffer_data(buffers.transform).unwrap());
        assert_eq!(data.mat[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
