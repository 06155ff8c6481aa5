//! Visual2D renderers.
//!
//! A renderer knows how to draw one family of visuals. The family is decided
//! by the visual's [`FeatureSet`]: every sprite feature combination the
//! component adders can produce is claimed by exactly one [`RendererKind`],
//! which [`validate_renderers`] checks at startup by enumerating all subsets
//! of the seven sprite component kinds.
//!
//! Drawing a visual is two calls. `setup` binds pipeline state (shaders,
//! input layout, vertex buffer, topology) and may be skipped when the
//! previous visual had the same feature set. `render` writes the per-visual
//! constants and issues the draw.

mod animated;
mod colored;
mod particles;
mod textured;
mod tiled;
mod widget;

pub use animated::AnimatedRenderer;
pub use colored::ColoredRenderer;
pub use particles::{generate_particles, ParticleVertex, ParticlesRenderer};
pub use textured::TexturedRenderer;
pub use tiled::{tile_vertices, TileVertex, TiledRenderer};
pub use widget::{TextDraw, WidgetRenderer};

use std::fmt;

use glam::{Vec2, Vec4};
use lucent_visual::component::{ComponentKind, CustomUv, FeatureSet};
use lucent_visual::handle::VisualId;
use lucent_visual::visual::Visual;
use lucent_visual::world::World;

use crate::backend::{
    BufferDesc, BufferHandle, BufferUsage, GpuBackend, InputElement, InputLayoutHandle, ShaderHandle,
    Topology, VertexFormat,
};
use crate::constants::ConstantBuffers;
use crate::math::quad_transform;
use crate::shaders::{self, ShaderLibrary};
use crate::{RenderError, ResultExt};

// ---------------------------------------------------------------------------
// RendererKind
// ---------------------------------------------------------------------------

/// The closed set of renderer families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RendererKind {
    Colored,
    Textured,
    Animated,
    Tiled,
    Particles,
    Widget,
}

impl RendererKind {
    /// Every sprite renderer, in dispatch order.
    pub const SPRITE: [RendererKind; 5] = [
        Self::Colored,
        Self::Textured,
        Self::Animated,
        Self::Tiled,
        Self::Particles,
    ];

    /// Whether this family draws a sprite with `features`.
    ///
    /// Widgets never match; they go through the widget pass.
    pub fn supports(self, features: FeatureSet) -> bool {
        let texture = features.contains(ComponentKind::Texture);
        let animation = features.contains(ComponentKind::FrameAnimation);
        let tiled = features.contains(ComponentKind::Tiled);
        let particles = features.contains(ComponentKind::Particles);
        match self {
            Self::Colored => !texture,
            Self::Textured => texture && !animation && !tiled && !particles,
            Self::Animated => texture && animation && !tiled,
            Self::Tiled => texture && tiled,
            Self::Particles => texture && particles && !animation && !tiled,
            Self::Widget => false,
        }
    }

    pub fn shader_name(self) -> &'static str {
        match self {
            Self::Colored => shaders::COLORED_SPRITE,
            Self::Textured => shaders::TEXTURED_SPRITE,
            Self::Animated => shaders::ANIMATED_SPRITE,
            Self::Tiled => shaders::TILED_SPRITE,
            Self::Particles => shaders::BASIC_PARTICLES,
            Self::Widget => shaders::WIDGET,
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Colored => "colored",
            Self::Textured => "textured",
            Self::Animated => "animated",
            Self::Tiled => "tiled",
            Self::Particles => "particles",
            Self::Widget => "widget",
        };
        f.write_str(name)
    }
}

/// Whether the component adders can produce `features`: frame animation,
/// tiled maps and particles are only accepted on a textured visual.
pub fn is_reachable(features: FeatureSet) -> bool {
    features.contains(ComponentKind::Texture)
        || ![ComponentKind::FrameAnimation, ComponentKind::Tiled, ComponentKind::Particles]
            .into_iter()
            .any(|kind| features.contains(kind))
}

/// Check that `kinds` claim every reachable sprite feature combination
/// exactly once and no combination more than once.
pub fn validate_renderers(kinds: &[RendererKind]) -> Result<(), RenderError> {
    let sprite_kinds = ComponentKind::SPRITE_KINDS;
    for mask in 0u32..(1 << sprite_kinds.len()) {
        let features: FeatureSet = sprite_kinds
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, kind)| *kind)
            .collect();
        let claimed: Vec<RendererKind> = kinds.iter().copied().filter(|k| k.supports(features)).collect();
        match claimed.len() {
            0 if is_reachable(features) => return Err(RenderError::MissingCapability { features }),
            0 | 1 => {}
            _ => {
                let renderers = claimed.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                return Err(RenderError::AmbiguousCapability { features, renderers });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Compiled shaders plus the input layout created against the vertex shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    pub vertex: ShaderHandle,
    pub pixel: ShaderHandle,
    pub layout: InputLayoutHandle,
}

impl Pipeline {
    pub fn compile<B: GpuBackend>(
        backend: &mut B,
        library: &ShaderLibrary,
        name: &str,
        elements: &[InputElement],
    ) -> Result<Self, RenderError> {
        let (vertex, pixel) = library.compile(backend, name)?;
        let layout = backend
            .create_input_layout(vertex, elements)
            .context(format!("Pipeline::compile({name})"))?;
        Ok(Self { vertex, pixel, layout })
    }

    pub fn bind<B: GpuBackend>(&self, backend: &mut B) {
        backend.bind_shaders(self.vertex, self.pixel);
        backend.bind_input_layout(self.layout);
    }
}

// ---------------------------------------------------------------------------
// Shared quad
// ---------------------------------------------------------------------------

/// Unit quad corner. `index` selects the per-corner color and UV.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 3],
    pub index: u32,
}

/// Triangle-strip order; corner indices are left-top, right-top,
/// right-bottom, left-bottom.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [0.5, 0.5, 0.0], index: 1 },
    QuadVertex { pos: [0.5, -0.5, 0.0], index: 2 },
    QuadVertex { pos: [-0.5, 0.5, 0.0], index: 0 },
    QuadVertex { pos: [-0.5, -0.5, 0.0], index: 3 },
];

pub const QUAD_LAYOUT: [InputElement; 2] = [
    InputElement::new("POSITION", VertexFormat::Float32x3, 0),
    InputElement::new("INDEX", VertexFormat::Uint32, 12),
];

const QUAD_STRIDE: u32 = std::mem::size_of::<QuadVertex>() as u32;

/// The immutable unit quad shared by every quad renderer.
#[derive(Debug, Clone, Copy)]
pub struct QuadBuffer {
    pub buffer: BufferHandle,
}

impl QuadBuffer {
    pub fn new<B: GpuBackend>(backend: &mut B) -> Result<Self, RenderError> {
        let bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        let buffer = backend
            .create_buffer(&BufferDesc::vertex(bytes.len(), BufferUsage::Immutable), Some(bytes))
            .context("QuadBuffer::new")?;
        Ok(Self { buffer })
    }

    pub fn bind<B: GpuBackend>(&self, backend: &mut B) {
        backend.bind_vertex_buffer(self.buffer, QUAD_STRIDE, 0);
        backend.set_topology(Topology::TriangleStrip);
    }

    pub fn release<B: GpuBackend>(&self, backend: &mut B) {
        backend.release_buffer(self.buffer);
    }
}

// ---------------------------------------------------------------------------
// Renderer trait
// ---------------------------------------------------------------------------

/// What a renderer may touch while drawing one visual.
pub struct RenderContext<'a, B: GpuBackend> {
    pub backend: &'a mut B,
    pub buffers: &'a ConstantBuffers,
    pub quad: &'a QuadBuffer,
    pub world_scale: Vec2,
    /// Seconds since the frame loop started.
    pub game_time: f64,
}

pub trait Visual2DRenderer<B: GpuBackend> {
    fn kind(&self) -> RendererKind;

    fn supports(&self, features: FeatureSet) -> bool {
        self.kind().supports(features)
    }

    /// Bind pipeline state for `visual`.
    ///
    /// Returns `true` when the bindings are specific to this visual, in which
    /// case the next visual must set up again whatever its features.
    fn setup(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<bool, RenderError>;

    /// Write per-visual constants and draw. Returns the vertex count.
    fn render(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<u32, RenderError>;

    /// Drop cached geometry for `id`.
    fn evict(&mut self, _backend: &mut B, _id: VisualId) -> bool {
        false
    }

    /// Drop cached geometry whose visual is gone from `world` or whose
    /// source component is no longer attached. Returns how many entries
    /// were dropped.
    fn evict_detached(&mut self, _backend: &mut B, _world: &World) -> usize {
        0
    }

    fn has_cached(&self, _id: VisualId) -> bool {
        false
    }

    fn cache_len(&self) -> usize {
        0
    }

    /// Release every GPU resource the renderer owns.
    fn release(&mut self, _backend: &mut B) {}
}

/// Build the renderer for a sprite `kind`.
pub fn build_sprite_renderer<B: GpuBackend>(
    kind: RendererKind,
    backend: &mut B,
    library: &ShaderLibrary,
    particle_seed: u64,
) -> Result<Box<dyn Visual2DRenderer<B>>, RenderError> {
    let renderer: Box<dyn Visual2DRenderer<B>> = match kind {
        RendererKind::Colored => Box::new(ColoredRenderer::new(backend, library)?),
        RendererKind::Textured => Box::new(TexturedRenderer::new(backend, library)?),
        RendererKind::Animated => Box::new(AnimatedRenderer::new(backend, library)?),
        RendererKind::Tiled => Box::new(TiledRenderer::new(backend, library)?),
        RendererKind::Particles => Box::new(ParticlesRenderer::new(backend, library, particle_seed)?),
        RendererKind::Widget => {
            return Err(RenderError::Config {
                details: "the widget renderer cannot be registered as a sprite renderer".to_owned(),
            })
        }
    };
    tracing::debug!(%kind, "renderer created");
    Ok(renderer)
}

// ---------------------------------------------------------------------------
// Shared per-visual state
// ---------------------------------------------------------------------------

/// Vertex colors, else tint, else opaque white.
pub(crate) fn sprite_colors(visual: &Visual) -> [Vec4; 4] {
    if let Some(colors) = visual.vertex_colors() {
        colors.data()
    } else if let Some(tint) = visual.tint() {
        tint.data()
    } else {
        [Vec4::ONE; 4]
    }
}

pub(crate) fn sprite_uvs(visual: &Visual) -> [Vec4; 4] {
    visual.custom_uv().copied().unwrap_or_default().data()
}

pub(crate) fn bind_texture<B: GpuBackend>(visual: &Visual, ctx: &mut RenderContext<'_, B>) {
    if let Some(handle) = visual.texture().and_then(|t| t.handle) {
        ctx.backend.bind_shader_resource(0, handle);
    }
}

/// Write the quad transform for `visual` and draw the unit quad.
pub(crate) fn draw_quad<B: GpuBackend>(visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<u32, RenderError> {
    let transform = quad_transform(visual.pos(), visual.size(), visual.rot_z(), ctx.world_scale);
    ctx.buffers.write_transform(ctx.backend, transform)?;
    ctx.backend.draw(QUAD_VERTICES.len() as u32, 0);
    tracing::trace!(visual = %visual.id(), "quad drawn");
    Ok(QUAD_VERTICES.len() as u32)
}

/// Default UV corners, used when neither a custom UV nor a widget atlas
/// provides any.
pub(crate) fn default_uvs() -> [Vec4; 4] {
    CustomUv::default().data()
}

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Mat4;

    use super::*;
    use crate::headless::RecordingBackend;

    /// Backend, constant buffers and quad ready for a renderer under test.
    pub struct Rig {
        pub gpu: RecordingBackend,
        pub buffers: ConstantBuffers,
        pub quad: QuadBuffer,
        pub library: ShaderLibrary,
    }

    impl Rig {
        pub fn new() -> Self {
            let mut gpu = RecordingBackend::new();
            let buffers = ConstantBuffers::new(&mut gpu, 800, 600, Mat4::IDENTITY).unwrap();
            let quad = QuadBuffer::new(&mut gpu).unwrap();
            Self {
                gpu,
                buffers,
                quad,
                library: ShaderLibrary::with_placeholders(),
            }
        }

        pub fn ctx(&mut self, game_time: f64) -> RenderContext<'_, RecordingBackend> {
            RenderContext {
                backend: &mut self.gpu,
                buffers: &self.buffers,
                quad: &self.quad,
                world_scale: Vec2::ONE,
                game_time,
            }
        }
    }
}
