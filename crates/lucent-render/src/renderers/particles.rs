//! Basic particle emitters.
//!
//! Particles are placed at random inside the visual's rectangle once, when
//! the emitter is first set up, and never move on the CPU afterwards. The
//! vertex shader animates them from the per-vertex spawn time and the
//! elapsed time since the buffer was created.

use glam::{Vec2, Vec4};
use lucent_visual::component::{ComponentId, ComponentKind, Particles};
use lucent_visual::handle::VisualId;
use lucent_visual::visual::Visual;
use lucent_visual::world::World;
use lucent_visual::VisualError;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::{bind_texture, Pipeline, RenderContext, RendererKind, Visual2DRenderer};
use crate::backend::{GpuBackend, InputElement, Topology, VertexFormat};
use crate::geometry::GeometryCache;
use crate::math::{scaled_pos, transform_matrix};
use crate::shaders::ShaderLibrary;
use crate::{RenderError, ResultExt};

/// One particle corner.
///
/// `pos.w` is the particle's start time within its lifetime; `uv.zw` carry
/// the fade-in and fade-out rates. `id` picks one of four motion patterns.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct ParticleVertex {
    pub pos: [f32; 4],
    pub uv: [f32; 4],
    pub id: u32,
}

pub const PARTICLE_LAYOUT: [InputElement; 3] = [
    InputElement::new("POSITION", VertexFormat::Float32x4, 0),
    InputElement {
        semantic_index: 1,
        ..InputElement::new("POSITION", VertexFormat::Float32x4, 16)
    },
    InputElement::new("BLENDINDICES", VertexFormat::Uint32, 32),
];

/// Gap kept between particles and the visual's edges, in pixels.
const EDGE_OFFSET: f32 = 1.0;

/// Place `particles.count` particles inside a visual of `visual_size`,
/// six vertices each.
pub fn generate_particles(rng: &mut Pcg32, particles: &Particles, visual_size: Vec2) -> Vec<ParticleVertex> {
    let settings = &particles.settings;
    let frame = settings.frame_size;
    let half = frame / 2.0;
    let origin = visual_size / -2.0;
    let min = half + EDGE_OFFSET;
    let max = visual_size - half - 2.0 * EDGE_OFFSET;
    let range = max - min;

    let texture = particles.texture_size();
    let (columns, rows) = particles.atlas_grid();
    let columns = u64::from(columns);
    let frames = columns * u64::from(rows);
    let uv_size = if texture.x > 0.0 && texture.y > 0.0 {
        frame / texture
    } else {
        Vec2::ONE
    };

    let count = particles.count as usize;
    let mut vertices = Vec::with_capacity(count * 6);
    for i in 0..count {
        let x = origin.x + min.x + rng.gen::<f32>() * range.x;
        let y = origin.y + min.y + rng.gen::<f32>() * range.y;
        let z = -0.01 * count as f32 + 0.01 * i as f32;

        let id = rng.gen_range(0..=3u32);
        let tile = rng.gen_range(0..frames);
        let time = rng.gen::<f32>() * settings.lifetime;

        let pos = [
            Vec4::new(x - half.x, y - half.y, z, time),
            Vec4::new(x + half.x, y + half.y, z, time),
            Vec4::new(x + half.x, y - half.y, z, time),
            Vec4::new(x - half.x, y + half.y, z, time),
        ];

        let offset = Vec2::new((tile % columns) as f32, (tile / columns) as f32) * uv_size;
        let (fade_in, fade_out) = (settings.fade_in_rate, settings.fade_out_rate);
        let uv = [
            Vec4::new(offset.x, offset.y, fade_in, fade_out),
            Vec4::new(offset.x + uv_size.x, offset.y + uv_size.y, fade_in, fade_out),
            Vec4::new(offset.x + uv_size.x, offset.y, fade_in, fade_out),
            Vec4::new(offset.x, offset.y + uv_size.y, fade_in, fade_out),
        ];

        for corner in [0, 1, 2, 0, 3, 1] {
            vertices.push(ParticleVertex {
                pos: pos[corner].to_array(),
                uv: uv[corner].to_array(),
                id,
            });
        }
    }
    vertices
}

#[derive(Debug)]
pub struct ParticlesRenderer {
    pipeline: Pipeline,
    cache: GeometryCache,
    rng: Pcg32,
}

fn particles_component(visual: &Visual) -> Result<(ComponentId, &Particles), RenderError> {
    match (visual.get(ComponentKind::Particles), visual.particles()) {
        (Some(component), Some(particles)) => Ok((component.id(), particles)),
        _ => Err(VisualError::invalid(format!("visual {} has no particles component", visual.id())).into()),
    }
}

impl ParticlesRenderer {
    pub fn new<B: GpuBackend>(backend: &mut B, library: &ShaderLibrary, seed: u64) -> Result<Self, RenderError> {
        let pipeline = Pipeline::compile(backend, library, RendererKind::Particles.shader_name(), &PARTICLE_LAYOUT)
            .context("ParticlesRenderer::new")?;
        Ok(Self {
            pipeline,
            cache: GeometryCache::new(),
            rng: Pcg32::seed_from_u64(seed),
        })
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }
}

impl<B: GpuBackend> Visual2DRenderer<B> for ParticlesRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Particles
    }

    fn setup(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<bool, RenderError> {
        let (source, particles) = particles_component(visual)?;
        let rng = &mut self.rng;
        let entry = self
            .cache
            .get_or_upload(ctx.backend, visual.id(), source, ctx.game_time, || {
                generate_particles(rng, particles, visual.size())
            })
            .context("ParticlesRenderer::setup")?;

        self.pipeline.bind(ctx.backend);
        ctx.backend.bind_vertex_buffer(entry.buffer, entry.stride, 0);
        ctx.backend.set_topology(Topology::TriangleList);
        Ok(true)
    }

    fn render(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<u32, RenderError> {
        let (source, particles) = particles_component(visual)?;
        let entry = *self
            .cache
            .get(visual.id(), source)
            .ok_or_else(|| RenderError::MissingGeometry { id: visual.id() })?;

        let settings = &particles.settings;
        let elapsed = (ctx.game_time - entry.created_at) as f32;
        let anim = Vec4::new(settings.speed, settings.lifetime, settings.movement_radius, elapsed);
        ctx.buffers.write_frame_anim(ctx.backend, anim)?;
        bind_texture(visual, ctx);

        let transform = transform_matrix(scaled_pos(visual.pos(), ctx.world_scale), ctx.world_scale, 0.0, false);
        ctx.buffers.write_transform(ctx.backend, transform)?;
        ctx.backend.draw(entry.vertex_count, 0);
        tracing::trace!(visual = %visual.id(), vertices = entry.vertex_count, elapsed, "particles drawn");
        Ok(entry.vertex_count)
    }

    fn evict(&mut self, backend: &mut B, id: VisualId) -> bool {
        self.cache.evict(backend, id)
    }

    fn evict_detached(&mut self, backend: &mut B, world: &World) -> usize {
        self.cache
            .retain(backend, |id, source| world.get(id).is_some_and(|v| v.holds(source)))
    }

    fn has_cached(&self, id: VisualId) -> bool {
        self.cache.contains(id)
    }

    fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn release(&mut self, backend: &mut B) {
        self.cache.release_all(backend);
    }
}
