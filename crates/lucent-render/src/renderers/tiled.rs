//! Tile maps drawn from a texture atlas.
//!
//! The tile quads built when the tiled component was attached are expanded
//! into a triangle list and uploaded once per visual. The map is drawn
//! unrotated, scaled by the component's tile scale.

use lucent_visual::component::{ComponentId, ComponentKind, Tiled};
use lucent_visual::handle::VisualId;
use lucent_visual::visual::Visual;
use lucent_visual::world::World;
use lucent_visual::VisualError;

use super::{bind_texture, Pipeline, RenderContext, RendererKind, Visual2DRenderer};
use crate::backend::{GpuBackend, InputElement, Topology, VertexFormat};
use crate::geometry::GeometryCache;
use crate::math::{scaled_pos, transform_matrix};
use crate::shaders::ShaderLibrary;
use crate::{RenderError, ResultExt};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct TileVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

pub const TILE_LAYOUT: [InputElement; 2] = [
    InputElement::new("POSITION", VertexFormat::Float32x3, 0),
    InputElement::new("TEXCOORD", VertexFormat::Float32x2, 12),
];

/// Two triangles per tile quad.
pub fn tile_vertices(tiled: &Tiled) -> Vec<TileVertex> {
    tiled
        .tiles
        .iter()
        .flat_map(|quad| quad.triangles())
        .map(|(pos, uv)| TileVertex {
            pos: pos.to_array(),
            uv: uv.to_array(),
        })
        .collect()
}

#[derive(Debug)]
pub struct TiledRenderer {
    pipeline: Pipeline,
    cache: GeometryCache,
}

fn tiled_component(visual: &Visual) -> Result<(ComponentId, &Tiled), RenderError> {
    match (visual.get(ComponentKind::Tiled), visual.tiled()) {
        (Some(component), Some(tiled)) => Ok((component.id(), tiled)),
        _ => Err(VisualError::invalid(format!("visual {} has no tiled component", visual.id())).into()),
    }
}

impl TiledRenderer {
    pub fn new<B: GpuBackend>(backend: &mut B, library: &ShaderLibrary) -> Result<Self, RenderError> {
        let pipeline = Pipeline::compile(backend, library, RendererKind::Tiled.shader_name(), &TILE_LAYOUT)
            .context("TiledRenderer::new")?;
        Ok(Self {
            pipeline,
            cache: GeometryCache::new(),
        })
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }
}

impl<B: GpuBackend> Visual2DRenderer<B> for TiledRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Tiled
    }

    fn setup(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<bool, RenderError> {
        let (source, tiled) = tiled_component(visual)?;
        self.pipeline.bind(ctx.backend);
        // A map whose layers are all empty has nothing to upload.
        if !tiled.tiles.is_empty() {
            let entry = self
                .cache
                .get_or_upload(ctx.backend, visual.id(), source, ctx.game_time, || tile_vertices(tiled))
                .context("TiledRenderer::setup")?;
            ctx.backend.bind_vertex_buffer(entry.buffer, entry.stride, 0);
        }
        ctx.backend.set_topology(Topology::TriangleList);
        Ok(true)
    }

    fn render(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<u32, RenderError> {
        let (source, tiled) = tiled_component(visual)?;
        if tiled.tiles.is_empty() {
            return Ok(0);
        }
        let entry = *self
            .cache
            .get(visual.id(), source)
            .ok_or_else(|| RenderError::MissingGeometry { id: visual.id() })?;

        bind_texture(visual, ctx);
        let transform = transform_matrix(
            scaled_pos(visual.pos(), ctx.world_scale),
            tiled.scale * ctx.world_scale,
            0.0,
            false,
        );
        ctx.buffers.write_transform(ctx.backend, transform)?;
        ctx.backend.draw(entry.vertex_count, 0);
        tracing::trace!(visual = %visual.id(), vertices = entry.vertex_count, "tiles drawn");
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
