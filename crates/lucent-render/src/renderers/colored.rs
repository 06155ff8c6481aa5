//! Untextured quads colored by tint or per-corner vertex colors.

use lucent_visual::visual::Visual;

use super::{draw_quad, sprite_colors, Pipeline, RenderContext, RendererKind, Visual2DRenderer, QUAD_LAYOUT};
use crate::backend::GpuBackend;
use crate::shaders::ShaderLibrary;
use crate::{RenderError, ResultExt};

#[derive(Debug)]
pub struct ColoredRenderer {
    pipeline: Pipeline,
}

impl ColoredRenderer {
    pub fn new<B: GpuBackend>(backend: &mut B, library: &ShaderLibrary) -> Result<Self, RenderError> {
        let pipeline = Pipeline::compile(backend, library, RendererKind::Colored.shader_name(), &QUAD_LAYOUT)
            .context("ColoredRenderer::new")?;
        Ok(Self { pipeline })
    }
}

impl<B: GpuBackend> Visual2DRenderer<B> for ColoredRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Colored
    }

    fn setup(&mut self, _visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<bool, RenderError> {
        self.pipeline.bind(ctx.backend);
        ctx.quad.bind(ctx.backend);
        Ok(false)
    }

    fn render(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<u32, RenderError> {
        ctx.buffers.write_colors(ctx.backend, sprite_colors(visual))?;
        draw_quad(visual, ctx)
    }
}
