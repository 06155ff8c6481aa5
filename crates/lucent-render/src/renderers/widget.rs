//! Widget pass.
//!
//! Widgets are drawn after every sprite, inside a `begin_overlay` /
//! `end_overlay` bracket. A widget's quad takes its UVs from its button or
//! checkbox state when it has one. Text is not rasterized here: each text
//! component becomes a [`TextDraw`] for the text collaborator.

use glam::{Vec2, Vec4};
use lucent_visual::component::{ComponentKind, FeatureSet};
use lucent_visual::handle::VisualId;
use lucent_visual::visual::Visual;

use super::{
    bind_texture, default_uvs, draw_quad, sprite_colors, sprite_uvs, Pipeline, RenderContext, RendererKind,
    Visual2DRenderer, QUAD_LAYOUT,
};
use crate::backend::GpuBackend;
use crate::constants::FULL_FRAME;
use crate::shaders::ShaderLibrary;
use crate::{RenderError, ResultExt};

/// A text run queued for the text collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw {
    pub visual: VisualId,
    pub text: String,
    pub font_name: String,
    pub font_size: u16,
    pub color: Vec4,
    /// Left-top and right-bottom corners, world-scaled.
    pub rect: [Vec2; 2],
}

#[derive(Debug)]
pub struct WidgetRenderer {
    pipeline: Pipeline,
    texts: Vec<TextDraw>,
}

impl WidgetRenderer {
    pub fn new<B: GpuBackend>(backend: &mut B, library: &ShaderLibrary) -> Result<Self, RenderError> {
        let pipeline = Pipeline::compile(backend, library, RendererKind::Widget.shader_name(), &QUAD_LAYOUT)
            .context("WidgetRenderer::new")?;
        Ok(Self {
            pipeline,
            texts: Vec::new(),
        })
    }

    /// Open the overlay and bind the widget pipeline.
    pub fn pre_render<B: GpuBackend>(&mut self, ctx: &mut RenderContext<'_, B>) -> Result<(), RenderError> {
        ctx.backend.begin_overlay();
        self.texts.clear();
        self.setup_pipeline(ctx)
    }

    /// Close the overlay.
    pub fn post_render<B: GpuBackend>(&mut self, ctx: &mut RenderContext<'_, B>) -> Result<(), RenderError> {
        ctx.backend.end_overlay().context("WidgetRenderer::post_render")
    }

    /// Text queued during the last widget pass.
    pub fn texts(&self) -> &[TextDraw] {
        &self.texts
    }

    pub fn take_texts(&mut self) -> Vec<TextDraw> {
        std::mem::take(&mut self.texts)
    }

    fn setup_pipeline<B: GpuBackend>(&self, ctx: &mut RenderContext<'_, B>) -> Result<(), RenderError> {
        self.pipeline.bind(ctx.backend);
        ctx.quad.bind(ctx.backend);
        ctx.buffers.write_frame_anim(ctx.backend, FULL_FRAME)
    }
}

/// Button or checkbox atlas UVs, else custom UVs, else the whole texture.
fn widget_uvs(visual: &Visual) -> [Vec4; 4] {
    let atlas = visual
        .button()
        .map(|b| b.uv())
        .or_else(|| visual.checkbox().map(|c| c.uv()));
    match atlas {
        Some(quad) => quad.map(|uv| uv.extend(0.0).extend(0.0)),
        None if visual.custom_uv().is_some() => sprite_uvs(visual),
        None => default_uvs(),
    }
}

fn has_quad(visual: &Visual) -> bool {
    [ComponentKind::Texture, ComponentKind::Tint, ComponentKind::VertexColor]
        .into_iter()
        .any(|kind| visual.has(kind))
}

impl<B: GpuBackend> Visual2DRenderer<B> for WidgetRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Widget
    }

    fn supports(&self, _features: FeatureSet) -> bool {
        true
    }

    fn setup(&mut self, _visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<bool, RenderError> {
        self.setup_pipeline(ctx)?;
        Ok(false)
    }

    fn render(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<u32, RenderError> {
        let mut vertices = 0;
        if has_quad(visual) {
            ctx.buffers.write_colors(ctx.backend, sprite_colors(visual))?;
            ctx.buffers.write_custom_uv(ctx.backend, widget_uvs(visual))?;
            bind_texture(visual, ctx);
            vertices = draw_quad(visual, ctx)?;
        }
        if let Some(text) = visual.text() {
            let center = visual.pos().truncate() * ctx.world_scale;
            let half = visual.size() * ctx.world_scale / 2.0;
            self.texts.push(TextDraw {
                visual: visual.id(),
                text: text.text.clone(),
                font_name: text.font_name.clone(),
                font_size: text.font_size,
                color: text.color,
                rect: [center - half, center + half],
            });
        }
        Ok(vertices)
    }
}
