//! Flip-book animated quads.
//!
//! The frame rect comes from [`FrameAnimation::anim_data`](lucent_visual::component::FrameAnimation::anim_data),
//! which the world advances during its update.

use lucent_visual::visual::Visual;

use super::{
    bind_texture, draw_quad, sprite_colors, sprite_uvs, Pipeline, RenderContext, RendererKind, Visual2DRenderer,
    QUAD_LAYOUT,
};
use crate::backend::GpuBackend;
use crate::constants::FULL_FRAME;
use crate::shaders::ShaderLibrary;
use crate::{RenderError, ResultExt};

#[derive(Debug)]
pub struct AnimatedRenderer {
    pipeline: Pipeline,
}

impl AnimatedRenderer {
    pub fn new<B: GpuBackend>(backend: &mut B, library: &ShaderLibrary) -> Result<Self, RenderError> {
        let pipeline = Pipeline::compile(backend, library, RendererKind::Animated.shader_name(), &QUAD_LAYOUT)
            .context("AnimatedRenderer::new")?;
        Ok(Self { pipeline })
    }
}

impl<B: GpuBackend> Visual2DRenderer<B> for AnimatedRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Animated
    }

    fn setup(&mut self, _visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<bool, RenderError> {
        self.pipeline.bind(ctx.backend);
        ctx.quad.bind(ctx.backend);
        Ok(false)
    }

    fn render(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<u32, RenderError> {
        let frame = visual.animation().map_or(FULL_FRAME, |anim| anim.anim_data());
        ctx.buffers.write_colors(ctx.backend, sprite_colors(visual))?;
        ctx.buffers.write_custom_uv(ctx.backend, sprite_uvs(visual))?;
        ctx.buffers.write_frame_anim(ctx.backend, frame)?;
        bind_texture(visual, ctx);
        draw_quad(visual, ctx)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec4};
    use lucent_visual::prelude::*;

    use super::*;
    use crate::constants::Vec4Data;
    use crate::renderers::test_support::Rig;

    fn animated_visual(textures: &mut InMemoryTextures) -> Visual {
        let mut visual = Visual::new(VisualId::new(0, 0), VisualKind::Sprite, VisualDesc::at(0.0, 0.0, 0.0));
        visual.add_component(Component::new(Texture::new("walk.png")), textures).unwrap();
        visual
            .add_component(Component::new(FrameAnimation::new(Vec2::new(16.0, 16.0), 4, 10.0)), textures)
            .unwrap();
        visual
    }

    #[test]
    fn uploads_current_frame_rect() {
        let mut rig = Rig::new();
        let mut renderer = AnimatedRenderer::new(&mut rig.gpu, &rig.library).unwrap();
        let mut textures = InMemoryTextures::new();
        textures.insert("walk.png", Vec2::new(32.0, 32.0));
        let mut visual = animated_visual(&mut textures);
        // 10 fps: 0.35s lands on frame 3, the second row.
        visual.update(0.35);

        let mut ctx = rig.ctx(0.0);
        renderer.setup(&visual, &mut ctx).unwrap();
        assert_eq!(renderer.render(&visual, &mut ctx).unwrap(), 4);

        let frame: Vec4Data = bytemuck::pod_read_unaligned(rig.gpu.buffer_data(rig.buffers.frame_anim).unwrap());
        assert_eq!(Vec4::from_array(frame.value), Vec4::new(0.5, 0.5, 0.5, 0.5));
    }
}
