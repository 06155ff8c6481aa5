//! Textured quads with optional custom UVs.

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
pub struct TexturedRenderer {
    pipeline: Pipeline,
}

impl TexturedRenderer {
    pub fn new<B: GpuBackend>(backend: &mut B, library: &ShaderLibrary) -> Result<Self, RenderError> {
        let pipeline = Pipeline::compile(backend, library, RendererKind::Textured.shader_name(), &QUAD_LAYOUT)
            .context("TexturedRenderer::new")?;
        Ok(Self { pipeline })
    }
}

impl<B: GpuBackend> Visual2DRenderer<B> for TexturedRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Textured
    }

    fn setup(&mut self, _visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<bool, RenderError> {
        self.pipeline.bind(ctx.backend);
        ctx.quad.bind(ctx.backend);
        // An animated sprite drawn earlier leaves its frame rect behind.
        ctx.buffers.write_frame_anim(ctx.backend, FULL_FRAME)?;
        Ok(false)
    }

    fn render(&mut self, visual: &Visual, ctx: &mut RenderContext<'_, B>) -> Result<u32, RenderError> {
        ctx.buffers.write_colors(ctx.backend, sprite_colors(visual))?;
        ctx.buffers.write_custom_uv(ctx.backend, sprite_uvs(visual))?;
        bind_texture(visual, ctx);
        draw_quad(visual, ctx)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec4};
    use lucent_visual::prelude::*;

    use super::*;
    use crate::constants::{CornersData, Vec4Data};
    use crate::headless::GpuCommand;
    use crate::renderers::test_support::Rig;

    #[test]
    fn binds_texture_and_uploads_custom_uvs() {
        let mut rig = Rig::new();
        let mut renderer = TexturedRenderer::new(&mut rig.gpu, &rig.library).unwrap();
        let mut textures = InMemoryTextures::new();
        let handle = textures.insert("atlas.png", Vec2::new(64.0, 64.0));

        let mut visual = Visual::new(VisualId::new(0, 0), VisualKind::Sprite, VisualDesc::at(0.0, 0.0, 0.0));
        visual.add_component(Component::new(Texture::new("atlas.png")), &mut textures).unwrap();
        let uv = CustomUv::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 0.0),
            Vec2::new(0.5, 0.5),
            Vec2::new(0.0, 0.5),
        );
        visual.add_component(Component::new(uv), &mut textures).unwrap();

        let mut ctx = rig.ctx(0.0);
        renderer.setup(&visual, &mut ctx).unwrap();
        renderer.render(&visual, &mut ctx).unwrap();

        let uploaded: CornersData = bytemuck::pod_read_unaligned(rig.gpu.buffer_data(rig.buffers.custom_uv).unwrap());
        assert_eq!(uploaded, CornersData::from(uv.data()));
        let frame: Vec4Data = bytemuck::pod_read_unaligned(rig.gpu.buffer_data(rig.buffers.frame_anim).unwrap());
        assert_eq!(Vec4::from_array(frame.value), FULL_FRAME);
        assert!(rig
            .gpu
            .commands()
            .contains(&GpuCommand::BindShaderResource { slot: 0, texture: handle }));
    }
}
