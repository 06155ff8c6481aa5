//! The render dispatcher.
//!
//! [`RenderSystem::render`] draws one frame of a [`World`]:
//!
//! 1. Geometry cached for visuals destroyed since the last frame, or for
//!    tile and particle components that have since detached, is evicted.
//! 2. The target is cleared and the camera view and global tint uploaded.
//! 3. Every visible sprite, in draw order, is matched to the one renderer
//!    that supports its feature set. `setup` runs only when the
//!    [`BindingState`] says the bound pipeline does not fit the sprite; then
//!    `render` draws it.
//! 4. If the world has widgets, the widget pass draws them inside an overlay
//!    bracket after all sprites.
//! 5. The frame is presented.
//!
//! Any error aborts the frame. Errors from a visual carry its id and the
//! renderer stage as context.

use glam::Mat4;
use lucent_visual::component::FeatureSet;
use lucent_visual::handle::VisualId;
use lucent_visual::world::World;

use crate::backend::GpuBackend;
use crate::config::RenderConfig;
use crate::constants::ConstantBuffers;
use crate::math::ortho_projection;
use crate::renderers::{
    build_sprite_renderer, validate_renderers, QuadBuffer, RenderContext, RendererKind, TextDraw, Visual2DRenderer,
    WidgetRenderer,
};
use crate::shaders::ShaderLibrary;
use crate::texture::{TextureCache, TextureLoading};
use crate::{RenderError, ResultExt};

// ---------------------------------------------------------------------------
// BindingState
// ---------------------------------------------------------------------------

/// Which feature set the currently bound pipeline was set up for.
///
/// Threaded through the sprite loop by value. A sprite needs `setup` when
/// nothing is bound yet, when the last renderer forced a rebind, or when its
/// feature set differs from the bound one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingState {
    pub features: Option<FeatureSet>,
    pub force_setup: bool,
}

impl BindingState {
    pub const UNBOUND: BindingState = BindingState {
        features: None,
        force_setup: false,
    };

    pub fn needs_setup(self, features: FeatureSet) -> bool {
        self.force_setup || self.features != Some(features)
    }

    /// State after a setup for `features`; `force` is what the renderer's
    /// setup returned.
    pub fn bound(features: FeatureSet, force: bool) -> Self {
        Self {
            features: Some(features),
            force_setup: force,
        }
    }
}

impl Default for BindingState {
    fn default() -> Self {
        Self::UNBOUND
    }
}

// ---------------------------------------------------------------------------
// FrameStats
// ---------------------------------------------------------------------------

/// One drawn visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    pub visual: VisualId,
    pub renderer: RendererKind,
    pub vertex_count: u32,
    /// Whether `setup` ran before this draw.
    pub setup: bool,
}

/// What the last frame drew.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub sprites_drawn: usize,
    pub widgets_drawn: usize,
    pub setup_calls: usize,
    /// Draw calls issued; a visual with nothing to draw issues none.
    pub draw_calls: usize,
    pub vertices: u64,
    /// Per visual, in draw order: sprites first, then widgets.
    pub draws: Vec<DrawRecord>,
    /// Text queued by the widget pass.
    pub texts: Vec<TextDraw>,
}

impl FrameStats {
    fn record(&mut self, record: DrawRecord) {
        if record.renderer == RendererKind::Widget {
            self.widgets_drawn += 1;
        } else {
            self.sprites_drawn += 1;
        }
        if record.setup {
            self.setup_calls += 1;
        }
        if record.vertex_count > 0 {
            self.draw_calls += 1;
        }
        self.vertices += u64::from(record.vertex_count);
        self.draws.push(record);
    }

    /// Renderer kinds in draw order.
    pub fn renderers(&self) -> Vec<RendererKind> {
        self.draws.iter().map(|d| d.renderer).collect()
    }
}

// ---------------------------------------------------------------------------
// RenderSystem
// ---------------------------------------------------------------------------

pub struct RenderSystem<B: GpuBackend> {
    backend: B,
    config: RenderConfig,
    buffers: ConstantBuffers,
    quad: QuadBuffer,
    /// Sprite renderers in dispatch order.
    renderers: Vec<Box<dyn Visual2DRenderer<B>>>,
    widget: WidgetRenderer,
    textures: TextureCache,
    last_stats: FrameStats,
    frames_rendered: u64,
}

impl<B: GpuBackend> RenderSystem<B> {
    /// Create a render system with every built-in sprite renderer.
    pub fn new(backend: B, config: RenderConfig, shaders: ShaderLibrary) -> Result<Self, RenderError> {
        Self::with_renderers(backend, config, shaders, &RendererKind::SPRITE)
    }

    /// Create a render system with shaders loaded from `config.shader_dir`.
    pub fn from_config(backend: B, config: RenderConfig) -> Result<Self, RenderError> {
        let dir = config.shader_dir.clone().ok_or_else(|| RenderError::Config {
            details: "shader_dir is not set".to_owned(),
        })?;
        let shaders = ShaderLibrary::from_dir(dir)?;
        Self::new(backend, config, shaders)
    }

    /// Create a render system with only the sprite renderers in `kinds`.
    ///
    /// Fails unless `kinds` claim every reachable sprite feature set exactly
    /// once.
    pub fn with_renderers(
        mut backend: B,
        config: RenderConfig,
        shaders: ShaderLibrary,
        kinds: &[RendererKind],
    ) -> Result<Self, RenderError> {
        config.validate()?;
        validate_renderers(kinds).context("RenderSystem::with_renderers")?;

        let buffers = ConstantBuffers::new(&mut backend, config.width, config.height, Mat4::IDENTITY)
            .context("RenderSystem::with_renderers")?;
        let quad = QuadBuffer::new(&mut backend).context("RenderSystem::with_renderers")?;
        let renderers = kinds
            .iter()
            .map(|kind| build_sprite_renderer(*kind, &mut backend, &shaders, config.particle_seed))
            .collect::<Result<Vec<_>, _>>()
            .context("RenderSystem::with_renderers")?;
        let widget = WidgetRenderer::new(&mut backend, &shaders).context("RenderSystem::with_renderers")?;

        tracing::info!(
            width = config.width,
            height = config.height,
            renderers = renderers.len(),
            "render system created"
        );
        Ok(Self {
            backend,
            textures: TextureCache::new(config.texture_dir.clone()),
            config,
            buffers,
            quad,
            renderers,
            widget,
            last_stats: FrameStats::default(),
            frames_rendered: 0,
        })
    }

    /// Draw one frame of `world`. `game_time` is seconds since start and
    /// drives particle animation.
    pub fn render(&mut self, world: &mut World, game_time: f64) -> Result<&FrameStats, RenderError> {
        for id in world.take_destroyed() {
            self.evict(id);
        }
        let mut detached = 0;
        for renderer in &mut self.renderers {
            detached += renderer.evict_detached(&mut self.backend, world);
        }
        if detached > 0 {
            tracing::debug!(detached, "geometry of detached components evicted");
        }

        self.backend.clear(self.config.clear_color());
        self.buffers
            .write_view(&mut self.backend, world.camera().view_matrix())
            .context("RenderSystem::render")?;
        self.buffers
            .write_settings(&mut self.backend, world.global_tint())
            .context("RenderSystem::render")?;

        let order = world.draw_order();
        let mut stats = FrameStats::default();
        let mut ctx = RenderContext {
            backend: &mut self.backend,
            buffers: &self.buffers,
            quad: &self.quad,
            world_scale: world.world_scale().scale(),
            game_time,
        };

        let mut binding = BindingState::UNBOUND;
        for visual in order.iter().filter_map(|id| world.get(*id)) {
            if visual.is_widget() || !visual.is_visible() {
                continue;
            }
            let id = visual.id();
            let features = visual.features();
            let renderer = self
                .renderers
                .iter_mut()
                .find(|r| r.supports(features))
                .ok_or(RenderError::MissingCapability { features })
                .context(format!("RenderSystem::render({id})"))?;

            let kind = renderer.kind();

            let setup = binding.needs_setup(features);
            if setup {
                let force = renderer
                    .setup(visual, &mut ctx)
                    .context(format!("RenderSystem::render({id}, {kind} setup)"))?;
                binding = BindingState::bound(features, force);
            }
            let vertex_count = renderer
                .render(visual, &mut ctx)
                .context(format!("RenderSystem::render({id}, {kind} render)"))?;
            tracing::trace!(visual = %id, renderer = %kind, vertex_count, setup, "sprite drawn");
            stats.record(DrawRecord {
                visual: id,
                renderer: kind,
                vertex_count,
                setup,
            });
        }

        if world.has_widgets() {
            self.widget.pre_render(&mut ctx).context("RenderSystem::render(widgets)")?;
            for visual in order.iter().filter_map(|id| world.get(*id)) {
                if !visual.is_widget() || !visual.is_visible() {
                    continue;
                }
                let vertex_count = self
                    .widget
                    .render(visual, &mut ctx)
                    .context(format!("RenderSystem::render({}, widget render)", visual.id()))?;
                stats.record(DrawRecord {
                    visual: visual.id(),
                    renderer: RendererKind::Widget,
                    vertex_count,
                    setup: false,
                });
            }
            self.widget.post_render(&mut ctx).context("RenderSystem::render(widgets)")?;
            stats.texts = self.widget.take_texts();
        }

        self.backend
            .present(self.config.vsync)
            .context("RenderSystem::render(present)")?;
        self.frames_rendered += 1;
        self.last_stats = stats;
        Ok(&self.last_stats)
    }

    /// Remove `id` from `world` and drop its cached geometry right away.
    pub fn remove_visual(&mut self, world: &mut World, id: VisualId) -> Result<(), RenderError> {
        world.remove_visual(id)?;
        self.evict(id);
        Ok(())
    }

    /// Drop cached geometry for `id` from every renderer.
    pub fn evict(&mut self, id: VisualId) -> bool {
        let mut evicted = false;
        for renderer in &mut self.renderers {
            evicted |= renderer.evict(&mut self.backend, id);
        }
        if evicted {
            tracing::debug!(visual = %id, "cached geometry evicted");
        }
        evicted
    }

    pub fn has_geometry(&self, id: VisualId) -> bool {
        self.renderers.iter().any(|r| r.has_cached(id))
    }

    /// Total cached geometry entries across renderers.
    pub fn geometry_len(&self) -> usize {
        self.renderers.iter().map(|r| r.cache_len()).sum()
    }

    /// The renderer kind that draws a sprite with `features`.
    pub fn renderer_for(&self, features: FeatureSet) -> Result<RendererKind, RenderError> {
        self.renderers
            .iter()
            .find(|r| r.supports(features))
            .map(|r| r.kind())
            .ok_or(RenderError::MissingCapability { features })
    }

    pub fn renderer_kinds(&self) -> Vec<RendererKind> {
        self.renderers.iter().map(|r| r.kind()).collect()
    }

    /// A texture loader uploading through this system's backend.
    pub fn textures(&mut self) -> TextureLoading<'_, B> {
        TextureLoading::new(&mut self.textures, &mut self.backend)
    }

    /// Register raw RGBA8 pixels as the texture `path`.
    pub fn insert_texture(&mut self, path: &str, width: u32, height: u32, rgba: &[u8]) -> Result<(), RenderError> {
        self.textures.insert_rgba(&mut self.backend, path, width, height, rgba)?;
        Ok(())
    }

    /// Swap the pixels of an already registered texture. Fails with
    /// [`RenderError::TextureInUse`] while visuals in `world` hold it.
    pub fn replace_texture(
        &mut self,
        world: &World,
        path: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), RenderError> {
        self.textures
            .replace_rgba(&mut self.backend, world, path, width, height, rgba)
            .context(format!("RenderSystem::replace_texture({path})"))?;
        Ok(())
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.textures
    }

    /// Release textures no visual in `world` uses, or all of them.
    pub fn clear_textures(&mut self, world: Option<&World>) -> usize {
        self.textures.clear(&mut self.backend, world)
    }

    /// Change the viewport; the projection is rebuilt.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let mut config = self.config.clone();
        config.width = width;
        config.height = height;
        config.validate()?;
        self.buffers
            .write_projection(&mut self.backend, ortho_projection(width as f32, height as f32))
            .context("RenderSystem::resize")?;
        self.config = config;
        tracing::info!(width, height, "viewport resized");
        Ok(())
    }

    /// Release every GPU resource the system owns and return the backend.
    pub fn shutdown(mut self) -> B {
        for renderer in &mut self.renderers {
            renderer.release(&mut self.backend);
        }
        self.textures.clear(&mut self.backend, None);
        self.quad.release(&mut self.backend);
        self.buffers.release(&mut self.backend);
        self.backend
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn constant_buffers(&self) -> &ConstantBuffers {
        &self.buffers
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn last_stats(&self) -> &FrameStats {
        &self.last_stats
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}
