//! Fluent configuration of the most recently added visual.
//!
//! ```
//! use lucent_visual::prelude::*;
//! use glam::{Vec2, Vec4};
//!
//! let mut textures = InMemoryTextures::new();
//! textures.insert("hero.png", Vec2::new(128.0, 32.0));
//!
//! let mut world = World::new();
//! let hero = world.add_sprite(VisualDesc::at(0.0, 0.0, 0.0).size(32.0, 32.0)).unwrap();
//! world
//!     .helper(&mut textures)
//!     .texture("hero.png").unwrap()
//!     .animation(Vec2::new(32.0, 32.0), 4, 8.0).unwrap()
//!     .tag(42);
//!
//! assert_eq!(world.visual_by_tag(42), Some(hero));
//! ```

use std::path::PathBuf;

use glam::{Vec2, Vec4};

use crate::component::{
    Button, CheckHandler, Checkbox, ClickHandler, Component, ComponentData, CustomUv,
    FrameAnimation, ParticleSettings, Particles, Text, Texture, Tiled, Tint, VertexColors,
};
use crate::texture::TextureLoader;
use crate::world::World;
use crate::{ResultExt, VisualError};

/// Attaches components to [`World::last_added`].
///
/// With no last-added visual every call logs a warning and does nothing.
pub struct VisualHelper<'a> {
    world: &'a mut World,
    loader: &'a mut dyn TextureLoader,
}

impl<'a> VisualHelper<'a> {
    pub fn new(world: &'a mut World, loader: &'a mut dyn TextureLoader) -> Self {
        Self { world, loader }
    }

    fn attach(&mut self, component: Component) -> Result<&mut Self, VisualError> {
        let kind = component.kind();
        match self.world.last_added() {
            Some(id) => {
                self.world
                    .add_component(id, component, &mut *self.loader)
                    .context(format!("VisualHelper({kind})"))?;
            }
            None => tracing::warn!(%kind, "no last added visual, component dropped"),
        }
        Ok(self)
    }

    /// Attach a prebuilt component (e.g. one with a lifespan).
    pub fn component(&mut self, component: Component) -> Result<&mut Self, VisualError> {
        self.attach(component)
    }

    pub fn data(&mut self, data: impl Into<ComponentData>) -> Result<&mut Self, VisualError> {
        self.attach(Component::new(data))
    }

    pub fn tint(&mut self, color: Vec4) -> Result<&mut Self, VisualError> {
        self.data(Tint::new(color))
    }

    pub fn colors(
        &mut self,
        left_top: Vec4,
        right_top: Vec4,
        right_bottom: Vec4,
        left_bottom: Vec4,
    ) -> Result<&mut Self, VisualError> {
        self.data(VertexColors {
            left_top,
            right_top,
            right_bottom,
            left_bottom,
        })
    }

    pub fn texture(&mut self, path: impl Into<String>) -> Result<&mut Self, VisualError> {
        self.data(Texture::new(path))
    }

    pub fn custom_uv(
        &mut self,
        left_top: Vec2,
        right_top: Vec2,
        right_bottom: Vec2,
        left_bottom: Vec2,
    ) -> Result<&mut Self, VisualError> {
        self.data(CustomUv::new(left_top, right_top, right_bottom, left_bottom))
    }

    pub fn animation(
        &mut self,
        frame_size: Vec2,
        num_frames: u16,
        frames_per_second: f32,
    ) -> Result<&mut Self, VisualError> {
        self.data(FrameAnimation::new(frame_size, num_frames, frames_per_second))
    }

    /// Tiled map from a `.tmj` file.
    pub fn tiled(&mut self, path: impl Into<PathBuf>) -> Result<&mut Self, VisualError> {
        self.data(Tiled::from_file(path))
    }

    /// Tiled map with a layer selection or object handler already set.
    pub fn tiled_with(&mut self, tiled: Tiled) -> Result<&mut Self, VisualError> {
        self.data(tiled)
    }

    pub fn particles(&mut self, count: u16, settings: ParticleSettings) -> Result<&mut Self, VisualError> {
        self.data(Particles::new(count, settings))
    }

    pub fn text(&mut self, text: Text) -> Result<&mut Self, VisualError> {
        self.data(text)
    }

    pub fn button(&mut self, idle: Vec2, over: Vec2, pressed: Vec2) -> Result<&mut Self, VisualError> {
        self.data(Button::new(idle, over, pressed))
    }

    pub fn checkbox(
        &mut self,
        unchecked: Vec2,
        unchecked_hovered: Vec2,
        checked: Vec2,
        checked_hovered: Vec2,
    ) -> Result<&mut Self, VisualError> {
        self.data(Checkbox::new(unchecked, unchecked_hovered, checked, checked_hovered))
    }

    pub fn on_click(&mut self, handler: impl FnMut() + 'static) -> Result<&mut Self, VisualError> {
        self.data(ClickHandler::new(handler))
    }

    pub fn on_check(&mut self, handler: impl FnMut(bool) + 'static) -> Result<&mut Self, VisualError> {
        self.data(CheckHandler::new(handler))
    }

    /// Set the tag of the last added visual.
    pub fn tag(&mut self, tag: i32) -> &mut Self {
        match self.world.last_added().and_then(|id| self.world.get_mut(id)) {
            Some(visual) => visual.set_tag(tag),
            None => tracing::warn!(tag, "no last added visual, tag dropped"),
        }
        self
    }
}
