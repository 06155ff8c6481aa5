//! The visual registry.
//!
//! [`World`] owns every sprite and widget. Slots are indexed by
//! [`VisualId::index`] and guarded by generation, so a removed visual's id
//! never resolves again. Removal also queues the id on a destroyed list that
//! the renderer drains to evict per-visual GPU caches.

use glam::{Vec2, Vec4};

use crate::camera::Camera;
use crate::component::{Component, ComponentId};
use crate::handle::{VisualId, VisualSlots};
use crate::helper::VisualHelper;
use crate::scale::WorldScale;
use crate::texture::TextureLoader;
use crate::visual::{KeyState, MouseButton, Visual, VisualDesc, VisualKind};
use crate::{ResultExt, VisualError};

// ---------------------------------------------------------------------------
// VisualCreator
// ---------------------------------------------------------------------------

/// Builds visuals on behalf of the world. Swapping the creator lets a host
/// pool, cap or instrument allocation.
pub trait VisualCreator {
    /// Create a visual for a freshly allocated `id`. `live` is the number of
    /// visuals currently in the world.
    fn create(
        &mut self,
        id: VisualId,
        kind: VisualKind,
        desc: VisualDesc,
        live: usize,
    ) -> Result<Visual, VisualError>;
}

/// Plain allocation with an optional cap on live visuals.
#[derive(Debug, Clone, Default)]
pub struct DefaultVisualCreator {
    pub max_visuals: Option<usize>,
}

impl DefaultVisualCreator {
    pub fn with_capacity(max_visuals: usize) -> Self {
        Self {
            max_visuals: Some(max_visuals),
        }
    }
}

impl VisualCreator for DefaultVisualCreator {
    fn create(
        &mut self,
        id: VisualId,
        kind: VisualKind,
        desc: VisualDesc,
        live: usize,
    ) -> Result<Visual, VisualError> {
        if let Some(max) = self.max_visuals {
            if live >= max {
                return Err(VisualError::resource(
                    format!("{kind:?}"),
                    format!("visual limit of {max} reached"),
                ));
            }
        }
        Ok(Visual::new(id, kind, desc))
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Registry of visuals plus camera, UI scale and global tint.
pub struct World {
    ids: VisualSlots,
    slots: Vec<Option<Visual>>,
    /// Live ids in creation order.
    order: Vec<VisualId>,
    creator: Box<dyn VisualCreator>,
    camera: Camera,
    scale: WorldScale,
    global_tint: Vec4,
    last_added: Option<VisualId>,
    destroyed: Vec<VisualId>,
}

impl World {
    pub fn new() -> Self {
        Self::with_creator(DefaultVisualCreator::default())
    }

    pub fn with_creator(creator: impl VisualCreator + 'static) -> Self {
        Self {
            ids: VisualSlots::new(),
            slots: Vec::new(),
            order: Vec::new(),
            creator: Box::new(creator),
            camera: Camera::default(),
            scale: WorldScale::new(),
            global_tint: Vec4::ONE,
            last_added: None,
            destroyed: Vec::new(),
        }
    }

    // -- creation / destruction ---------------------------------------------

    pub fn add_sprite(&mut self, desc: VisualDesc) -> Result<VisualId, VisualError> {
        self.add_visual(VisualKind::Sprite, desc)
            .context("World::add_sprite")
    }

    pub fn add_widget(&mut self, desc: VisualDesc) -> Result<VisualId, VisualError> {
        self.add_visual(VisualKind::Widget, desc)
            .context("World::add_widget")
    }

    fn add_visual(&mut self, kind: VisualKind, desc: VisualDesc) -> Result<VisualId, VisualError> {
        let id = self.ids.claim();
        let visual = match self.creator.create(id, kind, desc, self.order.len()) {
            Ok(visual) => visual,
            Err(e) => {
                self.ids.vacate(id);
                return Err(e);
            }
        };
        let index = id.index() as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(visual);
        self.order.push(id);
        self.last_added = Some(id);
        tracing::trace!(visual = %id, ?kind, "visual added");
        Ok(id)
    }

    pub fn remove_sprite(&mut self, id: VisualId) -> Result<(), VisualError> {
        self.remove_kind(id, VisualKind::Sprite)
            .context("World::remove_sprite")
    }

    pub fn remove_widget(&mut self, id: VisualId) -> Result<(), VisualError> {
        self.remove_kind(id, VisualKind::Widget)
            .context("World::remove_widget")
    }

    fn remove_kind(&mut self, id: VisualId, kind: VisualKind) -> Result<(), VisualError> {
        let actual = self.get(id).ok_or(VisualError::StaleVisual { id })?.kind();
        if actual != kind {
            return Err(VisualError::invalid(format!(
                "visual {id} is a {actual:?}, not a {kind:?}"
            )));
        }
        self.remove_visual(id)
    }

    /// Remove a visual of either kind.
    pub fn remove_visual(&mut self, id: VisualId) -> Result<(), VisualError> {
        if !self.ids.vacate(id) {
            return Err(VisualError::StaleVisual { id });
        }
        self.slots[id.index() as usize] = None;
        self.order.retain(|&v| v != id);
        if self.last_added == Some(id) {
            self.last_added = None;
        }
        self.destroyed.push(id);
        tracing::trace!(visual = %id, "visual removed");
        Ok(())
    }

    /// Remove every visual.
    pub fn clear(&mut self) {
        for id in std::mem::take(&mut self.order) {
            self.ids.vacate(id);
            self.slots[id.index() as usize] = None;
            self.destroyed.push(id);
        }
        self.last_added = None;
    }

    /// Ids removed since the last call, oldest first.
    pub fn take_destroyed(&mut self) -> Vec<VisualId> {
        std::mem::take(&mut self.destroyed)
    }

    // -- lookup -------------------------------------------------------------

    pub fn get(&self, id: VisualId) -> Option<&Visual> {
        if !self.ids.is_current(id) {
            return None;
        }
        self.slots.get(id.index() as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: VisualId) -> Option<&mut Visual> {
        if !self.ids.is_current(id) {
            return None;
        }
        self.slots.get_mut(id.index() as usize)?.as_mut()
    }

    pub fn contains(&self, id: VisualId) -> bool {
        self.ids.is_current(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Visuals in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Visual> {
        self.order.iter().filter_map(move |&id| self.get(id))
    }

    pub fn sprites(&self) -> impl Iterator<Item = &Visual> {
        self.iter().filter(|v| v.kind() == VisualKind::Sprite)
    }

    pub fn widgets(&self) -> impl Iterator<Item = &Visual> {
        self.iter().filter(|v| v.kind() == VisualKind::Widget)
    }

    pub fn has_widgets(&self) -> bool {
        self.widgets().next().is_some()
    }

    /// First visual in creation order carrying `tag`.
    pub fn visual_by_tag(&self, tag: i32) -> Option<VisualId> {
        self.iter().find(|v| v.tag() == tag).map(Visual::id)
    }

    /// Painter's order: ascending `(pos.z, type id)`, creation order on ties.
    pub fn draw_order(&self) -> Vec<VisualId> {
        let mut visuals: Vec<&Visual> = self.iter().collect();
        visuals.sort_by(|a, b| {
            a.pos()
                .z
                .total_cmp(&b.pos().z)
                .then(a.kind().type_id().cmp(&b.kind().type_id()))
        });
        visuals.into_iter().map(Visual::id).collect()
    }

    /// The most recently created visual, unless it has since been removed.
    pub fn last_added(&self) -> Option<VisualId> {
        self.last_added
    }

    /// Fluent configuration of the last added visual.
    pub fn helper<'a>(&'a mut self, loader: &'a mut dyn TextureLoader) -> VisualHelper<'a> {
        VisualHelper::new(self, loader)
    }

    // -- components ---------------------------------------------------------

    pub fn add_component(
        &mut self,
        id: VisualId,
        component: Component,
        loader: &mut dyn TextureLoader,
    ) -> Result<ComponentId, VisualError> {
        let visual = self.get_mut(id).ok_or(VisualError::StaleVisual { id })?;
        visual
            .add_component(component, loader)
            .context("World::add_component")
    }

    pub fn remove_component(&mut self, id: VisualId, component: ComponentId) -> Result<bool, VisualError> {
        let visual = self.get_mut(id).ok_or(VisualError::StaleVisual { id })?;
        Ok(visual.remove_component(component))
    }

    // -- per-frame ----------------------------------------------------------

    /// Advance every visual's components.
    pub fn update(&mut self, delta_seconds: f32) {
        for slot in self.slots.iter_mut().flatten() {
            slot.update(delta_seconds);
        }
    }

    /// Hit-test visible, enabled widgets and fire enter/leave transitions.
    pub fn on_mouse_move(&mut self, x: f32, y: f32) {
        for id in self.order.clone() {
            let Some(visual) = self.get_mut(id) else { continue };
            if !visual.is_widget() {
                continue;
            }
            let inside = visual.is_visible() && !visual.is_disabled() && visual.contains_point(x, y);
            match (visual.is_hovered(), inside) {
                (false, true) => visual.on_mouse_enter(),
                (true, false) => visual.on_mouse_leave(),
                _ => {}
            }
        }
    }

    /// Forward a button event to hovered widgets.
    pub fn on_mouse_button(&mut self, button: MouseButton, state: KeyState) {
        for id in self.order.clone() {
            if let Some(visual) = self.get_mut(id) {
                if visual.is_widget() && visual.is_hovered() {
                    visual.on_mouse_button(button, state);
                }
            }
        }
    }

    // -- camera, scale, tint ------------------------------------------------

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn world_scale(&self) -> &WorldScale {
        &self.scale
    }

    pub fn world_scale_mut(&mut self) -> &mut WorldScale {
        &mut self.scale
    }

    /// Re-resolve the UI scale for a new screen size.
    pub fn update_world_scale(&mut self, screen_size: Vec2) -> bool {
        self.scale.update(screen_size)
    }

    /// Subscribe to UI scale changes.
    pub fn on_scale_changed(&mut self, listener: impl FnMut(Vec2) + 'static) {
        self.scale.on_change(listener);
    }

    pub fn global_tint(&self) -> Vec4 {
        self.global_tint
    }

    pub fn set_global_tint(&mut self, tint: Vec4) {
        self.global_tint = tint;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("visuals", &self.order.len())
            .field("camera", &self.camera)
            .field("scale", &self.scale)
            .field("last_added", &self.last_added)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
