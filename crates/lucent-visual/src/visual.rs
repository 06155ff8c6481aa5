//! Sprites and widgets.
//!
//! A [`Visual`] owns its components in attach order. Its [`FeatureSet`] is
//! recomputed on every add and remove so that it always equals the set of
//! kinds in the component list.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::component::{
    Button, ButtonState, Checkbox, Component, ComponentData, ComponentId, ComponentKind, CustomUv,
    FeatureSet, FrameAnimation, InitContext, Particles, Text, Texture, Tiled, Tint, VertexColors,
};
use crate::handle::VisualId;
use crate::texture::TextureLoader;
use crate::{ResultExt, VisualError};

/// Tag value meaning "no tag".
pub const INVALID_TAG: i32 = -1;

/// Sprite or widget. The discriminant is the type id used as the second
/// painter's-order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum VisualKind {
    Sprite = 0,
    Widget = 1,
}

impl VisualKind {
    pub fn type_id(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    Down,
    Up,
}

/// Initial geometry of a new visual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualDesc {
    pub pos: Vec3,
    pub size: Vec2,
    pub rot_z: f32,
    pub visible: bool,
}

impl VisualDesc {
    /// Zero-sized, unrotated and visible at `(x, y, z)`.
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            pos: Vec3::new(x, y, z),
            size: Vec2::ZERO,
            rot_z: 0.0,
            visible: true,
        }
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.size = Vec2::new(width, height);
        self
    }

    pub fn rotation(mut self, rot_z: f32) -> Self {
        self.rot_z = rot_z;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

// ---------------------------------------------------------------------------
// Visual
// ---------------------------------------------------------------------------

/// A drawable entity with typed components.
#[derive(Debug)]
pub struct Visual {
    id: VisualId,
    kind: VisualKind,
    /// Center in screen pixels; z orders painting.
    pos: Vec3,
    size: Vec2,
    /// Radians.
    rot_z: f32,
    visible: bool,
    tag: i32,
    components: Vec<Component>,
    features: FeatureSet,
    next_component: u32,
    hovered: bool,
    pressed: bool,
    disabled: bool,
    focused: bool,
}

impl Visual {
    pub fn new(id: VisualId, kind: VisualKind, desc: VisualDesc) -> Self {
        Self {
            id,
            kind,
            pos: desc.pos,
            size: desc.size,
            rot_z: desc.rot_z,
            visible: desc.visible,
            tag: INVALID_TAG,
            components: Vec::new(),
            features: FeatureSet::EMPTY,
            next_component: 0,
            hovered: false,
            pressed: false,
            disabled: false,
            focused: false,
        }
    }

    pub fn id(&self) -> VisualId {
        self.id
    }

    pub fn kind(&self) -> VisualKind {
        self.kind
    }

    pub fn is_widget(&self) -> bool {
        self.kind == VisualKind::Widget
    }

    // -- geometry -----------------------------------------------------------

    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    pub fn set_pos(&mut self, pos: Vec3) {
        self.pos = pos;
    }

    pub fn add_pos(&mut self, delta: Vec3) {
        self.pos += delta;
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    pub fn rot_z(&self) -> f32 {
        self.rot_z
    }

    pub fn set_rot_z(&mut self, rot_z: f32) {
        self.rot_z = rot_z;
    }

    pub fn add_rot_z(&mut self, delta: f32) {
        self.rot_z += delta;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn tag(&self) -> i32 {
        self.tag
    }

    pub fn set_tag(&mut self, tag: i32) {
        self.tag = tag;
    }

    /// Whether `(x, y)` lies inside the visual's rectangle, which is
    /// centered on `pos` like the drawn quad. The left and top edges are
    /// inside, the right and bottom edges are not.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        let min = self.pos.truncate() - self.size / 2.0;
        let max = min + self.size;
        x >= min.x && x < max.x && y >= min.y && y < max.y
    }

    // -- components ---------------------------------------------------------

    pub fn features(&self) -> FeatureSet {
        self.features
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Validate, initialize and attach `component`.
    ///
    /// Components that read texture size (animation, tiles, particles,
    /// buttons, checkboxes) need a texture attached first. If validation or
    /// init fails the visual is unchanged.
    pub fn add_component(
        &mut self,
        mut component: Component,
        loader: &mut dyn TextureLoader,
    ) -> Result<ComponentId, VisualError> {
        let kind = component.kind();
        let location = format!("Visual::add_component({kind})");
        component.data().validate().context(location.as_str())?;

        let owner_size = self.size;
        let texture = self.texture();
        component
            .data_mut()
            .init(&mut InitContext {
                owner_size,
                texture,
                loader,
            })
            .context(location.as_str())?;

        let id = ComponentId::new(self.next_component);
        self.next_component += 1;
        component.assign_id(id);
        self.components.push(component);
        self.features.insert(kind);
        tracing::trace!(visual = %self.id, component = %id, %kind, "component attached");
        Ok(id)
    }

    /// Detach a component. Returns `false` if no such component is attached.
    pub fn remove_component(&mut self, id: ComponentId) -> bool {
        let Some(index) = self.components.iter().position(|c| c.id() == id) else {
            return false;
        };
        self.components.remove(index);
        self.recompute_features();
        true
    }

    /// Detach every component of `kind`. Returns how many were removed.
    pub fn remove_components(&mut self, kind: ComponentKind) -> usize {
        let before = self.components.len();
        self.components.retain(|c| c.kind() != kind);
        self.recompute_features();
        before - self.components.len()
    }

    fn recompute_features(&mut self) {
        self.features = self.components.iter().map(Component::kind).collect();
    }

    /// First attached component of `kind`.
    pub fn get(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.iter().find(|c| c.kind() == kind)
    }

    pub fn get_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.kind() == kind)
    }

    pub fn has(&self, kind: ComponentKind) -> bool {
        self.features.contains(kind)
    }

    /// Whether the component `id` is still attached.
    pub fn holds(&self, id: ComponentId) -> bool {
        self.components.iter().any(|c| c.id() == id)
    }

    /// Advance every component; expired ones fire their handler and detach.
    pub fn update(&mut self, delta_seconds: f32) {
        let mut expired = Vec::new();
        for component in &mut self.components {
            if component.update(delta_seconds) {
                expired.push(component.id());
            }
        }
        for id in expired {
            self.remove_component(id);
        }
    }

    // -- widget input -------------------------------------------------------

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.pressed = false;
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn on_mouse_enter(&mut self) {
        self.hovered = true;
        if let Some(button) = self.button_mut() {
            button.state = ButtonState::Over;
        }
        if let Some(checkbox) = self.checkbox_mut() {
            checkbox.hovered = true;
        }
    }

    pub fn on_mouse_leave(&mut self) {
        self.hovered = false;
        self.pressed = false;
        if let Some(button) = self.button_mut() {
            button.state = ButtonState::Idle;
        }
        if let Some(checkbox) = self.checkbox_mut() {
            checkbox.hovered = false;
        }
    }

    /// Left-button press/release. A release over a pressed widget clicks it:
    /// click handlers fire, and a checkbox toggles and reports its new state.
    pub fn on_mouse_button(&mut self, button: MouseButton, state: KeyState) {
        if self.kind != VisualKind::Widget || self.disabled || button != MouseButton::Left {
            return;
        }
        match state {
            KeyState::Down => {
                self.pressed = true;
                if let Some(b) = self.button_mut() {
                    b.state = ButtonState::Pressed;
                }
            }
            KeyState::Up => {
                let clicked = self.pressed && self.hovered;
                self.pressed = false;
                let hovered = self.hovered;
                if let Some(b) = self.button_mut() {
                    b.state = if hovered {
                        ButtonState::Over
                    } else {
                        ButtonState::Idle
                    };
                }
                if clicked {
                    self.click();
                }
            }
        }
    }

    fn click(&mut self) {
        let toggled = self.checkbox_mut().map(|checkbox| {
            checkbox.checked = !checkbox.checked;
            checkbox.checked
        });
        for component in &mut self.components {
            match component.data_mut() {
                ComponentData::ClickHandler(handler) => (handler.0)(),
                ComponentData::CheckHandler(handler) => {
                    if let Some(checked) = toggled {
                        (handler.0)(checked);
                    }
                }
                _ => {}
            }
        }
    }
}

macro_rules! typed_getters {
    ($($getter:ident, $getter_mut:ident => $variant:ident($payload:ty);)*) => {
        impl Visual {
            $(
                pub fn $getter(&self) -> Option<&$payload> {
                    self.components.iter().find_map(|c| match c.data() {
                        ComponentData::$variant(payload) => Some(payload),
                        _ => None,
                    })
                }

                pub fn $getter_mut(&mut self) -> Option<&mut $payload> {
                    self.components.iter_mut().find_map(|c| match c.data_mut() {
                        ComponentData::$variant(payload) => Some(payload),
                        _ => None,
                    })
                }
            )*
        }
    };
}

typed_getters! {
    tint, tint_mut => Tint(Tint);
    vertex_colors, vertex_colors_mut => VertexColors(VertexColors);
    texture, texture_mut => Texture(Texture);
    custom_uv, custom_uv_mut => CustomUv(CustomUv);
    animation, animation_mut => FrameAnimation(FrameAnimation);
    tiled, tiled_mut => Tiled(Tiled);
    particles, particles_mut => Particles(Particles);
    text, text_mut => Text(Text);
    button, button_mut => Button(Button);
    checkbox, checkbox_mut => Checkbox(Checkbox);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{CheckHandler, ClickHandler};
    use crate::texture::InMemoryTextures;
    use glam::Vec4;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn sprite() -> Visual {
        Visual::new(
            VisualId::new(0, 0),
            VisualKind::Sprite,
            VisualDesc::at(200.0, 200.0, 0.0).size(300.0, 300.0),
        )
    }

    fn widget() -> Visual {
        Visual::new(
            VisualId::new(1, 0),
            VisualKind::Widget,
            VisualDesc::at(50.0, 50.0, 0.0).size(100.0, 40.0),
        )
    }

    fn textures() -> InMemoryTextures {
        let mut textures = InMemoryTextures::new();
        textures.insert("atlas.png", Vec2::new(256.0, 256.0));
        textures
    }

    #[test]
    fn add_component_tracks_features() {
        let mut loader = textures();
        let mut visual = sprite();
        visual
            .add_component(Component::new(Texture::new("atlas.png")), &mut loader)
            .unwrap();
        visual
            .add_component(Component::new(Tint::new(Vec4::ONE)), &mut loader)
            .unwrap();
        assert!(visual.has(ComponentKind::Texture));
        assert!(visual.has(ComponentKind::Tint));
        assert_eq!(visual.features().len(), 2);
        assert_eq!(visual.texture().unwrap().size, Vec2::new(256.0, 256.0));
    }

    #[test]
    fn invalid_component_leaves_visual_unchanged() {
        let mut loader = textures();
        let mut visual = sprite();
        visual
            .add_component(Component::new(Tint::new(Vec4::ONE)), &mut loader)
            .unwrap();
        let before = visual.features();

        let err = visual
            .add_component(Component::new(Texture::new("")), &mut loader)
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().ends_with("> Visual::add_component(Texture)"));
        assert_eq!(visual.features(), before);
        assert_eq!(visual.components().len(), 1);
    }

    #[test]
    fn failed_texture_load_propagates_and_leaves_visual_unchanged() {
        let mut loader = textures();
        let mut visual = sprite();
        let err = visual
            .add_component(Component::new(Texture::new("missing.png")), &mut loader)
            .unwrap_err();
        assert!(matches!(err.root(), VisualError::ResourceCreation { .. }));
        assert!(visual.features().is_empty());
    }

    #[test]
    fn animation_needs_texture_first() {
        let mut loader = textures();
        let mut visual = sprite();
        let anim = || Component::new(FrameAnimation::new(Vec2::splat(32.0), 4, 8.0));
        assert!(visual.add_component(anim(), &mut loader).is_err());
        visual
            .add_component(Component::new(Texture::new("atlas.png")), &mut loader)
            .unwrap();
        assert!(visual.add_component(anim(), &mut loader).is_ok());
    }

    #[test]
    fn removal_recomputes_features() {
        let mut loader = textures();
        let mut visual = sprite();
        let first = visual
            .add_component(Component::new(Tint::new(Vec4::ONE)), &mut loader)
            .unwrap();
        let second = visual
            .add_component(Component::new(Tint::new(Vec4::ZERO)), &mut loader)
            .unwrap();

        assert!(visual.remove_component(first));
        assert!(visual.has(ComponentKind::Tint), "duplicate tint still attached");
        assert_eq!(visual.tint().unwrap().color, Vec4::ZERO);

        assert!(visual.remove_component(second));
        assert!(!visual.has(ComponentKind::Tint));
        assert!(!visual.remove_component(second), "second removal is a no-op");
    }

    #[test]
    fn get_returns_first_in_attach_order() {
        let mut loader = textures();
        let mut visual = sprite();
        visual
            .add_component(Component::new(Tint::new(Vec4::X)), &mut loader)
            .unwrap();
        visual
            .add_component(Component::new(Tint::new(Vec4::Y)), &mut loader)
            .unwrap();
        assert_eq!(visual.tint().unwrap().color, Vec4::X);
        assert_eq!(visual.remove_components(ComponentKind::Tint), 2);
    }

    #[test]
    fn expired_component_detaches_on_update() {
        let mut loader = textures();
        let mut visual = sprite();
        let expired_kind = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&expired_kind);
        visual
            .add_component(
                Component::new(Tint::new(Vec4::ONE))
                    .with_lifespan(0.5)
                    .on_expired(move |kind| *sink.borrow_mut() = Some(kind)),
                &mut loader,
            )
            .unwrap();

        visual.update(0.25);
        assert!(visual.has(ComponentKind::Tint));
        visual.update(0.5);
        assert!(!visual.has(ComponentKind::Tint));
        assert_eq!(*expired_kind.borrow(), Some(ComponentKind::Tint));
    }

    #[test]
    fn button_click_cycle() {
        let mut loader = textures();
        let mut visual = widget();
        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        visual
            .add_component(Component::new(Texture::new("atlas.png")), &mut loader)
            .unwrap();
        visual
            .add_component(
                Component::new(Button::new(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(0.0, 40.0))),
                &mut loader,
            )
            .unwrap();
        visual
            .add_component(Component::new(ClickHandler::new(move || counter.set(counter.get() + 1))), &mut loader)
            .unwrap();

        visual.on_mouse_enter();
        assert_eq!(visual.button().unwrap().state, ButtonState::Over);
        visual.on_mouse_button(MouseButton::Left, KeyState::Down);
        assert_eq!(visual.button().unwrap().state, ButtonState::Pressed);
        visual.on_mouse_button(MouseButton::Left, KeyState::Up);
        assert_eq!(visual.button().unwrap().state, ButtonState::Over);
        assert_eq!(clicks.get(), 1);

        // Pressing then leaving cancels the click.
        visual.on_mouse_button(MouseButton::Left, KeyState::Down);
        visual.on_mouse_leave();
        visual.on_mouse_button(MouseButton::Left, KeyState::Up);
        assert_eq!(clicks.get(), 1);
        assert_eq!(visual.button().unwrap().state, ButtonState::Idle);
    }

    #[test]
    fn checkbox_toggles_and_reports_state() {
        let mut loader = textures();
        let mut visual = widget();
        let reported = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reported);
        visual
            .add_component(Component::new(Texture::new("atlas.png")), &mut loader)
            .unwrap();
        visual
            .add_component(
                Component::new(Checkbox::new(
                    Vec2::ZERO,
                    Vec2::new(100.0, 0.0),
                    Vec2::new(0.0, 40.0),
                    Vec2::new(100.0, 40.0),
                )),
                &mut loader,
            )
            .unwrap();
        visual
            .add_component(Component::new(CheckHandler::new(move |c| sink.borrow_mut().push(c))), &mut loader)
            .unwrap();

        visual.on_mouse_enter();
        for _ in 0..2 {
            visual.on_mouse_button(MouseButton::Left, KeyState::Down);
            visual.on_mouse_button(MouseButton::Left, KeyState::Up);
        }
        assert_eq!(*reported.borrow(), vec![true, false]);
    }

    #[test]
    fn disabled_widget_ignores_clicks() {
        let mut loader = textures();
        let mut visual = widget();
        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        visual
            .add_component(Component::new(ClickHandler::new(move || counter.set(counter.get() + 1))), &mut loader)
            .unwrap();
        visual.set_disabled(true);
        visual.on_mouse_enter();
        visual.on_mouse_button(MouseButton::Left, KeyState::Down);
        visual.on_mouse_button(MouseButton::Left, KeyState::Up);
        assert_eq!(clicks.get(), 0);
    }

    #[test]
    fn hit_test_uses_center_and_size() {
        // centered at (50, 50), 100 x 40: spans x 0..100, y 30..70
        let visual = widget();
        assert!(visual.contains_point(50.0, 50.0));
        assert!(visual.contains_point(0.0, 30.0), "left-top corner is inside");
        assert!(visual.contains_point(99.9, 69.9));
        assert!(!visual.contains_point(100.0, 50.0), "right edge is outside");
        assert!(!visual.contains_point(50.0, 70.0), "bottom edge is outside");
        assert!(!visual.contains_point(-0.1, 50.0));
    }
}
