//! Typed visual components and feature sets.
//!
//! Every [`Component`] wraps one [`ComponentData`] payload whose
//! [`ComponentKind`] never changes. A visual's [`FeatureSet`] is the set of
//! kinds currently attached; renderers match on it.
//!
//! Components do not point back at their owner. Anything `init` needs from
//! the owning visual (its size, the texture attached before this component)
//! arrives through an explicit [`InitContext`].

use std::fmt;
use std::path::PathBuf;

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::texture::{TextureHandle, TextureLoader};
use crate::tiled::{CollisionBox, TileQuad, TiledMap, TiledObject};
use crate::VisualError;

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// Discriminant of a component payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ComponentKind {
    Tint = 0,
    VertexColor = 1,
    Texture = 2,
    CustomUv = 3,
    FrameAnimation = 4,
    Tiled = 5,
    Particles = 6,
    Text = 7,
    Button = 8,
    Checkbox = 9,
    ClickHandler = 10,
    CheckHandler = 11,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 12] = [
        Self::Tint,
        Self::VertexColor,
        Self::Texture,
        Self::CustomUv,
        Self::FrameAnimation,
        Self::Tiled,
        Self::Particles,
        Self::Text,
        Self::Button,
        Self::Checkbox,
        Self::ClickHandler,
        Self::CheckHandler,
    ];

    /// Kinds that decide which sprite renderer draws a visual.
    pub const SPRITE_KINDS: [ComponentKind; 7] = [
        Self::Tint,
        Self::VertexColor,
        Self::Texture,
        Self::CustomUv,
        Self::FrameAnimation,
        Self::Tiled,
        Self::Particles,
    ];

    #[inline]
    pub fn bit(self) -> u16 {
        1 << self as u16
    }

    /// Whether `init` needs a texture component attached first.
    pub fn requires_texture(self) -> bool {
        matches!(
            self,
            Self::FrameAnimation | Self::Tiled | Self::Particles | Self::Button | Self::Checkbox
        )
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// FeatureSet
// ---------------------------------------------------------------------------

/// A set of [`ComponentKind`]s stored as a bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct FeatureSet(u16);

impl FeatureSet {
    pub const EMPTY: FeatureSet = FeatureSet(0);

    const VALID: u16 = (1 << ComponentKind::ALL.len()) - 1;

    /// Build from raw bits, dropping bits that name no kind.
    pub fn from_bits(bits: u16) -> Self {
        Self(bits & Self::VALID)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    /// Copy of `self` with `kind` added.
    pub fn with(mut self, kind: ComponentKind) -> Self {
        self.insert(kind);
        self
    }

    /// Copy of `self` restricted to kinds in `mask`.
    pub fn intersection(self, mask: FeatureSet) -> Self {
        Self(self.0 & mask.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ComponentKind> {
        ComponentKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<ComponentKind> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = ComponentKind>>(iter: I) -> Self {
        let mut set = FeatureSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, kind) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{kind}")?;
        }
        write!(f, "}}")
    }
}

// ---------------------------------------------------------------------------
// ComponentId
// ---------------------------------------------------------------------------

/// Identifies a component within its owning visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Id carried by a component that has not been attached yet.
    pub const UNASSIGNED: ComponentId = ComponentId(u32::MAX);

    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Uniform color for all four corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    pub color: Vec4,
}

impl Tint {
    pub fn new(color: Vec4) -> Self {
        Self { color }
    }

    pub fn data(&self) -> [Vec4; 4] {
        [self.color; 4]
    }
}

/// Per-corner colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexColors {
    pub left_top: Vec4,
    pub right_top: Vec4,
    pub right_bottom: Vec4,
    pub left_bottom: Vec4,
}

impl VertexColors {
    pub fn data(&self) -> [Vec4; 4] {
        [self.left_top, self.right_top, self.right_bottom, self.left_bottom]
    }
}

/// A texture resolved through the [`TextureLoader`] at init.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub path: String,
    /// Pixel size reported by the loader; zero until attached.
    pub size: Vec2,
    pub handle: Option<TextureHandle>,
}

impl Texture {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: Vec2::ZERO,
            handle: None,
        }
    }
}

/// Explicit per-corner texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomUv {
    pub left_top: Vec2,
    pub right_top: Vec2,
    pub right_bottom: Vec2,
    pub left_bottom: Vec2,
}

impl Default for CustomUv {
    fn default() -> Self {
        Self {
            left_top: Vec2::new(0.0, 0.0),
            right_top: Vec2::new(1.0, 0.0),
            right_bottom: Vec2::new(1.0, 1.0),
            left_bottom: Vec2::new(0.0, 1.0),
        }
    }
}

impl CustomUv {
    pub fn new(left_top: Vec2, right_top: Vec2, right_bottom: Vec2, left_bottom: Vec2) -> Self {
        Self {
            left_top,
            right_top,
            right_bottom,
            left_bottom,
        }
    }

    pub fn corners(&self) -> UvQuad {
        [self.left_top, self.right_top, self.right_bottom, self.left_bottom]
    }

    /// Corners widened to vec4 for the constant buffer.
    pub fn data(&self) -> [Vec4; 4] {
        [self.left_top, self.right_top, self.right_bottom, self.left_bottom]
            .map(|uv| uv.extend(0.0).extend(0.0))
    }
}

/// Flip-book animation over equally sized frames laid out row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnimation {
    pub frame_size: Vec2,
    pub num_frames: u16,
    pub frames_per_second: f32,
    pub current_frame: u16,
    elapsed: f32,
    texture_size: Vec2,
}

impl FrameAnimation {
    pub fn new(frame_size: Vec2, num_frames: u16, frames_per_second: f32) -> Self {
        Self {
            frame_size,
            num_frames,
            frames_per_second,
            current_frame: 0,
            elapsed: 0.0,
            texture_size: Vec2::ZERO,
        }
    }

    /// `[frame_w, frame_h, offset_u, offset_v]`, all relative to the texture.
    pub fn anim_data(&self) -> Vec4 {
        if self.texture_size.x <= 0.0 || self.texture_size.y <= 0.0 {
            return Vec4::ZERO;
        }
        let columns = ((self.texture_size.x / self.frame_size.x) as u16).max(1);
        let column = self.current_frame % columns;
        let row = self.current_frame / columns;
        let rel = self.frame_size / self.texture_size;
        Vec4::new(rel.x, rel.y, column as f32 * rel.x, row as f32 * rel.y)
    }

    fn advance(&mut self, delta_seconds: f32) {
        if self.num_frames == 0 || self.frames_per_second <= 0.0 {
            return;
        }
        let frame_time = 1.0 / self.frames_per_second;
        self.elapsed += delta_seconds;
        while self.elapsed >= frame_time {
            self.elapsed -= frame_time;
            self.current_frame = (self.current_frame + 1) % self.num_frames;
        }
    }
}

/// Where a tiled map document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TiledSource {
    File(PathBuf),
    Inline(String),
}

pub type ObjectHandler = Box<dyn FnMut(&str, &TiledObject)>;

/// A tile map drawn from the owner's texture atlas.
pub struct Tiled {
    pub source: TiledSource,
    /// Tile layers to draw; empty means all.
    pub layer_names: Vec<String>,
    /// Scale applied to map pixels when drawing.
    pub scale: Vec2,
    /// Generated at init.
    pub tiles: Vec<TileQuad>,
    /// Generated at init from the collision layer.
    pub collision_boxes: Vec<CollisionBox>,
    object_handler: Option<ObjectHandler>,
}

impl Tiled {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::with_source(TiledSource::File(path.into()))
    }

    pub fn from_json(json: impl Into<String>) -> Self {
        Self::with_source(TiledSource::Inline(json.into()))
    }

    fn with_source(source: TiledSource) -> Self {
        Self {
            source,
            layer_names: Vec::new(),
            scale: Vec2::ONE,
            tiles: Vec::new(),
            collision_boxes: Vec::new(),
            object_handler: None,
        }
    }

    pub fn layers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layer_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Called once per object-group object, with the layer name, at init.
    pub fn on_object(mut self, handler: impl FnMut(&str, &TiledObject) + 'static) -> Self {
        self.object_handler = Some(Box::new(handler));
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.tiles.len() * 6
    }
}

impl fmt::Debug for Tiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tiled")
            .field("source", &self.source)
            .field("layer_names", &self.layer_names)
            .field("scale", &self.scale)
            .field("tiles", &self.tiles.len())
            .field("collision_boxes", &self.collision_boxes.len())
            .finish()
    }
}

/// Emitter tuning. Negative lifetime and fade rates mean "off".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    /// Size of one particle frame on the texture, in pixels.
    pub frame_size: Vec2,
    pub num_frames: u16,
    /// Seconds; `-1` lives forever.
    pub lifetime: f32,
    /// Fade-in as a fraction of lifetime; `-1` disables.
    pub fade_in_rate: f32,
    /// Fade-out as a fraction of lifetime; `-1` disables.
    pub fade_out_rate: f32,
    pub speed: f32,
    /// Wander distance around the spawn point, in pixels.
    pub movement_radius: f32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            frame_size: Vec2::ZERO,
            num_frames: 0,
            lifetime: -1.0,
            fade_in_rate: -1.0,
            fade_out_rate: -1.0,
            speed: 1.0,
            movement_radius: 16.0,
        }
    }
}

/// Randomly placed particles that wander around their spawn points.
#[derive(Debug, Clone, PartialEq)]
pub struct Particles {
    pub count: u16,
    pub settings: ParticleSettings,
    texture_size: Vec2,
}

impl Particles {
    pub fn new(count: u16, settings: ParticleSettings) -> Self {
        Self {
            count,
            settings,
            texture_size: Vec2::ZERO,
        }
    }

    /// Size of the owner's texture, captured at init.
    pub fn texture_size(&self) -> Vec2 {
        self.texture_size
    }

    /// Frame columns and rows on the texture, at least one of each.
    pub fn atlas_grid(&self) -> (u32, u32) {
        let frame = self.settings.frame_size;
        let axis = |texture: f32, frame: f32| (if frame > 0.0 { (texture / frame) as u32 } else { 1 }).max(1);
        (axis(self.texture_size.x, frame.x), axis(self.texture_size.y, frame.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontWeight {
    Light,
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Text drawn over the visual. Rasterization belongs to the text collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    pub font_name: String,
    pub font_size: u16,
    pub weight: FontWeight,
    pub alignment: TextAlignment,
    pub color: Vec4,
}

impl Text {
    pub fn new(text: impl Into<String>, font_name: impl Into<String>, font_size: u16) -> Self {
        Self {
            text: text.into(),
            font_name: font_name.into(),
            font_size,
            weight: FontWeight::default(),
            alignment: TextAlignment::default(),
            color: Vec4::ONE,
        }
    }
}

/// UV quad `[left_top, right_top, right_bottom, left_bottom]`.
pub type UvQuad = [Vec2; 4];

fn atlas_uv(offset: Vec2, owner_size: Vec2, texture_size: Vec2) -> UvQuad {
    let lt = offset / texture_size;
    let rb = (offset + owner_size) / texture_size;
    [lt, Vec2::new(rb.x, lt.y), rb, Vec2::new(lt.x, rb.y)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ButtonState {
    #[default]
    Idle,
    Over,
    Pressed,
}

/// A push button whose three looks live in one texture atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    /// Pixel offsets of the idle/over/pressed images in the atlas.
    pub idle: Vec2,
    pub over: Vec2,
    pub pressed: Vec2,
    pub state: ButtonState,
    uvs: [UvQuad; 3],
}

impl Button {
    pub fn new(idle: Vec2, over: Vec2, pressed: Vec2) -> Self {
        Self {
            idle,
            over,
            pressed,
            state: ButtonState::Idle,
            uvs: [CustomUv::default().corners(); 3],
        }
    }

    /// UVs for the current state.
    pub fn uv(&self) -> UvQuad {
        self.uvs[self.state as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckboxState {
    #[default]
    Unchecked,
    UncheckedHovered,
    Checked,
    CheckedHovered,
}

/// A two-state toggle with hovered variants, four atlas images.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkbox {
    /// Pixel offsets indexed by [`CheckboxState`].
    pub offsets: [Vec2; 4],
    pub checked: bool,
    pub hovered: bool,
    uvs: [UvQuad; 4],
}

impl Checkbox {
    pub fn new(unchecked: Vec2, unchecked_hovered: Vec2, checked: Vec2, checked_hovered: Vec2) -> Self {
        Self {
            offsets: [unchecked, unchecked_hovered, checked, checked_hovered],
            checked: false,
            hovered: false,
            uvs: [CustomUv::default().corners(); 4],
        }
    }

    pub fn state(&self) -> CheckboxState {
        match (self.checked, self.hovered) {
            (false, false) => CheckboxState::Unchecked,
            (false, true) => CheckboxState::UncheckedHovered,
            (true, false) => CheckboxState::Checked,
            (true, true) => CheckboxState::CheckedHovered,
        }
    }

    pub fn uv(&self) -> UvQuad {
        self.uvs[self.state() as usize]
    }
}

/// Fired when a widget is clicked.
pub struct ClickHandler(pub Box<dyn FnMut()>);

impl ClickHandler {
    pub fn new(handler: impl FnMut() + 'static) -> Self {
        Self(Box::new(handler))
    }
}

impl fmt::Debug for ClickHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClickHandler")
    }
}

/// Fired with the new checked state when a checkbox toggles.
pub struct CheckHandler(pub Box<dyn FnMut(bool)>);

impl CheckHandler {
    pub fn new(handler: impl FnMut(bool) + 'static) -> Self {
        Self(Box::new(handler))
    }
}

impl fmt::Debug for CheckHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CheckHandler")
    }
}

// ---------------------------------------------------------------------------
// ComponentData
// ---------------------------------------------------------------------------

/// The payload of a component, one variant per [`ComponentKind`].
#[derive(Debug)]
pub enum ComponentData {
    Tint(Tint),
    VertexColors(VertexColors),
    Texture(Texture),
    CustomUv(CustomUv),
    FrameAnimation(FrameAnimation),
    Tiled(Tiled),
    Particles(Particles),
    Text(Text),
    Button(Button),
    Checkbox(Checkbox),
    ClickHandler(ClickHandler),
    CheckHandler(CheckHandler),
}

macro_rules! impl_from_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for ComponentData {
                fn from(payload: $variant) -> Self {
                    ComponentData::$variant(payload)
                }
            }
        )*
    };
}

impl_from_payload!(
    Tint,
    VertexColors,
    Texture,
    CustomUv,
    FrameAnimation,
    Tiled,
    Particles,
    Text,
    Button,
    Checkbox,
    ClickHandler,
    CheckHandler,
);

/// What `init` may read from the owning visual.
pub struct InitContext<'a> {
    pub owner_size: Vec2,
    /// The first texture component already attached to the owner.
    pub texture: Option<&'a Texture>,
    pub loader: &'a mut dyn TextureLoader,
}

impl InitContext<'_> {
    fn texture_size(&self, kind: ComponentKind) -> Result<Vec2, VisualError> {
        self.texture
            .map(|t| t.size)
            .ok_or_else(|| VisualError::invalid(format!("{kind} requires a texture component")))
    }
}

impl ComponentData {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Tint(_) => ComponentKind::Tint,
            Self::VertexColors(_) => ComponentKind::VertexColor,
            Self::Texture(_) => ComponentKind::Texture,
            Self::CustomUv(_) => ComponentKind::CustomUv,
            Self::FrameAnimation(_) => ComponentKind::FrameAnimation,
            Self::Tiled(_) => ComponentKind::Tiled,
            Self::Particles(_) => ComponentKind::Particles,
            Self::Text(_) => ComponentKind::Text,
            Self::Button(_) => ComponentKind::Button,
            Self::Checkbox(_) => ComponentKind::Checkbox,
            Self::ClickHandler(_) => ComponentKind::ClickHandler,
            Self::CheckHandler(_) => ComponentKind::CheckHandler,
        }
    }

    /// Reject payloads that cannot describe anything.
    pub fn validate(&self) -> Result<(), VisualError> {
        let reject = |details: &str| -> Result<(), VisualError> { Err(VisualError::invalid(details)) };
        match self {
            Self::Texture(t) if t.path.is_empty() => reject("texture path is empty"),
            Self::FrameAnimation(a) if a.frame_size.x <= 0.0 || a.frame_size.y <= 0.0 => {
                reject("animation frame size must be positive")
            }
            Self::FrameAnimation(a) if a.num_frames == 0 => reject("animation has no frames"),
            Self::FrameAnimation(a) if !(a.frames_per_second > 0.0) => {
                reject("animation frame rate must be positive")
            }
            Self::Particles(p) if p.count == 0 => reject("particle count is zero"),
            Self::Particles(p) if p.settings.frame_size.x <= 0.0 || p.settings.frame_size.y <= 0.0 => {
                reject("particle frame size must be positive")
            }
            Self::Tiled(t) if matches!(&t.source, TiledSource::File(p) if p.as_os_str().is_empty()) => {
                reject("tiled map path is empty")
            }
            Self::Tiled(t) if matches!(&t.source, TiledSource::Inline(s) if s.is_empty()) => {
                reject("tiled map document is empty")
            }
            _ => Ok(()),
        }
    }

    /// Resolve owner-dependent state. Runs once, before the component is
    /// attached; on error the owner is left untouched.
    pub fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), VisualError> {
        let kind = self.kind();
        match self {
            Self::Texture(texture) => {
                let info = ctx.loader.load_texture(&texture.path)?;
                texture.size = info.size;
                texture.handle = Some(info.handle);
            }
            Self::FrameAnimation(anim) => {
                anim.texture_size = ctx.texture_size(kind)?;
            }
            Self::Particles(particles) => {
                particles.texture_size = ctx.texture_size(kind)?;
                let (columns, rows) = particles.atlas_grid();
                if columns.checked_mul(rows).is_none() {
                    return Err(VisualError::invalid(format!(
                        "particle frame size {} splits the texture into {columns}x{rows} frames",
                        particles.settings.frame_size
                    )));
                }
            }
            Self::Tiled(tiled) => {
                let texture_size = ctx.texture_size(kind)?;
                let map = match &tiled.source {
                    TiledSource::File(path) => TiledMap::from_file(path)?,
                    TiledSource::Inline(json) => TiledMap::from_json(json)?,
                };
                let geometry = map.build(&tiled.layer_names, texture_size)?;
                if let Some(handler) = tiled.object_handler.as_mut() {
                    for (layer, object) in &geometry.objects {
                        handler(layer, object);
                    }
                }
                tracing::debug!(
                    tiles = geometry.tiles.len(),
                    collision_boxes = geometry.collision_boxes.len(),
                    "tiled map loaded"
                );
                tiled.tiles = geometry.tiles;
                tiled.collision_boxes = geometry.collision_boxes;
            }
            Self::Button(button) => {
                let texture_size = ctx.texture_size(kind)?;
                button.uvs = [button.idle, button.over, button.pressed]
                    .map(|offset| atlas_uv(offset, ctx.owner_size, texture_size));
            }
            Self::Checkbox(checkbox) => {
                let texture_size = ctx.texture_size(kind)?;
                checkbox.uvs = checkbox
                    .offsets
                    .map(|offset| atlas_uv(offset, ctx.owner_size, texture_size));
            }
            Self::Tint(_)
            | Self::VertexColors(_)
            | Self::CustomUv(_)
            | Self::Text(_)
            | Self::ClickHandler(_)
            | Self::CheckHandler(_) => {}
        }
        Ok(())
    }

    fn update(&mut self, delta_seconds: f32) {
        if let Self::FrameAnimation(anim) = self {
            anim.advance(delta_seconds);
        }
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

pub type ExpiredHandler = Box<dyn FnMut(ComponentKind)>;

/// A payload plus its lifetime bookkeeping.
pub struct Component {
    id: ComponentId,
    data: ComponentData,
    /// Seconds left; negative means infinite.
    lifespan: f32,
    on_expired: Option<ExpiredHandler>,
}

impl Component {
    pub fn new(data: impl Into<ComponentData>) -> Self {
        Self {
            id: ComponentId::UNASSIGNED,
            data: data.into(),
            lifespan: -1.0,
            on_expired: None,
        }
    }

    /// Detach automatically after `seconds` of updates.
    pub fn with_lifespan(mut self, seconds: f32) -> Self {
        self.lifespan = seconds;
        self
    }

    /// Called with the component's kind just before it detaches on expiry.
    pub fn on_expired(mut self, handler: impl FnMut(ComponentKind) + 'static) -> Self {
        self.on_expired = Some(Box::new(handler));
        self
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ComponentData {
        &mut self.data
    }

    pub fn lifespan(&self) -> f32 {
        self.lifespan
    }

    pub(crate) fn assign_id(&mut self, id: ComponentId) {
        self.id = id;
    }

    /// Advance by `delta_seconds`. Returns `true` once the lifespan runs out.
    pub(crate) fn update(&mut self, delta_seconds: f32) -> bool {
        self.data.update(delta_seconds);
        if self.lifespan >= 0.0 {
            if self.lifespan - delta_seconds <= 0.0 {
                self.lifespan = -1.0;
                if let Some(handler) = self.on_expired.as_mut() {
                    handler(self.data.kind());
                }
                return true;
            }
            self.lifespan -= delta_seconds;
        }
        false
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("data", &self.data)
            .field("lifespan", &self.lifespan)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
