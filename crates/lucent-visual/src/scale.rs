//! Resolution-dependent UI scale.
//!
//! [`WorldScale`] maps a screen height to a 2D scale factor using a small
//! table of reference heights. Lookup prefers an exact height, then the first
//! entry at least as tall as the screen (so UI never shrinks between table
//! entries), then the first entry, then the built-in default of 1080 -> 1.0.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One row of the scale table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleEntry {
    /// Reference screen height in pixels.
    pub height: u32,
    pub scale: Vec2,
}

/// Serialized form of a scale table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldScaleConfig {
    #[serde(default)]
    pub scale_fonts: bool,
    #[serde(default)]
    pub entries: Vec<ScaleEntry>,
}

pub type ScaleListener = Box<dyn FnMut(Vec2)>;

/// Resolution to scale mapping plus the currently applied scale.
pub struct WorldScale {
    entries: Vec<ScaleEntry>,
    current: Option<Vec2>,
    scale_fonts: bool,
    listeners: Vec<ScaleListener>,
}

impl WorldScale {
    /// The entry used when the table is empty.
    pub const DEFAULT_ENTRY: ScaleEntry = ScaleEntry {
        height: 1080,
        scale: Vec2::ONE,
    };

    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            current: None,
            scale_fonts: false,
            listeners: Vec::new(),
        }
    }

    /// Build from a config; the applied scale starts unset.
    pub fn from_config(config: &WorldScaleConfig) -> Self {
        let mut scale = Self::new();
        scale.apply_config(config);
        scale
    }

    /// Replace the table and flags, keeping listeners and the applied scale.
    pub fn apply_config(&mut self, config: &WorldScaleConfig) {
        self.entries = config.entries.clone();
        self.scale_fonts = config.scale_fonts;
    }

    /// Append a table entry. Order matters: lookup scans front to back.
    pub fn add_entry(&mut self, height: u32, scale: Vec2) {
        self.entries.push(ScaleEntry { height, scale });
    }

    pub fn entries(&self) -> &[ScaleEntry] {
        &self.entries
    }

    /// The applied scale, or the default entry's until the first update.
    pub fn scale(&self) -> Vec2 {
        self.current.unwrap_or(Self::DEFAULT_ENTRY.scale)
    }

    pub fn scale_fonts(&self) -> bool {
        self.scale_fonts
    }

    pub fn set_scale_fonts(&mut self, scale_fonts: bool) {
        self.scale_fonts = scale_fonts;
    }

    /// Register a callback fired whenever the applied scale changes.
    pub fn on_change(&mut self, listener: impl FnMut(Vec2) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Resolve the scale for a screen height without applying it.
    pub fn lookup(&self, screen_height: u32) -> Vec2 {
        self.entries
            .iter()
            .find(|e| e.height == screen_height)
            .or_else(|| self.entries.iter().find(|e| e.height >= screen_height))
            .or_else(|| self.entries.first())
            .unwrap_or(&Self::DEFAULT_ENTRY)
            .scale
    }

    /// Apply the scale for `screen_size`, notifying listeners on change.
    ///
    /// Returns `true` if the applied scale changed.
    pub fn update(&mut self, screen_size: Vec2) -> bool {
        let scale = self.lookup(screen_size.y.max(0.0) as u32);
        if self.current == Some(scale) {
            return false;
        }
        self.current = Some(scale);
        tracing::info!(
            width = screen_size.x,
            height = screen_size.y,
            scale_x = scale.x,
            scale_y = scale.y,
            "world scale changed"
        );
        for listener in &mut self.listeners {
            listener(scale);
        }
        true
    }
}

impl Default for WorldScale {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WorldScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldScale")
            .field("entries", &self.entries)
            .field("current", &self.current)
            .field("scale_fonts", &self.scale_fonts)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
