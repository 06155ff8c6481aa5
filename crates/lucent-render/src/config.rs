//! Render system configuration.
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes:
//!
//! ```
//! use lucent_render::config::RenderConfig;
//!
//! let config = RenderConfig::from_json_str(r#"{ "width": 1280, "height": 720 }"#).unwrap();
//! assert_eq!((config.width, config.height), (1280, 720));
//! assert_eq!(config.particle_seed, RenderConfig::default().particle_seed);
//! ```

use std::path::{Path, PathBuf};

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::RenderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    pub clear_color: [f32; 4],
    /// Directory of `*.shader` sources; `None` uses whatever library the
    /// caller passes in.
    pub shader_dir: Option<PathBuf>,
    /// Base directory for relative texture paths.
    pub texture_dir: Option<PathBuf>,
    /// Seed for particle placement.
    pub particle_seed: u64,
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            shader_dir: None,
            texture_dir: None,
            particle_seed: 0x5EED,
            vsync: true,
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        let config: Self = serde_json::from_str(json).map_err(|e| RenderError::Config {
            details: format!("malformed render config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| RenderError::Config {
            details: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, RenderError> {
        serde_json::to_string_pretty(self).map_err(|e| RenderError::Config {
            details: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::Config {
                details: format!("viewport {}x{} is empty", self.width, self.height),
            });
        }
        Ok(())
    }

    pub fn clear_color(&self) -> Vec4 {
        Vec4::from_array(self.clear_color)
    }
}
