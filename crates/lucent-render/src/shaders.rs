//! Named shader sources.
//!
//! Each renderer compiles its vertex and pixel entry points from one named
//! source. Sources come from a directory of `*.shader` files or are inserted
//! directly; [`ShaderLibrary::with_placeholders`] provides stubs with the
//! right entry points for device-free runs.

use std::collections::BTreeMap;
use std::path::Path;

use crate::backend::{GpuBackend, ShaderHandle, ShaderStage};
use crate::{RenderError, ResultExt};

pub const COLORED_SPRITE: &str = "ColoredSprite2d.shader";
pub const TEXTURED_SPRITE: &str = "TexturedSprite2d.shader";
pub const ANIMATED_SPRITE: &str = "AnimatedSprite2d.shader";
pub const TILED_SPRITE: &str = "TiledSprite2d.shader";
pub const BASIC_PARTICLES: &str = "BasicParticles2d.shader";
pub const WIDGET: &str = "Widget2d.shader";

/// Every source the built-in renderers need.
pub const REQUIRED: [&str; 6] = [
    COLORED_SPRITE,
    TEXTURED_SPRITE,
    ANIMATED_SPRITE,
    TILED_SPRITE,
    BASIC_PARTICLES,
    WIDGET,
];

pub const VS_ENTRY: &str = "VShader";
pub const VS_TARGET: &str = "vs_4_0";
pub const PS_ENTRY: &str = "PShader";
pub const PS_TARGET: &str = "ps_4_0";

const EXTENSION: &str = "shader";

#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    sources: BTreeMap<String, String>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub sources declaring both entry points, for headless rendering.
    pub fn with_placeholders() -> Self {
        let mut library = Self::new();
        for name in REQUIRED {
            library.insert(name, format!("// {name}\nvoid {VS_ENTRY}() {{}}\nvoid {PS_ENTRY}() {{}}\n"));
        }
        library
    }

    /// Load every `*.shader` file in `dir`, keyed by file name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, RenderError> {
        let dir = dir.as_ref();
        let read_err = |e: std::io::Error| RenderError::Config {
            details: format!("cannot read shader directory {}: {e}", dir.display()),
        };
        let mut library = Self::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|e| RenderError::Config {
                details: format!("cannot read shader {}: {e}", path.display()),
            })?;
            library.insert(name, source);
        }
        tracing::debug!(dir = %dir.display(), shaders = library.len(), "shader library loaded");
        Ok(library)
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(name.into(), source.into());
    }

    pub fn get(&self, name: &str) -> Result<&str, RenderError> {
        self.sources
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RenderError::MissingShader { name: name.to_owned() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Compile the vertex and pixel shaders of `name`.
    pub fn compile<B: GpuBackend>(
        &self,
        backend: &mut B,
        name: &str,
    ) -> Result<(ShaderHandle, ShaderHandle), RenderError> {
        let source = self.get(name)?;
        let vs = backend
            .compile_shader(source, VS_ENTRY, VS_TARGET, ShaderStage::Vertex)
            .context(format!("ShaderLibrary::compile({name}, {VS_ENTRY})"))?;
        let ps = backend
            .compile_shader(source, PS_ENTRY, PS_TARGET, ShaderStage::Pixel)
            .context(format!("ShaderLibrary::compile({name}, {PS_ENTRY})"))?;
        Ok((vs, ps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingBackend;

    #[test]
    fn placeholders_cover_every_required_shader() {
        let library = ShaderLibrary::with_placeholders();
        for name in REQUIRED {
            assert!(library.contains(name), "{name} missing");
        }
        let mut gpu = RecordingBackend::new();
        assert!(library.compile(&mut gpu, WIDGET).is_ok());
    }

    #[test]
    fn missing_shader_is_reported_by_name() {
        let library = ShaderLibrary::new();
        let err = library.get(TILED_SPRITE).unwrap_err();
        assert_eq!(err.to_string(), "shader 'TiledSprite2d.shader' not found in the shader library");
    }

    #[test]
    fn compile_without_pixel_entry_fails_with_context() {
        let mut library = ShaderLibrary::new();
        library.insert(COLORED_SPRITE, "void VShader() {}");
        let mut gpu = RecordingBackend::new();
        let err = library.compile(&mut gpu, COLORED_SPRITE).unwrap_err();
        assert!(err
            .to_string()
            .ends_with("> ShaderLibrary::compile(ColoredSprite2d.shader, PShader)"));
    }

    #[test]
    fn from_dir_loads_only_shader_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WIDGET), "void VShader() {} void PShader() {}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let library = ShaderLibrary::from_dir(dir.path()).unwrap();
        assert_eq!(library.names().collect::<Vec<_>>(), vec![WIDGET]);
    }

    #[test]
    fn from_missing_dir_is_a_config_error() {
        let err = ShaderLibrary::from_dir("/nonexistent/shaders").unwrap_err();
        assert!(matches!(err, RenderError::Config { .. }));
    }
}
