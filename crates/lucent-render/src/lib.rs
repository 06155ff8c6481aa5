//! Lucent Render -- capability-matched 2D rendering over an opaque GPU backend.
//!
//! This crate draws a [`lucent_visual::world::World`] each frame. Every
//! visible sprite is matched, by its feature set, to exactly one renderer
//! kind (colored, textured, animated, tiled or particles); widgets go through
//! a separate widget pass drawn after all sprites. GPU access goes through the
//! [`GpuBackend`](backend::GpuBackend) trait; [`RecordingBackend`](headless::RecordingBackend)
//! implements it without a device by recording every call.
//!
//! # Quick Start
//!
//! ```
//! use lucent_render::prelude::*;
//! use lucent_visual::prelude::*;
//! use glam::Vec4;
//!
//! let mut system = RenderSystem::new(
//!     RecordingBackend::new(),
//!     RenderConfig::default(),
//!     ShaderLibrary::with_placeholders(),
//! )
//! .unwrap();
//!
//! let mut world = World::new();
//! world.add_sprite(VisualDesc::at(200.0, 200.0, 0.0).size(300.0, 300.0)).unwrap();
//! world.helper(&mut system.textures()).tint(Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();
//!
//! let stats = system.render(&mut world, 0.0).unwrap();
//! assert_eq!(stats.sprites_drawn, 1);
//! assert_eq!(stats.draws[0].renderer, RendererKind::Colored);
//! ```

#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod frame;
pub mod geometry;
pub mod headless;
pub mod math;
pub mod renderers;
pub mod shaders;
pub mod texture;

use lucent_visual::component::FeatureSet;
use lucent_visual::handle::VisualId;
use lucent_visual::VisualError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures reported by a [`GpuBackend`](backend::GpuBackend).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// A buffer, shader, input layout or texture could not be created.
    #[error("cannot create {resource}: {details}")]
    ResourceCreation { resource: String, details: String },

    /// A handle that the backend never issued or already released.
    #[error("invalid {kind} handle {handle}")]
    InvalidHandle { kind: &'static str, handle: u64 },

    #[error("device lost")]
    DeviceLost,
}

/// Errors produced while building or running the render system.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Visual(#[from] VisualError),

    /// No renderer claims a visual's feature set.
    #[error("no renderer supports features {features}")]
    MissingCapability { features: FeatureSet },

    /// More than one renderer claims a feature set.
    #[error("features {features} are claimed by several renderers: {renderers}")]
    AmbiguousCapability { features: FeatureSet, renderers: String },

    #[error("shader '{name}' not found in the shader library")]
    MissingShader { name: String },

    /// A stateful renderer was asked to draw a visual it never set up.
    #[error("no cached geometry for visual {id}")]
    MissingGeometry { id: VisualId },

    /// `insert` under a path that is already cached.
    #[error("texture '{path}' is already loaded")]
    TextureExists { path: String },

    /// Replacing a texture that live visuals still hold.
    #[error("texture '{path}' is held by {users} visual(s)")]
    TextureInUse { path: String, users: usize },

    #[error("invalid configuration: {details}")]
    Config { details: String },

    /// An inner error annotated with the call site it passed through.
    #[error("{source} > {location}")]
    Context {
        location: String,
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// The innermost error, with every context layer peeled off.
    pub fn root(&self) -> &RenderError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Appends call-site context to a failing result.
///
/// Each layer that forwards an error adds its location, so a top-level
/// handler sees `"<message> > <inner location> > <outer location>"`.
pub trait ResultExt<T> {
    fn context(self, location: impl Into<String>) -> Result<T, RenderError>;
}

impl<T, E: Into<RenderError>> ResultExt<T> for Result<T, E> {
    fn context(self, location: impl Into<String>) -> Result<T, RenderError> {
        self.map_err(|e| RenderError::Context {
            location: location.into(),
            source: Box::new(e.into()),
        })
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::backend::{
        BindFlags, BufferDesc, BufferHandle, BufferUsage, GpuBackend, InputElement,
        InputLayoutHandle, ShaderHandle, ShaderStage, Topology, VertexFormat,
    };
    pub use crate::config::RenderConfig;
    pub use crate::constants::ConstantBuffers;
    pub use crate::dispatch::{BindingState, DrawRecord, FrameStats, RenderSystem};
    pub use crate::frame::{FrameConfig, FrameDiagnostics, FrameLoop};
    pub use crate::geometry::{GeometryCache, GeometryEntry};
    pub use crate::headless::{FailurePoint, GpuCommand, RecordingBackend};
    pub use crate::renderers::{validate_renderers, RendererKind, Visual2DRenderer};
    pub use crate::shaders::ShaderLibrary;
    pub use crate::texture::{TextureCache, TextureLoading};
    pub use crate::{BackendError, RenderError, ResultExt};
}
