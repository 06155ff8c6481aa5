//! Lucent Visual -- component model and world registry for 2D visuals.
//!
//! A [`Visual`](visual::Visual) is a sprite or widget that owns an ordered list
//! of typed [`Component`](component::Component)s. The set of component kinds
//! attached to a visual is its [`FeatureSet`](component::FeatureSet), which the
//! render crate uses to pick exactly one renderer per visual. Visuals live in a
//! [`World`](world::World), which hands out generational
//! [`VisualId`](handle::VisualId)s so GPU-side caches can be keyed safely.
//!
//! # Quick Start
//!
//! ```
//! use lucent_visual::prelude::*;
//! use glam::{Vec2, Vec4};
//!
//! let mut textures = InMemoryTextures::new();
//! textures.insert("ball.png", Vec2::new(64.0, 64.0));
//!
//! let mut world = World::new();
//! let ball = world.add_sprite(VisualDesc::at(200.0, 200.0, 0.0).size(32.0, 32.0)).unwrap();
//! world
//!     .helper(&mut textures)
//!     .texture("ball.png").unwrap()
//!     .tint(Vec4::new(1.0, 0.5, 0.5, 1.0)).unwrap();
//!
//! let features = world.get(ball).unwrap().features();
//! assert!(features.contains(ComponentKind::Texture));
//! assert!(features.contains(ComponentKind::Tint));
//! ```

#![deny(unsafe_code)]

pub mod camera;
pub mod component;
pub mod handle;
pub mod helper;
pub mod scale;
pub mod texture;
pub mod tiled;
pub mod visual;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by visual and world operations.
#[derive(Debug, thiserror::Error)]
pub enum VisualError {
    /// A caller passed something unusable: an empty payload, a missing
    /// prerequisite component, a visual of the wrong kind.
    #[error("invalid argument: {details}")]
    InvalidArgument { details: String },

    /// A resource (visual slot, texture) could not be created.
    #[error("cannot create {resource}: {details}")]
    ResourceCreation { resource: String, details: String },

    /// The visual does not exist (stale generation or never allocated).
    #[error("visual {id} does not exist (stale or never allocated)")]
    StaleVisual { id: handle::VisualId },

    /// A tiled map document could not be read or is malformed.
    #[error("tiled map error: {details}")]
    TiledParse { details: String },

    /// An inner error annotated with the call site it passed through.
    #[error("{source} > {location}")]
    Context {
        location: String,
        source: Box<VisualError>,
    },
}

impl VisualError {
    /// Shorthand for [`VisualError::InvalidArgument`].
    pub fn invalid(details: impl Into<String>) -> Self {
        Self::InvalidArgument {
            details: details.into(),
        }
    }

    /// Shorthand for [`VisualError::ResourceCreation`].
    pub fn resource(resource: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ResourceCreation {
            resource: resource.into(),
            details: details.into(),
        }
    }

    /// The innermost error, with every context layer peeled off.
    pub fn root(&self) -> &VisualError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the root cause is a caller bug (bad argument or stale handle).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self.root(),
            Self::InvalidArgument { .. } | Self::StaleVisual { .. }
        )
    }
}

/// Appends call-site context to a failing result.
///
/// Each layer that forwards an error adds its location, so the final message
/// reads `"<message> > <inner location> > <outer location>"`.
pub trait ResultExt<T> {
    fn context(self, location: impl Into<String>) -> Result<T, VisualError>;
}

impl<T> ResultExt<T> for Result<T, VisualError> {
    fn context(self, location: impl Into<String>) -> Result<T, VisualError> {
        self.map_err(|source| VisualError::Context {
            location: location.into(),
            source: Box::new(source),
        })
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::camera::Camera;
    pub use crate::component::{
        Button, ButtonState, CheckHandler, Checkbox, ClickHandler, Component, ComponentData,
        ComponentId, ComponentKind, CustomUv, FeatureSet, FontWeight, FrameAnimation,
        ParticleSettings, Particles, Text, TextAlignment, Texture, Tiled, Tint, VertexColors,
    };
    pub use crate::handle::VisualId;
    pub use crate::helper::VisualHelper;
    pub use crate::scale::{ScaleEntry, WorldScale, WorldScaleConfig};
    pub use crate::texture::{InMemoryTextures, TextureHandle, TextureInfo, TextureLoader};
    pub use crate::tiled::{layers, CollisionBox, TileQuad, TiledMap, TiledObject};
    pub use crate::visual::{KeyState, MouseButton, Visual, VisualDesc, VisualKind, INVALID_TAG};
    pub use crate::world::{DefaultVisualCreator, VisualCreator, World};
    pub use crate::{ResultExt, VisualError};
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
