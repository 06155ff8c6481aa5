//! Update-then-render frame loop.
//!
//! The [`FrameLoop`] owns a [`World`] and a [`RenderSystem`]. Each frame:
//!
//! 1. Registered hooks run in registration order with the world and the
//!    frame's delta seconds (game logic, input replay, ...).
//! 2. The world updates: component lifespans and animation frames advance.
//! 3. Game time advances by the fixed delta.
//! 4. The render system draws the world at the new game time.
//!
//! Game time is `frame_count * fixed_dt`, so it does not drift.
//!
//! # Example
//!
//! ```
//! use lucent_render::prelude::*;
//! use lucent_visual::prelude::*;
//!
//! let system = RenderSystem::new(
//!     RecordingBackend::new(),
//!     RenderConfig::default(),
//!     ShaderLibrary::with_placeholders(),
//! )
//! .unwrap();
//! let mut frames = FrameLoop::new(World::new(), system, FrameConfig::default());
//!
//! frames.add_hook("spawn", |world, _dt| {
//!     if world.is_empty() {
//!         world.add_sprite(VisualDesc::at(0.0, 0.0, 0.0).size(8.0, 8.0)).unwrap();
//!     }
//! });
//!
//! frames.run_frames(10).unwrap();
//! assert_eq!(frames.frame_count(), 10);
//! assert_eq!(frames.last_stats().sprites_drawn, 1);
//! ```

use std::time::{Duration, Instant};

use lucent_visual::world::World;

use crate::backend::GpuBackend;
use crate::dispatch::{FrameStats, RenderSystem};
use crate::RenderError;

// ---------------------------------------------------------------------------
// FrameConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Seconds per frame. Must be positive and finite.
    pub fixed_dt: f64,
    /// Skip rendering; only hooks and world updates run.
    pub headless: bool,
}

impl Default for FrameConfig {
    /// 60 frames per second, rendering on.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            headless: false,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing of the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time per hook, in execution order.
    pub hook_times: Vec<(String, Duration)>,
    pub world_update_time: Duration,
    pub render_time: Duration,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

type FrameHook = Box<dyn FnMut(&mut World, f32)>;

pub struct FrameLoop<B: GpuBackend> {
    world: World,
    system: RenderSystem<B>,
    config: FrameConfig,
    hooks: Vec<(String, FrameHook)>,
    frame_count: u64,
    last_diagnostics: FrameDiagnostics,
}

impl<B: GpuBackend> FrameLoop<B> {
    pub fn new(world: World, system: RenderSystem<B>, config: FrameConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            world,
            system,
            config,
            hooks: Vec::new(),
            frame_count: 0,
            last_diagnostics: FrameDiagnostics::default(),
        }
    }

    /// Register a hook run at the start of every frame.
    ///
    /// # Panics
    ///
    /// Panics if a hook with the same name is already registered.
    pub fn add_hook(&mut self, name: &str, hook: impl FnMut(&mut World, f32) + 'static) {
        assert!(
            !self.hooks.iter().any(|(existing, _)| existing == name),
            "duplicate hook name: {name:?}"
        );
        self.hooks.push((name.to_owned(), Box::new(hook)));
    }

    /// Run one frame and return what it drew.
    pub fn frame(&mut self) -> Result<&FrameStats, RenderError> {
        let frame_start = Instant::now();
        let dt = self.config.fixed_dt as f32;

        let mut hook_times = Vec::with_capacity(self.hooks.len());
        for (name, hook) in &mut self.hooks {
            let start = Instant::now();
            hook(&mut self.world, dt);
            hook_times.push((name.clone(), start.elapsed()));
        }

        let update_start = Instant::now();
        self.world.update(dt);
        let world_update_time = update_start.elapsed();

        self.frame_count += 1;

        let render_start = Instant::now();
        if !self.config.headless {
            let game_time = self.game_time();
            self.system.render(&mut self.world, game_time)?;
        }
        let render_time = render_start.elapsed();

        self.last_diagnostics = FrameDiagnostics {
            hook_times,
            world_update_time,
            render_time,
            total_time: frame_start.elapsed(),
        };
        Ok(self.system.last_stats())
    }

    /// Run `count` frames, stopping at the first error.
    pub fn run_frames(&mut self, count: u64) -> Result<(), RenderError> {
        for _ in 0..count {
            self.frame()?;
        }
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Seconds of game time elapsed.
    pub fn game_time(&self) -> f64 {
        self.frame_count as f64 * self.config.fixed_dt
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn system(&self) -> &RenderSystem<B> {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut RenderSystem<B> {
        &mut self.system
    }

    /// World and render system together, e.g. to attach textures through
    /// the system's loader.
    pub fn parts_mut(&mut self) -> (&mut World, &mut RenderSystem<B>) {
        (&mut self.world, &mut self.system)
    }

    pub fn last_stats(&self) -> &FrameStats {
        self.system.last_stats()
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_headless(&self) -> bool {
        self.config.headless
    }
}
