//! A small scene rendered for a few seconds of game time with no GPU.
//!
//! Builds one sprite per renderer kind plus a button widget, runs the frame
//! loop against the recording backend and prints what each frame drew.
//!
//! Run with:
//!   RUST_LOG=lucent_render=debug cargo run --example headless_scene -p lucent-render

use glam::{Vec2, Vec4};
use lucent_render::prelude::*;
use lucent_visual::prelude::*;

const MAP: &str = r#"{
    "width": 4, "height": 2, "tilewidth": 16, "tileheight": 16,
    "tilesets": [{ "firstgid": 1, "image": "tiles.png", "columns": 2 }],
    "layers": [{ "name": "Default", "type": "tilelayer", "data": [1, 2, 2, 1, 0, 1, 1, 0] }]
}"#;

// ---------------------------------------------------------------------------
// Scene setup
// ---------------------------------------------------------------------------

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    rgba.repeat((width * height) as usize)
}

fn build_scene(world: &mut World, system: &mut RenderSystem<RecordingBackend>) -> anyhow::Result<VisualId> {
    system.insert_texture("tiles.png", 32, 16, &solid(32, 16, [90, 160, 60, 255]))?;
    system.insert_texture("hero.png", 64, 64, &solid(64, 64, [200, 200, 255, 255]))?;
    system.insert_texture("sparks.png", 64, 64, &solid(64, 64, [255, 220, 80, 255]))?;
    system.insert_texture("buttons.png", 128, 64, &solid(128, 64, [40, 40, 40, 255]))?;

    // Background map
    world.add_sprite(VisualDesc::at(0.0, 0.0, 0.0))?;
    world
        .helper(&mut system.textures())
        .texture("tiles.png")?
        .tiled_with(Tiled::from_json(MAP).scale(Vec2::splat(2.0)))?;

    // Colored marker
    world.add_sprite(VisualDesc::at(-120.0, 60.0, 1.0).size(24.0, 24.0))?;
    world
        .helper(&mut system.textures())
        .tint(Vec4::new(1.0, 0.2, 0.2, 1.0))?;

    // Walking hero
    world.add_sprite(VisualDesc::at(0.0, 40.0, 2.0).size(32.0, 32.0))?;
    world
        .helper(&mut system.textures())
        .texture("hero.png")?
        .animation(Vec2::new(16.0, 16.0), 16, 12.0)?;

    // Sparks that burn out after two seconds
    let sparks = world.add_sprite(VisualDesc::at(80.0, 0.0, 3.0).size(96.0, 96.0))?;
    let settings = ParticleSettings {
        frame_size: Vec2::new(16.0, 16.0),
        num_frames: 16,
        lifetime: 1.5,
        fade_in_rate: 0.1,
        fade_out_rate: 0.3,
        ..Default::default()
    };
    world
        .helper(&mut system.textures())
        .texture("sparks.png")?
        .particles(64, settings)?;

    // Start button
    world.add_widget(VisualDesc::at(0.0, -100.0, 0.0).size(128.0, 32.0))?;
    world
        .helper(&mut system.textures())
        .texture("buttons.png")?
        .button(Vec2::ZERO, Vec2::new(0.0, 32.0), Vec2::new(0.0, 32.0))?
        .text(Text::new("Start", "Arial", 16))?;

    Ok(sparks)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let system = RenderSystem::new(
        RecordingBackend::new(),
        RenderConfig::default(),
        ShaderLibrary::with_placeholders(),
    )?;
    let mut frames = FrameLoop::new(World::new(), system, FrameConfig::default());
    let (world, system) = frames.parts_mut();
    let sparks = build_scene(world, system)?;

    frames.add_hook("burn_out", move |world, _dt| {
        if world.get(sparks).is_some_and(|v| v.pos().y < -40.0) {
            let _ = world.remove_sprite(sparks);
        }
    });
    frames.add_hook("drift", move |world, dt| {
        if let Some(visual) = world.get_mut(sparks) {
            visual.add_pos(glam::Vec3::new(0.0, -20.0 * dt, 0.0));
        }
    });

    for _ in 0..(3 * 60) {
        let frame = frames.frame_count() + 1;
        let stats = frames.frame()?;
        if frame % 30 == 0 {
            let kinds: Vec<String> = stats.renderers().iter().map(ToString::to_string).collect();
            println!(
                "frame {frame:>3}: {} sprites, {} widgets, {} setups, {} vertices [{}]",
                stats.sprites_drawn,
                stats.widgets_drawn,
                stats.setup_calls,
                stats.vertices,
                kinds.join(", ")
            );
        }
    }

    let diagnostics = frames.last_diagnostics();
    println!(
        "last frame: update {:?}, render {:?}, total {:?}",
        diagnostics.world_update_time, diagnostics.render_time, diagnostics.total_time
    );
    println!(
        "cached geometry: {} entries, live buffers: {}",
        frames.system().geometry_len(),
        frames.system().backend().live_buffers()
    );
    Ok(())
}
