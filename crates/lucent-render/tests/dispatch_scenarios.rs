//! End-to-end dispatch through a [`RecordingBackend`].
//!
//! Each test builds a world through the public helper API, renders it and
//! inspects the frame stats and the recorded GPU calls.

use glam::{Vec2, Vec4};
use lucent_render::constants::MatrixData;
use lucent_render::prelude::*;
use lucent_visual::prelude::*;

const MAP: &str = r#"{
    "width": 2, "height": 2, "tilewidth": 16, "tileheight": 16,
    "tilesets": [{ "firstgid": 1, "image": "tiles.png", "columns": 2 }],
    "layers": [{ "name": "Default", "type": "tilelayer", "data": [1, 0, 2, 1] }]
}"#;

fn system() -> RenderSystem<RecordingBackend> {
    let mut system =
        RenderSystem::new(RecordingBackend::new(), RenderConfig::default(), ShaderLibrary::with_placeholders())
            .unwrap();
    system.insert_texture("hero.png", 32, 32, &[255; 32 * 32 * 4]).unwrap();
    system.insert_texture("tiles.png", 32, 16, &[255; 32 * 16 * 4]).unwrap();
    system.insert_texture("sparks.png", 64, 64, &[255; 64 * 64 * 4]).unwrap();
    system
}

fn sparks() -> ParticleSettings {
    ParticleSettings {
        frame_size: Vec2::new(16.0, 16.0),
        num_frames: 4,
        lifetime: 2.0,
        ..Default::default()
    }
}

fn add_tinted(world: &mut World, system: &mut RenderSystem<RecordingBackend>, z: f32) -> VisualId {
    let id = world.add_sprite(VisualDesc::at(0.0, 0.0, z).size(10.0, 10.0)).unwrap();
    world.helper(&mut system.textures()).tint(Vec4::ONE).unwrap();
    id
}

fn add_map(world: &mut World, system: &mut RenderSystem<RecordingBackend>, z: f32) -> VisualId {
    let id = world.add_sprite(VisualDesc::at(0.0, 0.0, z)).unwrap();
    world
        .helper(&mut system.textures())
        .texture("tiles.png")
        .unwrap()
        .tiled_with(Tiled::from_json(MAP))
        .unwrap();
    id
}

fn add_emitter(world: &mut World, system: &mut RenderSystem<RecordingBackend>, z: f32) -> VisualId {
    let id = world.add_sprite(VisualDesc::at(0.0, 0.0, z).size(200.0, 200.0)).unwrap();
    world
        .helper(&mut system.textures())
        .texture("sparks.png")
        .unwrap()
        .particles(16, sparks())
        .unwrap();
    id
}

// ---------------------------------------------------------------------------
// Renderer selection
// ---------------------------------------------------------------------------

#[test]
fn tinted_sprite_uses_colored_renderer() {
    let mut system = system();
    let mut world = World::new();
    world.add_sprite(VisualDesc::at(200.0, 200.0, 0.0).size(300.0, 300.0)).unwrap();
    world.helper(&mut system.textures()).tint(Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();

    let stats = system.render(&mut world, 0.0).unwrap().clone();
    assert_eq!(stats.renderers(), vec![RendererKind::Colored]);
    assert_eq!(stats.draws[0].vertex_count, 4);
    assert_eq!(system.backend().draws(), vec![(4, 0)]);

    let transform = system.constant_buffers().transform;
    let matrix: MatrixData = bytemuck::pod_read_unaligned(system.backend().buffer_data(transform).unwrap());
    assert_eq!(&matrix.mat[3][..3], &[200.0, 200.0, 0.0]);
}

#[test]
fn animation_wins_over_plain_texture() {
    let mut system = system();
    let mut world = World::new();
    let id = world.add_sprite(VisualDesc::at(0.0, 0.0, 0.0).size(32.0, 32.0)).unwrap();
    world
        .helper(&mut system.textures())
        .texture("hero.png")
        .unwrap()
        .animation(Vec2::new(16.0, 16.0), 4, 10.0)
        .unwrap();

    let features = world.get(id).unwrap().features();
    assert_eq!(system.renderer_for(features).unwrap(), RendererKind::Animated);
    let stats = system.render(&mut world, 0.0).unwrap();
    assert_eq!(stats.renderers(), vec![RendererKind::Animated]);
}

#[test]
fn tiled_map_draws_eighteen_vertices() {
    let mut system = system();
    let mut world = World::new();
    let id = add_map(&mut world, &mut system, 0.0);

    let stats = system.render(&mut world, 0.0).unwrap();
    assert_eq!(stats.renderers(), vec![RendererKind::Tiled]);
    assert_eq!(stats.vertices, 18);
    assert!(system.has_geometry(id));

    // second frame reuses the cached buffer
    system.backend_mut().take_commands();
    system.render(&mut world, 1.0).unwrap();
    assert!(!system
        .backend()
        .commands()
        .iter()
        .any(|c| matches!(c, GpuCommand::CreateBuffer { .. })));
}

#[test]
fn missing_renderer_is_rejected_at_startup() {
    let kinds = [
        RendererKind::Colored,
        RendererKind::Textured,
        RendererKind::Animated,
        RendererKind::Particles,
    ];
    let err = RenderSystem::with_renderers(
        RecordingBackend::new(),
        RenderConfig::default(),
        ShaderLibrary::with_placeholders(),
        &kinds,
    )
    .err()
    .unwrap();
    assert!(matches!(err.root(), RenderError::MissingCapability { .. }));
    assert!(err.to_string().contains("Tiled"));
}

// ---------------------------------------------------------------------------
// Binding state
// ---------------------------------------------------------------------------

#[test]
fn stateful_renderers_force_the_next_setup() {
    let mut system = system();
    let mut world = World::new();
    add_map(&mut world, &mut system, 0.0);
    add_map(&mut world, &mut system, 1.0);
    add_tinted(&mut world, &mut system, 2.0);
    add_tinted(&mut world, &mut system, 3.0);

    let stats = system.render(&mut world, 0.0).unwrap();
    let setups: Vec<bool> = stats.draws.iter().map(|d| d.setup).collect();
    assert_eq!(setups, vec![true, true, true, false]);
    assert_eq!(stats.setup_calls, 3);
}

#[test]
fn binding_resets_every_frame() {
    let mut system = system();
    let mut world = World::new();
    add_tinted(&mut world, &mut system, 0.0);

    system.render(&mut world, 0.0).unwrap();
    let stats = system.render(&mut world, 0.1).unwrap();
    assert_eq!(stats.setup_calls, 1);
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

#[test]
fn widgets_draw_after_sprites_inside_the_overlay() {
    let mut system = system();
    let mut world = World::new();
    world.add_widget(VisualDesc::at(0.0, 0.0, -5.0).size(50.0, 20.0)).unwrap();
    world
        .helper(&mut system.textures())
        .tint(Vec4::ONE)
        .unwrap()
        .text(Text::new("OK", "Arial", 12))
        .unwrap();
    add_tinted(&mut world, &mut system, 0.0);

    system.backend_mut().take_commands();
    let stats = system.render(&mut world, 0.0).unwrap().clone();
    assert_eq!(stats.renderers(), vec![RendererKind::Colored, RendererKind::Widget]);
    assert_eq!((stats.sprites_drawn, stats.widgets_drawn), (1, 1));
    assert_eq!(stats.texts.len(), 1);

    let commands = system.backend().commands();
    let begin = commands.iter().position(|c| *c == GpuCommand::BeginOverlay).unwrap();
    let end = commands.iter().position(|c| *c == GpuCommand::EndOverlay).unwrap();
    let draws: Vec<usize> = commands
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, GpuCommand::Draw { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(draws.len(), 2);
    assert!(draws[0] < begin, "sprite drawn before the overlay opens");
    assert!(begin < draws[1] && draws[1] < end, "widget drawn inside the overlay");
}

// ---------------------------------------------------------------------------
// Cache eviction
// ---------------------------------------------------------------------------

#[test]
fn removing_an_emitter_evicts_its_geometry() {
    let mut system = system();
    let mut world = World::new();
    add_map(&mut world, &mut system, 0.0);
    let emitter = add_emitter(&mut world, &mut system, 1.0);
    system.render(&mut world, 0.0).unwrap();
    assert_eq!(system.geometry_len(), 2);
    assert!(system.has_geometry(emitter));

    let live = system.backend().live_buffers();
    system.remove_visual(&mut world, emitter).unwrap();

    assert!(!system.has_geometry(emitter));
    assert_eq!(system.geometry_len(), 1);
    assert_eq!(system.backend().live_buffers(), live - 1);
}

#[test]
fn destroyed_visuals_are_evicted_on_the_next_frame() {
    let mut system = system();
    let mut world = World::new();
    let map = add_map(&mut world, &mut system, 0.0);
    system.render(&mut world, 0.0).unwrap();

    world.remove_sprite(map).unwrap();
    assert!(system.has_geometry(map));
    system.render(&mut world, 0.1).unwrap();
    assert!(!system.has_geometry(map));
    assert_eq!(system.geometry_len(), 0);
}

#[test]
fn detaching_particles_releases_their_buffer() {
    let mut system = system();
    let mut world = World::new();
    let emitter = add_emitter(&mut world, &mut system, 0.0);
    system.render(&mut world, 0.0).unwrap();
    let live = system.backend().live_buffers();

    assert_eq!(world.get_mut(emitter).unwrap().remove_components(ComponentKind::Particles), 1);
    let stats = system.render(&mut world, 0.1).unwrap();
    assert_eq!(stats.renderers(), vec![RendererKind::Textured]);
    assert!(!system.has_geometry(emitter));
    assert_eq!(system.geometry_len(), 0);
    assert_eq!(system.backend().live_buffers(), live - 1);
}

#[test]
fn expired_particles_release_their_buffer() {
    let mut system = system();
    let mut world = World::new();
    let id = world.add_sprite(VisualDesc::at(0.0, 0.0, 0.0).size(200.0, 200.0)).unwrap();
    world.helper(&mut system.textures()).texture("sparks.png").unwrap();
    world
        .add_component(
            id,
            Component::new(Particles::new(16, sparks())).with_lifespan(0.5),
            &mut system.textures(),
        )
        .unwrap();
    system.render(&mut world, 0.0).unwrap();
    assert!(system.has_geometry(id));

    world.update(0.5);
    assert!(!world.get(id).unwrap().has(ComponentKind::Particles));
    system.render(&mut world, 0.5).unwrap();
    assert!(!system.has_geometry(id));
}

#[test]
fn reused_slot_does_not_alias_old_geometry() {
    let mut system = system();
    let mut world = World::new();
    let old = add_map(&mut world, &mut system, 0.0);
    system.render(&mut world, 0.0).unwrap();
    system.remove_visual(&mut world, old).unwrap();

    let new = add_emitter(&mut world, &mut system, 0.0);
    assert_eq!(new.index(), old.index());
    assert_ne!(new, old);
    let stats = system.render(&mut world, 0.0).unwrap();
    assert_eq!(stats.renderers(), vec![RendererKind::Particles]);
    assert_eq!(stats.vertices, 16 * 6);
}

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

#[test]
fn held_texture_stays_bound_to_the_cached_handle() {
    let mut system = system();
    let mut world = World::new();
    let id = world.add_sprite(VisualDesc::at(0.0, 0.0, 0.0).size(32.0, 32.0)).unwrap();
    world.helper(&mut system.textures()).texture("hero.png").unwrap();

    let err = system
        .replace_texture(&world, "hero.png", 8, 8, &[0; 8 * 8 * 4])
        .unwrap_err();
    assert!(matches!(err.root(), RenderError::TextureInUse { users: 1, .. }));

    system.backend_mut().take_commands();
    system.render(&mut world, 0.0).unwrap();
    let cached = system.texture_cache().get("hero.png").unwrap().handle;
    let bound: Vec<TextureHandle> = system
        .backend()
        .commands()
        .iter()
        .filter_map(|c| match c {
            GpuCommand::BindShaderResource { texture, .. } => Some(*texture),
            _ => None,
        })
        .collect();
    assert_eq!(bound, vec![cached]);
    assert_eq!(world.get(id).unwrap().texture().unwrap().handle, Some(cached));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn buffer_failure_during_setup_carries_context() {
    let mut system = system();
    let mut world = World::new();
    let map = add_map(&mut world, &mut system, 0.0);

    system.backend_mut().fail_next(FailurePoint::BufferCreation);
    let err = system.render(&mut world, 0.0).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("TiledRenderer::setup > RenderSystem::render("), "{message}");
    assert!(message.contains("tiled setup"), "{message}");
    assert!(matches!(err.root(), RenderError::Backend(_)));
    assert!(!system.has_geometry(map));

    // the failure was consumed; the next frame succeeds
    assert_eq!(system.render(&mut world, 0.0).unwrap().vertices, 18);
}

#[test]
fn present_failure_aborts_the_frame() {
    let mut system = system();
    let mut world = World::new();
    add_tinted(&mut world, &mut system, 0.0);

    system.backend_mut().fail_next(FailurePoint::Present);
    let err = system.render(&mut world, 0.0).unwrap_err();
    assert!(err.to_string().ends_with("RenderSystem::render(present)"));
    assert_eq!(system.frames_rendered(), 0);
}
