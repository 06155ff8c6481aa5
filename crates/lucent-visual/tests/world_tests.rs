//! End-to-end world behavior: component attachment through the helper,
//! tiled maps loaded from disk, UI scale broadcasts and tag lookup.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec4};
use lucent_visual::prelude::*;

fn textures() -> InMemoryTextures {
    let mut textures = InMemoryTextures::new();
    textures.insert("tiles.png", Vec2::new(32.0, 16.0));
    textures.insert("sparks.png", Vec2::new(64.0, 64.0));
    textures
}

const MAP: &str = r#"{
    "width": 2, "height": 2, "tilewidth": 16, "tileheight": 16,
    "tilesets": [{ "firstgid": 1, "image": "tiles.png", "columns": 2 }],
    "layers": [
        { "name": "Default", "type": "tilelayer", "data": [1, 0, 2, 1] },
        { "name": "Collision", "type": "objectgroup", "objects": [
            { "name": "floor", "x": 0, "y": 24, "width": 32, "height": 8 }
        ]}
    ]
}"#;

// ---------------------------------------------------------------------------
// Component attachment
// ---------------------------------------------------------------------------

#[test]
fn invalid_component_fails_and_visual_is_unchanged() {
    let mut loader = textures();
    let mut world = World::new();
    let id = world
        .add_sprite(VisualDesc::at(0.0, 0.0, 0.0).size(10.0, 10.0))
        .unwrap();
    world.helper(&mut loader).tint(Vec4::ONE).unwrap();

    let err = world
        .add_component(id, Component::new(Texture::new("")), &mut loader)
        .unwrap_err();

    assert!(err.is_invalid_argument());
    let visual = world.get(id).unwrap();
    assert_eq!(visual.components().len(), 1);
    assert_eq!(visual.features(), [ComponentKind::Tint].into_iter().collect());
}

#[test]
fn tiled_map_from_file_reports_objects_and_collisions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("level.tmj");
    std::fs::write(&path, MAP).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    let mut loader = textures();
    let mut world = World::new();
    let id = world
        .add_sprite(VisualDesc::at(0.0, 0.0, 0.0).size(32.0, 32.0))
        .unwrap();
    world
        .helper(&mut loader)
        .texture("tiles.png")
        .unwrap()
        .tiled_with(
            Tiled::from_file(&path)
                .on_object(move |layer, object| sink.borrow_mut().push((layer.to_owned(), object.name.clone()))),
        )
        .unwrap();

    let tiled = world.get(id).unwrap().tiled().unwrap();
    assert_eq!(tiled.tiles.len(), 3);
    assert_eq!(tiled.vertex_count(), 18);
    assert_eq!(tiled.collision_boxes.len(), 1);
    assert_eq!(
        *seen.borrow(),
        vec![(layers::COLLISION.to_owned(), "floor".to_owned())]
    );
}

#[test]
fn missing_tiled_file_is_reported_with_context() {
    let mut loader = textures();
    let mut world = World::new();
    let id = world.add_sprite(VisualDesc::at(0.0, 0.0, 0.0)).unwrap();
    world.helper(&mut loader).texture("tiles.png").unwrap();

    let err = world
        .add_component(id, Component::new(Tiled::from_file("/nonexistent/level.tmj")), &mut loader)
        .unwrap_err();
    assert!(matches!(err.root(), VisualError::TiledParse { .. }));
    assert!(err.to_string().contains("> Visual::add_component(Tiled)"));
    assert!(!world.get(id).unwrap().has(ComponentKind::Tiled));
}

#[test]
fn particles_capture_texture_size() {
    let mut loader = textures();
    let mut world = World::new();
    let id = world
        .add_sprite(VisualDesc::at(0.0, 0.0, 0.0).size(100.0, 100.0))
        .unwrap();
    world
        .helper(&mut loader)
        .texture("sparks.png")
        .unwrap()
        .particles(
            20,
            ParticleSettings {
                frame_size: Vec2::splat(16.0),
                num_frames: 16,
                ..Default::default()
            },
        )
        .unwrap();

    let particles = world.get(id).unwrap().particles().unwrap();
    assert_eq!(particles.texture_size(), Vec2::splat(64.0));
    assert_eq!(particles.settings.movement_radius, 16.0);
    assert_eq!(particles.settings.lifetime, -1.0);
}

// ---------------------------------------------------------------------------
// World scale
// ---------------------------------------------------------------------------

#[test]
fn world_scale_broadcasts_only_on_change() {
    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);

    let mut world = World::new();
    world.on_scale_changed(move |scale| sink.borrow_mut().push(scale));

    // Empty table: the default entry applies.
    assert!(world.update_world_scale(Vec2::new(1920.0, 1080.0)));
    assert!(!world.update_world_scale(Vec2::new(1920.0, 1080.0)));
    assert_eq!(*received.borrow(), vec![Vec2::ONE]);

    world.world_scale_mut().add_entry(1440, Vec2::splat(1.5));
    world.world_scale_mut().add_entry(1080, Vec2::splat(1.0));
    // 1080 still resolves to 1.0: no broadcast.
    assert!(!world.update_world_scale(Vec2::new(1920.0, 1080.0)));
    assert!(world.update_world_scale(Vec2::new(2560.0, 1440.0)));
    assert_eq!(*received.borrow(), vec![Vec2::ONE, Vec2::splat(1.5)]);
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[test]
fn lookup_of_invalid_tag_does_not_crash() {
    let mut world = World::new();
    let untagged = world.add_sprite(VisualDesc::at(0.0, 0.0, 0.0)).unwrap();
    world.add_widget(VisualDesc::at(0.0, 0.0, 0.0)).unwrap();
    assert_eq!(world.visual_by_tag(INVALID_TAG), Some(untagged));
    assert_eq!(World::new().visual_by_tag(INVALID_TAG), None);
}
