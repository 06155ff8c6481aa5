//! Property tests for renderer selection and geometry caching.

use std::collections::BTreeSet;

use glam::{Vec2, Vec4};
use lucent_render::prelude::*;
use lucent_render::renderers::is_reachable;
use lucent_visual::prelude::*;
use proptest::prelude::*;

const MAP: &str = r#"{
    "width": 2, "height": 1, "tilewidth": 8, "tileheight": 8,
    "tilesets": [{ "firstgid": 1, "image": "tiles.png", "columns": 2 }],
    "layers": [{ "name": "Default", "type": "tilelayer", "data": [1, 2] }]
}"#;

#[derive(Debug, Clone)]
enum SceneOp {
    AddTinted,
    AddTextured,
    AddAnimated,
    AddMap,
    AddEmitter,
    Remove(usize),
    Render,
}

fn scene_op_strategy() -> impl Strategy<Value = SceneOp> {
    prop_oneof![
        Just(SceneOp::AddTinted),
        Just(SceneOp::AddTextured),
        Just(SceneOp::AddAnimated),
        Just(SceneOp::AddMap),
        Just(SceneOp::AddEmitter),
        (0..32usize).prop_map(SceneOp::Remove),
        Just(SceneOp::Render),
    ]
}

fn system() -> RenderSystem<RecordingBackend> {
    let mut system =
        RenderSystem::new(RecordingBackend::new(), RenderConfig::default(), ShaderLibrary::with_placeholders())
            .unwrap();
    system.insert_texture("tiles.png", 16, 8, &[255; 16 * 8 * 4]).unwrap();
    system.insert_texture("sparks.png", 32, 32, &[255; 32 * 32 * 4]).unwrap();
    system
}

fn apply(op: &SceneOp, world: &mut World, system: &mut RenderSystem<RecordingBackend>, geometry: &mut BTreeSet<VisualId>) {
    let desc = VisualDesc::at(0.0, 0.0, 0.0).size(64.0, 64.0);
    match op {
        SceneOp::AddTinted => {
            world.add_sprite(desc).unwrap();
            world.helper(&mut system.textures()).tint(Vec4::ONE).unwrap();
        }
        SceneOp::AddTextured => {
            world.add_sprite(desc).unwrap();
            world.helper(&mut system.textures()).texture("sparks.png").unwrap();
        }
        SceneOp::AddAnimated => {
            world.add_sprite(desc).unwrap();
            world
                .helper(&mut system.textures())
                .texture("sparks.png")
                .unwrap()
                .animation(Vec2::new(16.0, 16.0), 4, 12.0)
                .unwrap();
        }
        SceneOp::AddMap => {
            let id = world.add_sprite(desc).unwrap();
            world
                .helper(&mut system.textures())
                .texture("tiles.png")
                .unwrap()
                .tiled_with(Tiled::from_json(MAP))
                .unwrap();
            geometry.insert(id);
        }
        SceneOp::AddEmitter => {
            let id = world.add_sprite(desc).unwrap();
            let settings = ParticleSettings {
                frame_size: Vec2::new(8.0, 8.0),
                num_frames: 1,
                ..Default::default()
            };
            world
                .helper(&mut system.textures())
                .texture("sparks.png")
                .unwrap()
                .particles(4, settings)
                .unwrap();
            geometry.insert(id);
        }
        SceneOp::Remove(n) => {
            let ids: Vec<VisualId> = world.iter().map(Visual::id).collect();
            if !ids.is_empty() {
                let id = ids[n % ids.len()];
                world.remove_sprite(id).unwrap();
                geometry.remove(&id);
            }
        }
        SceneOp::Render => {
            system.render(world, 0.0).unwrap();
        }
    }
}

proptest! {
    /// Every reachable feature set, including ones carrying widget-only
    /// kinds, is claimed by exactly one sprite renderer.
    #[test]
    fn reachable_features_have_exactly_one_renderer(bits in 0u16..(1 << ComponentKind::ALL.len())) {
        let features = FeatureSet::from_bits(bits);
        let claims = RendererKind::SPRITE.iter().filter(|k| k.supports(features)).count();
        if is_reachable(features) {
            prop_assert_eq!(claims, 1, "features {}", features);
        }
        prop_assert!(!RendererKind::Widget.supports(features));
    }

    /// Sprites built through the helper always resolve to one renderer.
    #[test]
    fn helper_built_sprites_resolve(ops in prop::collection::vec(scene_op_strategy(), 1..20)) {
        let mut system = system();
        let mut world = World::new();
        let mut geometry = BTreeSet::new();
        for op in &ops {
            apply(op, &mut world, &mut system, &mut geometry);
        }
        for visual in world.iter() {
            prop_assert!(system.renderer_for(visual.features()).is_ok());
        }
    }

    /// After a render, the cache holds exactly the live tiled and particle
    /// visuals; removed ones are gone.
    #[test]
    fn cache_tracks_live_geometry(ops in prop::collection::vec(scene_op_strategy(), 1..40)) {
        let mut system = system();
        let mut world = World::new();
        let mut geometry = BTreeSet::new();
        let mut seen = Vec::new();

        for op in &ops {
            apply(op, &mut world, &mut system, &mut geometry);
            seen.extend(world.iter().map(Visual::id));
        }
        system.render(&mut world, 0.0).unwrap();

        prop_assert_eq!(system.geometry_len(), geometry.len());
        for id in &geometry {
            prop_assert!(system.has_geometry(*id));
        }
        for id in seen.iter().filter(|id| !world.contains(**id)) {
            prop_assert!(!system.has_geometry(*id), "stale geometry for {}", id);
        }
    }
}
