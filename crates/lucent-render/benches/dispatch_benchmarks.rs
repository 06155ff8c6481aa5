//! Dispatch throughput against the recording backend.
//!
//! Measures the CPU side of a frame: renderer selection, binding-state
//! tracking and constant-buffer writes. The recording backend adds a
//! `Vec` push per GPU call, so absolute numbers are an upper bound.
//!
//! Run with: `cargo bench --bench dispatch_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Vec2, Vec4};

use lucent_render::prelude::*;
use lucent_render::renderers::generate_particles;
use lucent_visual::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn system() -> RenderSystem<RecordingBackend> {
    let mut system =
        RenderSystem::new(RecordingBackend::new(), RenderConfig::default(), ShaderLibrary::with_placeholders())
            .expect("render system");
    system
        .insert_texture("hero.png", 64, 64, &[255; 64 * 64 * 4])
        .expect("texture");
    system
}

/// A world of `count` sprites cycling through colored, textured and
/// animated features. `sorted` groups equal features together.
fn mixed_world(system: &mut RenderSystem<RecordingBackend>, count: usize, sorted: bool) -> World {
    let mut world = World::new();
    for i in 0..count {
        let variant = if sorted { i * 3 / count } else { i % 3 };
        world
            .add_sprite(VisualDesc::at(i as f32, 0.0, 0.0).size(16.0, 16.0))
            .expect("sprite");
        let mut textures = system.textures();
        let mut helper = world.helper(&mut textures);
        match variant {
            0 => {
                helper.tint(Vec4::new(1.0, 0.5, 0.5, 1.0)).expect("tint");
            }
            1 => {
                helper.texture("hero.png").expect("texture");
            }
            _ => {
                helper
                    .texture("hero.png")
                    .expect("texture")
                    .animation(Vec2::new(16.0, 16.0), 16, 12.0)
                    .expect("animation");
            }
        }
    }
    world
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_frame_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_1k_sprites");
    for sorted in [false, true] {
        let mut system = system();
        let mut world = mixed_world(&mut system, 1_000, sorted);
        let label = if sorted { "grouped" } else { "interleaved" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let stats = system.render(&mut world, 0.0).expect("frame");
                black_box(stats.setup_calls);
                system.backend_mut().take_commands();
            });
        });
    }
    group.finish();
}

fn bench_frame_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_scaling");
    for &count in &[100usize, 1_000, 10_000] {
        let mut system = system();
        let mut world = mixed_world(&mut system, count, true);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                black_box(system.render(&mut world, 0.0).expect("frame").vertices);
                system.backend_mut().take_commands();
            });
        });
    }
    group.finish();
}

fn bench_renderer_selection(c: &mut Criterion) {
    let system = system();
    let sets: Vec<FeatureSet> = (0u16..128)
        .map(|bits| {
            ComponentKind::SPRITE_KINDS
                .iter()
                .enumerate()
                .filter(|(i, _)| bits & (1 << i) != 0)
                .map(|(_, k)| *k)
                .collect()
        })
        .filter(|f| lucent_render::renderers::is_reachable(*f))
        .collect();

    c.bench_function("renderer_for_all_reachable", |b| {
        b.iter(|| {
            for features in &sets {
                black_box(system.renderer_for(*features).ok());
            }
        });
    });
}

fn bench_particle_generation(c: &mut Criterion) {
    let mut textures = InMemoryTextures::new();
    textures.insert("sparks.png", Vec2::new(64.0, 64.0));
    let mut visual = Visual::new(
        VisualId::new(0, 0),
        VisualKind::Sprite,
        VisualDesc::at(0.0, 0.0, 0.0).size(512.0, 512.0),
    );
    visual
        .add_component(Component::new(Texture::new("sparks.png")), &mut textures)
        .expect("texture");
    let settings = ParticleSettings {
        frame_size: Vec2::new(16.0, 16.0),
        num_frames: 16,
        lifetime: 3.0,
        ..Default::default()
    };
    visual
        .add_component(Component::new(Particles::new(1_000, settings)), &mut textures)
        .expect("particles");
    let particles = visual.particles().expect("particles").clone();

    c.bench_function("generate_1k_particles", |b| {
        let mut rng = Pcg32::seed_from_u64(1);
        b.iter(|| black_box(generate_particles(&mut rng, &particles, visual.size())));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_frame_mixed,
    bench_frame_scaling,
    bench_renderer_selection,
    bench_particle_generation,
);
criterion_main!(benches);
