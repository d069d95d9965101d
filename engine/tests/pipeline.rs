//! End-to-end chunk generation: noise, falloff, meshing and the
//! request/update round trip.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use terrain_engine::{
    generate_noise_map, generate_terrain_mesh, GeneratorConfig, HeightCurve, LevelOfDetail, MapData,
    MeshData, NoiseSettings, NormalizeMode, TerrainGenerator, Vec2,
};

fn scenario_settings() -> NoiseSettings {
    NoiseSettings {
        normalize_mode: NormalizeMode::Global,
        scale: 50.0,
        octaves: 4,
        persistence: 0.5,
        lacunarity: 2.0,
        seed: 42,
        offset: Vec2::ZERO,
    }
}

fn pump(generator: &mut TerrainGenerator, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        generator.update();
        assert!(Instant::now() < deadline, "generation did not finish in time");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn sixteen_by_sixteen_scenario() {
    let settings = scenario_settings();
    let map = generate_noise_map(16, 16, &settings);
    assert_eq!((map.width(), map.height()), (16, 16));
    assert!(map.values().iter().all(|v| !v.is_nan() && *v >= 0.0));
    assert_eq!(map, generate_noise_map(16, 16, &settings));

    let mesh = generate_terrain_mesh(&map, 20.0, &HeightCurve::linear(), LevelOfDetail::FULL, false);
    assert_eq!(mesh.vertex_count(), 256);
    assert_eq!(mesh.triangle_count(), 450);
}

#[test]
fn concurrent_generation_is_bit_identical() {
    let settings = scenario_settings();
    let reference = generate_noise_map(64, 64, &settings);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let settings = settings.clone();
            thread::spawn(move || generate_noise_map(64, 64, &settings))
        })
        .collect();
    for handle in handles {
        let map = handle.join().unwrap();
        let same_bits = map
            .values()
            .iter()
            .zip(reference.values())
            .all(|(a, b)| a.to_bits() == b.to_bits());
        assert!(same_bits);
    }
}

#[test]
fn request_map_then_mesh_through_update() {
    let mut config = GeneratorConfig::default();
    config.worker_threads = 2;
    config.terrain.use_falloff = true;
    let mut generator = TerrainGenerator::new(config).unwrap();

    let map_slot: Rc<RefCell<Option<MapData>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&map_slot);
    generator.request_map_data(Vec2::ZERO, move |map| *slot.borrow_mut() = Some(map));
    assert_eq!(generator.in_flight(), 1);
    pump(&mut generator, || map_slot.borrow().is_some());

    let map = map_slot.borrow_mut().take().unwrap();
    assert_eq!(map, generator.generate_map_data(Vec2::ZERO));

    let meshes: Rc<RefCell<Vec<(u8, MeshData)>>> = Rc::new(RefCell::new(Vec::new()));
    for lod in LevelOfDetail::all() {
        let meshes = Rc::clone(&meshes);
        generator.request_mesh_data(&map, lod, move |mesh| meshes.borrow_mut().push((lod.get(), mesh)));
    }
    pump(&mut generator, || meshes.borrow().len() == 5);
    assert_eq!(generator.in_flight(), 0);

    let n = generator.map_chunk_size();
    for (lod, mesh) in meshes.borrow().iter() {
        let stride = LevelOfDetail::new(*lod).unwrap().stride();
        let per_line = (n - 1) / stride + 1;
        assert_eq!(mesh.vertex_count(), per_line * per_line, "lod {lod}");
    }
}

#[test]
fn many_chunks_arrive_exactly_once() {
    let mut config = GeneratorConfig::default();
    config.worker_threads = 4;
    let mut generator = TerrainGenerator::new(config).unwrap();
    let chunk = generator.map_chunk_size() as f32 - 1.0;

    let received = Rc::new(RefCell::new(Vec::new()));
    for x in -2..=2 {
        for y in -2..=2 {
            let received = Rc::clone(&received);
            let centre = Vec2::new(x as f32 * chunk, y as f32 * chunk);
            generator.request_map_data(centre, move |_| received.borrow_mut().push((x, y)));
        }
    }
    pump(&mut generator, || received.borrow().len() == 25);
    generator.update();

    let mut got = received.borrow().clone();
    got.sort();
    got.dedup();
    assert_eq!(got.len(), 25);
}

#[test]
fn bundled_preview_config_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../preview/terrain.ron");
    let config = GeneratorConfig::load(path).unwrap();
    assert_eq!(config.noise.seed, 1337);
    assert!(config.terrain.use_falloff);
    assert_eq!(config.map_chunk_size().unwrap(), 97);
    assert_eq!(config.regions.len(), GeneratorConfig::default().regions.len());
}
