use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;

use crate::api::{HeightMap, Result, Rgba8};
use crate::config::{GeneratorConfig, LevelOfDetail};
use crate::dispatch::{DispatchQueue, Ticket, WorkerPool};
use crate::falloff::generate_falloff_map;
use crate::height_field::{compose, MapData};
use crate::mesh::{generate_terrain_mesh, MeshData};
use crate::noise_map::generate_noise_map;
use crate::regions::colour_map;

/// What [`TerrainGenerator::draw_preview`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewMode {
    #[default]
    NoiseMap,
    ColourMap,
    Mesh,
    FalloffMap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Heights(HeightMap),
    Colours { width: usize, height: usize, pixels: Vec<Rgba8> },
    Mesh(MeshData),
}

/// Falloff masks keyed by map size. Masks do not depend on chunk position,
/// so one per size serves every chunk.
#[derive(Default)]
pub struct FalloffCache {
    maps: Mutex<HashMap<usize, Arc<HeightMap>>>,
}

impl FalloffCache {
    pub fn get(&self, size: usize) -> Arc<HeightMap> {
        let mut maps = self.maps.lock();
        Arc::clone(maps.entry(size).or_insert_with(|| {
            log::debug!("building falloff map {size}x{size}");
            Arc::new(generate_falloff_map(size))
        }))
    }

    pub fn len(&self) -> usize { self.maps.lock().len() }

    pub fn is_empty(&self) -> bool { self.maps.lock().is_empty() }
}

/// Synchronous chunk generation, shared with the worker threads.
#[derive(Clone)]
pub struct ChunkPipeline {
    config: Arc<GeneratorConfig>,
    falloff: Arc<FalloffCache>,
}

impl ChunkPipeline {
    /// `config` must already be sanitized and validated.
    pub fn new(config: Arc<GeneratorConfig>) -> Self {
        Self { config, falloff: Arc::new(FalloffCache::default()) }
    }

    pub fn config(&self) -> &GeneratorConfig { &self.config }

    pub fn falloff_cache(&self) -> &FalloffCache { &self.falloff }

    fn chunk_size(&self) -> usize {
        // validated on construction
        self.config.map_chunk_size().unwrap_or(crate::config::SUPPORTED_CHUNK_SIZES[0])
    }

    /// Height map of the chunk centred on `centre`, with a one-cell border.
    pub fn generate_map_data(&self, centre: Vec2) -> MapData {
        let bordered = self.chunk_size() + 2;
        let mut noise = self.config.noise.clone();
        noise.offset = centre + noise.offset;

        let heights = generate_noise_map(bordered, bordered, &noise).with_border(1);
        let heights = if self.config.terrain.use_falloff {
            let mask = self.falloff.get(bordered);
            compose(heights, Some(&mask))
        } else {
            compose(heights, None)
        };

        log::debug!("generated map data for chunk at ({}, {})", centre.x, centre.y);
        MapData::new(heights)
    }

    pub fn generate_mesh_data(&self, map: &MapData, lod: LevelOfDetail) -> MeshData {
        let terrain = &self.config.terrain;
        let mesh = generate_terrain_mesh(
            &map.height_map,
            terrain.mesh_height_multiplier,
            &terrain.mesh_height_curve,
            lod,
            terrain.use_flat_shading,
        );
        log::debug!(
            "generated mesh at lod {}: {} vertices, {} triangles",
            lod.get(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        mesh
    }
}

/// Owns the configuration and both background queues. Lives on the thread
/// that calls [`update`](Self::update); all continuations run there.
pub struct TerrainGenerator {
    pipeline: ChunkPipeline,
    pool: Arc<WorkerPool>,
    map_queue: DispatchQueue<Vec2, MapData>,
    mesh_queue: DispatchQueue<(MapData, LevelOfDetail), MeshData>,
}

impl TerrainGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let pool = Arc::new(WorkerPool::new(config.worker_threads)?);
        Self::with_pool(config, pool)
    }

    pub fn with_pool(mut config: GeneratorConfig, pool: Arc<WorkerPool>) -> Result<Self> {
        config.sanitize();
        config.validate()?;
        let pipeline = ChunkPipeline::new(Arc::new(config));

        let map_pipeline = pipeline.clone();
        let map_queue = DispatchQueue::new("map data", Arc::clone(&pool), move |centre: Vec2| {
            map_pipeline.generate_map_data(centre)
        });

        let mesh_pipeline = pipeline.clone();
        let mesh_queue = DispatchQueue::new(
            "mesh data",
            Arc::clone(&pool),
            move |(map, lod): (MapData, LevelOfDetail)| mesh_pipeline.generate_mesh_data(&map, lod),
        );

        Ok(Self { pipeline, pool, map_queue, mesh_queue })
    }

    pub fn config(&self) -> &GeneratorConfig { self.pipeline.config() }

    pub fn pipeline(&self) -> &ChunkPipeline { &self.pipeline }

    pub fn worker_pool(&self) -> &Arc<WorkerPool> { &self.pool }

    pub fn map_chunk_size(&self) -> usize { self.pipeline.chunk_size() }

    pub fn generate_map_data(&self, centre: Vec2) -> MapData {
        self.pipeline.generate_map_data(centre)
    }

    pub fn generate_mesh_data(&self, map: &MapData, lod: LevelOfDetail) -> MeshData {
        self.pipeline.generate_mesh_data(map, lod)
    }

    pub fn request_map_data<C>(&mut self, centre: Vec2, callback: C) -> Ticket
    where
        C: FnOnce(MapData) + 'static,
    {
        self.map_queue.request(centre, callback)
    }

    pub fn request_mesh_data<C>(&mut self, map: &MapData, lod: LevelOfDetail, callback: C) -> Ticket
    where
        C: FnOnce(MeshData) + 'static,
    {
        self.mesh_queue.request((map.clone(), lod), callback)
    }

    /// One tick: delivers finished map data, then finished meshes.
    pub fn update(&mut self) -> usize {
        self.map_queue.drain() + self.mesh_queue.drain()
    }

    pub fn in_flight(&self) -> usize {
        self.map_queue.in_flight() + self.mesh_queue.in_flight()
    }

    /// Renders the chunk at the origin the way the editor preview shows it.
    pub fn draw_preview(&self, mode: PreviewMode) -> Result<Preview> {
        let preview = match mode {
            PreviewMode::NoiseMap => {
                Preview::Heights(self.generate_map_data(Vec2::ZERO).height_map.as_ref().clone())
            }
            PreviewMode::ColourMap => {
                let map = self.generate_map_data(Vec2::ZERO);
                let heights = &map.height_map;
                Preview::Colours {
                    width: heights.width(),
                    height: heights.height(),
                    pixels: colour_map(&self.config().regions, heights),
                }
            }
            PreviewMode::Mesh => {
                let lod = LevelOfDetail::new(self.config().editor_preview_lod)?;
                let map = self.generate_map_data(Vec2::ZERO);
                Preview::Mesh(self.generate_mesh_data(&map, lod))
            }
            PreviewMode::FalloffMap => {
                Preview::Heights(generate_falloff_map(self.map_chunk_size()))
            }
        };
        Ok(preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TerrainError;

    fn config() -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        config.noise.seed = 99;
        config.worker_threads = 2;
        config
    }

    #[test]
    fn map_data_has_bordered_chunk_shape() {
        let generator = TerrainGenerator::new(config()).unwrap();
        let map = generator.generate_map_data(Vec2::ZERO);
        assert_eq!(map.height_map.width(), 51);
        assert_eq!(map.height_map.border(), 1);
        assert_eq!(map.height_map.interior_size(), generator.map_chunk_size());
    }

    #[test]
    fn falloff_mask_is_built_once_per_size() {
        let mut cfg = config();
        cfg.terrain.use_falloff = true;
        cfg.noise.normalize_mode = crate::config::NormalizeMode::Local;
        let generator = TerrainGenerator::new(cfg).unwrap();
        let a = generator.generate_map_data(Vec2::ZERO);
        let b = generator.generate_map_data(Vec2::new(48.0, 0.0));
        assert_eq!(generator.pipeline().falloff_cache().len(), 1);
        assert!(a.height_map.values().iter().all(|v| (0.0..=1.0).contains(v)));
        // the outer ring of the mask is 1, so every edge cell is sunk to 0
        assert_eq!(b.height_map.get(0, 0), 0.0);
    }

    #[test]
    fn falloff_map_matches_composition() {
        let mut with = config();
        with.terrain.use_falloff = true;
        let plain = TerrainGenerator::new(config()).unwrap().generate_map_data(Vec2::new(3.0, 4.0));
        let sunk = TerrainGenerator::new(with).unwrap().generate_map_data(Vec2::new(3.0, 4.0));
        let mask = generate_falloff_map(51);
        for (i, (p, s)) in plain.height_map.values().iter().zip(sunk.height_map.values()).enumerate() {
            assert_eq!(*s, (p - mask.values()[i]).clamp(0.0, 1.0));
        }
    }

    #[test]
    fn chunk_centre_shifts_noise() {
        let generator = TerrainGenerator::new(config()).unwrap();
        let a = generator.generate_map_data(Vec2::ZERO);
        let b = generator.generate_map_data(Vec2::new(48.0, 0.0));
        assert_ne!(a, b);
        assert_eq!(a, generator.generate_map_data(Vec2::ZERO));
    }

    #[test]
    fn preview_modes() {
        let generator = TerrainGenerator::new(config()).unwrap();
        match generator.draw_preview(PreviewMode::FalloffMap).unwrap() {
            Preview::Heights(map) => assert_eq!(map.width(), 49),
            other => panic!("unexpected preview {other:?}"),
        }
        match generator.draw_preview(PreviewMode::ColourMap).unwrap() {
            Preview::Colours { width, height, pixels } => {
                assert_eq!((width, height), (51, 51));
                assert_eq!(pixels.len(), 51 * 51);
            }
            other => panic!("unexpected preview {other:?}"),
        }
        match generator.draw_preview(PreviewMode::Mesh).unwrap() {
            Preview::Mesh(mesh) => assert_eq!(mesh.vertex_count(), 49 * 49),
            other => panic!("unexpected preview {other:?}"),
        }
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let cfg = GeneratorConfig { chunk_size_index: 42, ..config() };
        assert!(matches!(
            TerrainGenerator::new(cfg),
            Err(TerrainError::UnsupportedChunkSize { index: 42, .. })
        ));
    }
}
