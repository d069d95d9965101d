//! Procedural terrain for chunked worlds: fractal noise height maps, island
//! falloff, LOD meshes with seam-correct normals, and a background queue that
//! hands finished chunks back to the main loop.

pub mod api;
pub mod config;
pub mod curve;
pub mod dispatch;
pub mod falloff;
pub mod generator;
pub mod height_field;
pub mod mesh;
pub mod noise_map;
pub mod regions;

pub use api::{HeightMap, Result, Rgba8, TerrainError};
pub use config::{GeneratorConfig, LevelOfDetail, NoiseSettings, NormalizeMode, TerrainSettings};
pub use curve::{HeightCurve, Interpolation};
pub use dispatch::{DispatchQueue, Ticket, WorkerPool};
pub use falloff::generate_falloff_map;
pub use generator::{ChunkPipeline, Preview, PreviewMode, TerrainGenerator};
pub use height_field::{compose, MapData};
pub use mesh::{generate_terrain_mesh, MeshData};
pub use noise_map::generate_noise_map;
pub use regions::TerrainBand;
pub use glam::Vec2;
