//! Plain-data settings consumed by the generator, plus the tables of chunk
//! sizes and levels of detail the mesh builder supports.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::{Result, TerrainError};
use crate::curve::HeightCurve;
use crate::noise_map::MIN_SCALE;
use crate::regions::TerrainBand;

/// Interior vertex counts per chunk side. `size - 1` is a multiple of 24 so
/// every LOD stride divides it.
pub const SUPPORTED_CHUNK_SIZES: [usize; 9] = [49, 73, 97, 121, 145, 169, 193, 217, 241];
/// Flat shading triples the vertex count, so only the small sizes are offered.
pub const SUPPORTED_FLATSHADED_CHUNK_SIZES: [usize; 3] = [49, 73, 97];
pub const MAX_LOD: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LevelOfDetail(u8);

impl LevelOfDetail {
    pub const FULL: LevelOfDetail = LevelOfDetail(0);

    pub fn new(lod: u8) -> Result<Self> {
        if lod > MAX_LOD {
            return Err(TerrainError::UnsupportedLod(lod));
        }
        Ok(Self(lod))
    }

    pub fn get(self) -> u8 { self.0 }

    /// Distance in cells between two sampled vertices.
    pub fn stride(self) -> usize {
        if self.0 == 0 { 1 } else { self.0 as usize * 2 }
    }

    pub fn all() -> impl Iterator<Item = LevelOfDetail> {
        (0..=MAX_LOD).map(LevelOfDetail)
    }
}

impl TryFrom<u8> for LevelOfDetail {
    type Error = TerrainError;
    fn try_from(lod: u8) -> Result<Self> { Self::new(lod) }
}

impl From<LevelOfDetail> for u8 {
    fn from(lod: LevelOfDetail) -> u8 { lod.0 }
}

/// Checks that a chunk of `size` interior vertices can be meshed at `lod`.
pub fn check_chunk_lod(size: usize, lod: LevelOfDetail) -> Result<()> {
    let stride = lod.stride();
    if size == 0 || (size - 1) % stride != 0 {
        return Err(TerrainError::IndivisibleChunkSize { size, stride });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Stretch each map to its own min and max. Chunks will not line up.
    Local,
    /// Divide by the largest possible height so neighbouring chunks agree.
    #[default]
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub normalize_mode: NormalizeMode,
    pub scale: f32,
    pub octaves: i32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub seed: i32,
    pub offset: Vec2,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            normalize_mode: NormalizeMode::Global,
            scale: 50.0,
            octaves: 6,
            persistence: 0.6,
            lacunarity: 2.0,
            seed: 0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseSettings {
    /// Clamps values that would break generation into their safe range.
    pub fn sanitize(&mut self) {
        if self.scale <= 0.0 || !self.scale.is_finite() {
            log::warn!("noise scale {} clamped to {}", self.scale, MIN_SCALE);
            self.scale = MIN_SCALE;
        }
        if self.octaves < 0 {
            log::warn!("noise octaves {} clamped to 0", self.octaves);
            self.octaves = 0;
        }
        if !(self.lacunarity >= 1.0) {
            log::warn!("noise lacunarity {} clamped to 1", self.lacunarity);
            self.lacunarity = 1.0;
        }
        self.persistence = if self.persistence.is_finite() { self.persistence.clamp(0.0, 1.0) } else { 0.5 };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub uniform_scale: f32,
    pub mesh_height_multiplier: f32,
    pub mesh_height_curve: HeightCurve,
    pub use_falloff: bool,
    pub use_flat_shading: bool,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            uniform_scale: 2.5,
            mesh_height_multiplier: 20.0,
            mesh_height_curve: HeightCurve::linear(),
            use_falloff: false,
            use_flat_shading: false,
        }
    }
}

impl TerrainSettings {
    pub fn min_height(&self) -> f32 {
        self.uniform_scale * self.mesh_height_multiplier * self.mesh_height_curve.evaluate(0.0)
    }

    pub fn max_height(&self) -> f32 {
        self.uniform_scale * self.mesh_height_multiplier * self.mesh_height_curve.evaluate(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub noise: NoiseSettings,
    pub terrain: TerrainSettings,
    pub regions: Vec<TerrainBand>,
    pub chunk_size_index: usize,
    pub flatshaded_chunk_size_index: usize,
    pub editor_preview_lod: u8,
    /// Worker threads for background generation, 0 for one per logical CPU.
    pub worker_threads: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            noise: NoiseSettings::default(),
            terrain: TerrainSettings::default(),
            regions: crate::regions::default_bands(),
            chunk_size_index: 0,
            flatshaded_chunk_size_index: 0,
            editor_preview_lod: 0,
            worker_threads: 0,
        }
    }
}

impl GeneratorConfig {
    /// Reads a `.ron` or `.json` file, then sanitizes and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: GeneratorConfig = match extension(path).as_deref() {
            Some("ron") | None => ron::from_str(&text)?,
            Some("json") => serde_json::from_str(&text)?,
            Some(other) => return Err(TerrainError::UnknownFormat(other.to_string())),
        };
        config.sanitize();
        config.validate()?;
        log::info!("loaded terrain config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = match extension(path).as_deref() {
            Some("ron") | None => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?,
            Some("json") => serde_json::to_string_pretty(self)?,
            Some(other) => return Err(TerrainError::UnknownFormat(other.to_string())),
        };
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn sanitize(&mut self) {
        self.noise.sanitize();
        self.regions.sort_by(|a, b| a.height.total_cmp(&b.height));
    }

    pub fn validate(&self) -> Result<()> {
        let (table, index) = self.chunk_size_table();
        if index >= table.len() {
            return Err(TerrainError::UnsupportedChunkSize { index, supported: table.len() });
        }
        LevelOfDetail::new(self.editor_preview_lod)?;
        for lod in LevelOfDetail::all() {
            check_chunk_lod(table[index], lod)?;
        }
        Ok(())
    }

    fn chunk_size_table(&self) -> (&'static [usize], usize) {
        if self.terrain.use_flat_shading {
            (&SUPPORTED_FLATSHADED_CHUNK_SIZES, self.flatshaded_chunk_size_index)
        } else {
            (&SUPPORTED_CHUNK_SIZES, self.chunk_size_index)
        }
    }

    /// Interior vertices per chunk side; the generated maps are two larger.
    pub fn map_chunk_size(&self) -> Result<usize> {
        let (table, index) = self.chunk_size_table();
        table
            .get(index)
            .copied()
            .ok_or(TerrainError::UnsupportedChunkSize { index, supported: table.len() })
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
}
