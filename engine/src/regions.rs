//! Height banding for flat colour previews (water, sand, grass, rock...).

use serde::{Deserialize, Serialize};

use crate::api::{HeightMap, Rgba8};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainBand {
    pub name: String,
    /// Lowest normalized height painted with `colour`.
    pub height: f32,
    pub colour: Rgba8,
}

impl TerrainBand {
    pub fn new(name: impl Into<String>, height: f32, colour: Rgba8) -> Self {
        Self { name: name.into(), height, colour }
    }
}

pub fn default_bands() -> Vec<TerrainBand> {
    vec![
        TerrainBand::new("deep water", 0.0, Rgba8::rgb(40, 66, 148)),
        TerrainBand::new("water", 0.3, Rgba8::rgb(54, 100, 196)),
        TerrainBand::new("sand", 0.4, Rgba8::rgb(210, 208, 125)),
        TerrainBand::new("grass", 0.45, Rgba8::rgb(86, 152, 23)),
        TerrainBand::new("grass 2", 0.55, Rgba8::rgb(62, 107, 18)),
        TerrainBand::new("rock", 0.6, Rgba8::rgb(90, 69, 60)),
        TerrainBand::new("rock 2", 0.7, Rgba8::rgb(75, 60, 53)),
        TerrainBand::new("snow", 0.9, Rgba8::rgb(255, 255, 255)),
    ]
}

/// Colour of the highest band whose threshold `height` reaches.
///
/// Heights below every band get [`Rgba8::TRANSPARENT`].
pub fn colour_at(bands: &[TerrainBand], height: f32) -> Rgba8 {
    bands
        .iter()
        .filter(|b| height >= b.height)
        .max_by(|a, b| a.height.total_cmp(&b.height))
        .map(|b| b.colour)
        .unwrap_or(Rgba8::TRANSPARENT)
}

/// Row-major colour per cell of `map`.
pub fn colour_map(bands: &[TerrainBand], map: &HeightMap) -> Vec<Rgba8> {
    map.values().iter().map(|h| colour_at(bands, *h)).collect()
}
