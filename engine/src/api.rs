use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("chunk size index {index} out of range (supported: {supported})")]
    UnsupportedChunkSize { index: usize, supported: usize },
    #[error("level of detail {0} is not supported (max {})", crate::config::MAX_LOD)]
    UnsupportedLod(u8),
    #[error("chunk size {size} cannot be sampled at stride {stride}")]
    IndivisibleChunkSize { size: usize, stride: usize },
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("config serialize error: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("unknown config format: {0}")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, TerrainError>;

/// Row-major grid of height samples.
///
/// `border` is the width of the ring of cells that only exists to give the
/// mesh builder neighbour samples. Grids straight out of the noise or falloff
/// generators have no border; chunk maps carry a one-cell ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHeightMap")]
pub struct HeightMap {
    width: usize,
    height: usize,
    border: usize,
    data: Vec<f32>,
}

#[derive(Deserialize)]
struct RawHeightMap {
    width: usize,
    height: usize,
    #[serde(default)]
    border: usize,
    data: Vec<f32>,
}

impl TryFrom<RawHeightMap> for HeightMap {
    type Error = String;

    fn try_from(raw: RawHeightMap) -> std::result::Result<Self, String> {
        let RawHeightMap { width, height, border, data } = raw;
        if data.len() != width * height {
            return Err(format!("{} samples do not fill a {width}x{height} height map", data.len()));
        }
        if border > 0 && 2 * border >= width.min(height) {
            return Err(format!("border {border} leaves no interior in a {width}x{height} height map"));
        }
        Ok(Self { width, height, border, data })
    }
}

impl HeightMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, border: 0, data: vec![0.0; width * height] }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), width * height, "height map data does not match {width}x{height}");
        Self { width, height, border: 0, data }
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, border: 0, data }
    }

    /// Marks the outer `border` ring as neighbour-only samples.
    pub fn with_border(mut self, border: usize) -> Self {
        assert!(
            2 * border < self.width.min(self.height).max(1),
            "border {border} leaves no interior in a {}x{} map",
            self.width,
            self.height
        );
        self.border = border;
        self
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn border(&self) -> usize { self.border }

    /// Side length of the logical interior along x.
    pub fn interior_size(&self) -> usize { self.width - 2 * self.border }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 { self.data[self.index(x, y)] }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn values(&self) -> &[f32] { &self.data }

    pub fn values_mut(&mut self) -> &mut [f32] { &mut self.data }

    pub fn same_shape(&self, other: &HeightMap) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.data.iter().copied().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba8(pub [u8; 4]);

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8([0, 0, 0, 0]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self { Rgba8([r, g, b, 255]) }

    /// Gray ramp from black at 0 to white at 1, as used for height previews.
    pub fn gray(t: f32) -> Self {
        let v = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgb(v, v, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_is_row_major() {
        let map = HeightMap::from_fn(3, 2, |x, y| (y * 10 + x) as f32);
        assert_eq!(map.values(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(map.get(2, 1), 12.0);
    }

    #[test]
    fn border_shrinks_interior() {
        let map = HeightMap::new(7, 7).with_border(1);
        assert_eq!(map.border(), 1);
        assert_eq!(map.interior_size(), 5);
    }

    #[test]
    #[should_panic]
    fn from_vec_rejects_wrong_length() {
        let _ = HeightMap::from_vec(4, 4, vec![0.0; 15]);
    }

    #[test]
    fn min_max_of_empty_map_is_none() {
        assert!(HeightMap::new(0, 0).min_max().is_none());
        let map = HeightMap::from_vec(2, 1, vec![-1.0, 3.0]);
        assert_eq!(map.min_max(), Some((-1.0, 3.0)));
    }

    #[test]
    fn deserializing_checks_shape() {
        let map: HeightMap = ron::from_str("(width: 2, height: 1, border: 0, data: [0.5, 1.0])").unwrap();
        assert_eq!(map.get(1, 0), 1.0);
        assert!(ron::from_str::<HeightMap>("(width: 2, height: 2, border: 0, data: [0.0])").is_err());
        assert!(ron::from_str::<HeightMap>("(width: 2, height: 2, border: 1, data: [0.0, 0.0, 0.0, 0.0])").is_err());
    }

    #[test]
    fn gray_ramp_endpoints() {
        assert_eq!(Rgba8::gray(0.0), Rgba8([0, 0, 0, 255]));
        assert_eq!(Rgba8::gray(1.0), Rgba8([255, 255, 255, 255]));
        assert_eq!(Rgba8::gray(4.0), Rgba8([255, 255, 255, 255]));
    }
}
