use std::sync::Arc;

use crate::api::HeightMap;

/// Height data of one chunk, ready to be meshed.
///
/// Cloning only bumps a reference count, so the same map can be handed to
/// several mesh requests at different levels of detail.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    pub height_map: Arc<HeightMap>,
}

impl MapData {
    pub fn new(height_map: HeightMap) -> Self {
        Self { height_map: Arc::new(height_map) }
    }
}

/// Subtracts `falloff` from `noise` and clamps into [0, 1].
///
/// Without a mask the noise map is returned untouched. A mask whose shape
/// differs from the noise map is a caller bug and panics.
pub fn compose(noise: HeightMap, falloff: Option<&HeightMap>) -> HeightMap {
    let Some(mask) = falloff else {
        return noise;
    };
    assert!(
        noise.same_shape(mask),
        "falloff mask {}x{} does not match noise map {}x{}",
        mask.width(),
        mask.height(),
        noise.width(),
        noise.height()
    );

    let data = noise
        .values()
        .iter()
        .zip(mask.values())
        .map(|(n, f)| (n - f).clamp(0.0, 1.0))
        .collect();
    HeightMap::from_vec(noise.width(), noise.height(), data).with_border(noise.border())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::falloff::generate_falloff_map;

    #[test]
    fn disabled_falloff_passes_noise_through() {
        let noise = HeightMap::from_fn(4, 4, |x, y| (x + y) as f32 * 0.3);
        let out = compose(noise.clone(), None);
        assert_eq!(out, noise);
    }

    #[test]
    fn subtract_and_clamp_per_cell() {
        let noise = HeightMap::from_fn(9, 9, |x, y| ((x * 7 + y * 3) % 11) as f32 / 7.0);
        let mask = generate_falloff_map(9);
        let out = compose(noise.clone(), Some(&mask));
        for y in 0..9 {
            for x in 0..9 {
                let expected = (noise.get(x, y) - mask.get(x, y)).clamp(0.0, 1.0);
                assert_eq!(out.get(x, y), expected);
            }
        }
    }

    #[test]
    fn border_survives_composition() {
        let noise = HeightMap::new(6, 6).with_border(1);
        let mask = generate_falloff_map(6);
        assert_eq!(compose(noise, Some(&mask)).border(), 1);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn mismatched_mask_panics() {
        let noise = HeightMap::new(6, 6);
        let mask = generate_falloff_map(7);
        let _ = compose(noise, Some(&mask));
    }
}
