use glam::Vec2;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::api::HeightMap;
use crate::config::{NoiseSettings, NormalizeMode};

/// Smallest scale used when the caller passes a non-positive one.
pub const MIN_SCALE: f32 = 0.0001;

/// Range each per-octave offset is drawn from.
const OCTAVE_OFFSET_RANGE: std::ops::Range<i32> = -100_000..100_000;

/// Perlin sample remapped into [0, 1].
#[inline]
fn perlin01(perlin: &Perlin, x: f32, y: f32) -> f32 {
    let v = perlin.get([x as f64, y as f64]) as f32;
    ((v + 1.0) * 0.5).clamp(0.0, 1.0)
}

/// One translation per octave, drawn from a stream seeded by `seed`.
///
/// The caller's offset is added on x and subtracted on y.
pub fn octave_offsets(seed: i32, octaves: usize, offset: Vec2) -> Vec<Vec2> {
    let mut prng = ChaCha8Rng::seed_from_u64(seed as i64 as u64);
    (0..octaves)
        .map(|_| {
            let x = prng.gen_range(OCTAVE_OFFSET_RANGE) as f32 + offset.x;
            let y = prng.gen_range(OCTAVE_OFFSET_RANGE) as f32 - offset.y;
            Vec2::new(x, y)
        })
        .collect()
}

/// Sum of every octave's amplitude, the largest height the octave stack can reach.
pub fn max_possible_height(octaves: usize, persistence: f32) -> f32 {
    let mut amplitude = 1.0;
    let mut total = 0.0;
    for _ in 0..octaves {
        total += amplitude;
        amplitude *= persistence;
    }
    total
}

/// Position of `v` between `a` and `b`, clamped to [0, 1]; 0 when the range is empty.
#[inline]
pub(crate) fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if a == b { 0.0 } else { ((v - a) / (b - a)).clamp(0.0, 1.0) }
}

/// Fractal noise grid of `width` x `height` cells.
///
/// Pure: the result only depends on the arguments, so chunks may be generated
/// concurrently from any thread.
pub fn generate_noise_map(width: usize, height: usize, settings: &NoiseSettings) -> HeightMap {
    let octaves = settings.octaves.max(0) as usize;
    let scale = if settings.scale <= 0.0 { MIN_SCALE } else { settings.scale };
    let persistence = settings.persistence;
    let lacunarity = settings.lacunarity;

    let mut map = HeightMap::new(width, height);
    if octaves == 0 || map.is_empty() {
        return map;
    }

    let perlin = Perlin::default();
    let offsets = octave_offsets(settings.seed, octaves, settings.offset);
    let max_possible = max_possible_height(octaves, persistence);

    let half_width = width as f32 / 2.0;
    let half_height = height as f32 / 2.0;

    let mut min_local = f32::MAX;
    let mut max_local = f32::MIN;

    for y in 0..height {
        for x in 0..width {
            let mut amplitude = 1.0;
            let mut frequency = 1.0;
            let mut noise_height = 0.0;

            for offset in &offsets {
                let sample_x = (x as f32 - half_width + offset.x) / scale * frequency;
                let sample_y = (y as f32 - half_height + offset.y) / scale * frequency;
                let value = perlin01(&perlin, sample_x, sample_y) * 2.0 - 1.0;
                noise_height += value * amplitude;

                amplitude *= persistence;
                frequency *= lacunarity;
            }

            min_local = min_local.min(noise_height);
            max_local = max_local.max(noise_height);
            map.set(x, y, noise_height);
        }
    }

    match settings.normalize_mode {
        NormalizeMode::Local => {
            for v in map.values_mut() {
                *v = inverse_lerp(min_local, max_local, *v);
            }
        }
        NormalizeMode::Global => {
            // Lower bound only: tall outliers above 1 are kept.
            for v in map.values_mut() {
                *v = ((*v + 1.0) / max_possible).max(0.0);
            }
        }
    }

    log::trace!(
        "noise map {}x{} seed {} raw range [{:.3}, {:.3}] ({:?})",
        width, height, settings.seed, min_local, max_local, settings.normalize_mode
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: NormalizeMode) -> NoiseSettings {
        NoiseSettings {
            normalize_mode: mode,
            scale: 27.6,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            seed: 7,
            offset: Vec2::new(3.0, -11.0),
        }
    }

    #[test]
    fn same_inputs_give_identical_maps() {
        let s = settings(NormalizeMode::Global);
        let a = generate_noise_map(33, 21, &s);
        let b = generate_noise_map(33, 21, &s);
        assert_eq!(a, b);
    }

    #[test]
    fn identical_across_threads() {
        let s = settings(NormalizeMode::Local);
        let expected = generate_noise_map(24, 24, &s);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = s.clone();
                std::thread::spawn(move || generate_noise_map(24, 24, &s))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }

    #[test]
    fn local_mode_spans_unit_range() {
        let map = generate_noise_map(40, 40, &settings(NormalizeMode::Local));
        assert!(map.values().iter().all(|v| (0.0..=1.0).contains(v)));
        let (lo, hi) = map.min_max().unwrap();
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 1.0);
    }

    #[test]
    fn global_mode_is_non_negative() {
        let mut s = settings(NormalizeMode::Global);
        s.persistence = 0.9;
        let map = generate_noise_map(40, 40, &s);
        assert!(map.values().iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn global_mode_keeps_values_above_one() {
        // one octave divides by 1, so raw peaks land in (1, 2]
        let mut s = settings(NormalizeMode::Global);
        s.octaves = 1;
        let map = generate_noise_map(64, 64, &s);
        let (lo, hi) = map.min_max().unwrap();
        assert!(lo >= 0.0);
        assert!(hi > 1.0, "peak {hi} was clamped");
        assert!(hi <= 2.0);
    }

    #[test]
    fn different_seeds_decorrelate() {
        let a = generate_noise_map(16, 16, &settings(NormalizeMode::Global));
        let mut s = settings(NormalizeMode::Global);
        s.seed = 8;
        let b = generate_noise_map(16, 16, &s);
        assert_ne!(a, b);
    }

    #[test]
    fn non_positive_scale_does_not_produce_nan() {
        let mut s = settings(NormalizeMode::Local);
        s.scale = 0.0;
        let map = generate_noise_map(8, 8, &s);
        assert!(map.values().iter().all(|v| !v.is_nan()));
        s.scale = -4.0;
        let map = generate_noise_map(8, 8, &s);
        assert!(map.values().iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn zero_octaves_is_flat_zero() {
        let mut s = settings(NormalizeMode::Global);
        s.octaves = 0;
        let map = generate_noise_map(5, 5, &s);
        assert!(map.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn offsets_follow_caller_offset_with_flipped_y() {
        let base = octave_offsets(3, 2, Vec2::ZERO);
        let shifted = octave_offsets(3, 2, Vec2::new(10.0, 10.0));
        for (a, b) in base.iter().zip(&shifted) {
            assert_eq!(b.x - a.x, 10.0);
            assert_eq!(b.y - a.y, -10.0);
            assert!(a.x >= -100_000.0 && a.x < 100_000.0);
        }
    }

    #[test]
    fn max_possible_height_is_geometric_sum() {
        assert_eq!(max_possible_height(0, 0.5), 0.0);
        assert_eq!(max_possible_height(3, 0.5), 1.75);
    }

    #[test]
    fn inverse_lerp_handles_empty_range() {
        assert_eq!(inverse_lerp(2.0, 2.0, 2.0), 0.0);
        assert_eq!(inverse_lerp(0.0, 4.0, 1.0), 0.25);
    }
}
