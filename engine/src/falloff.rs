//! Island mask: 0 in the middle of the map, rising to 1 at the edges.
//! Subtracting it from a noise map sinks the chunk borders into the sea.

use crate::api::HeightMap;

const STEEPNESS: f32 = 3.0;
const SHIFT: f32 = 2.2;

/// S-curve applied to the distance-from-centre value `v` in [0, 1].
#[inline]
pub fn falloff_curve(v: f32) -> f32 {
    let a = v.powf(STEEPNESS);
    let b = (SHIFT - SHIFT * v).powf(STEEPNESS);
    if a + b == 0.0 { 0.0 } else { a / (a + b) }
}

/// Maps cell `i` of a `size` wide row into [-1, 1].
#[inline]
fn normalized(i: usize, size: usize) -> f32 {
    if size <= 1 {
        return 0.0;
    }
    let span = (size - 1) as f32;
    (2.0 * i as f32 - span) / span
}

pub fn generate_falloff_map(size: usize) -> HeightMap {
    HeightMap::from_fn(size, size, |i, j| {
        let x = normalized(i, size);
        let y = normalized(j, size);
        falloff_curve(x.abs().max(y.abs()))
    })
}
