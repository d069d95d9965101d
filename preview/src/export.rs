use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use terrain_engine::{HeightMap, MeshData, Rgba8};

/// Black at 0, white at 1. Values outside the unit range saturate.
pub fn height_image(map: &HeightMap) -> GrayImage {
    GrayImage::from_fn(map.width() as u32, map.height() as u32, |x, y| {
        let Rgba8([v, ..]) = Rgba8::gray(map.get(x as usize, y as usize));
        Luma([v])
    })
}

pub fn colour_image(width: usize, height: usize, pixels: &[Rgba8]) -> RgbaImage {
    RgbaImage::from_fn(width as u32, height as u32, |x, y| {
        Rgba(pixels[y as usize * width + x as usize].0)
    })
}

pub fn write_png_gray(path: &Path, image: &GrayImage) -> Result<()> {
    image.save(path).with_context(|| format!("writing {}", path.display()))
}

pub fn write_png_rgba(path: &Path, image: &RgbaImage) -> Result<()> {
    image.save(path).with_context(|| format!("writing {}", path.display()))
}

/// Wavefront OBJ with positions, uvs and normals sharing one index.
///
/// Positions are multiplied by `uniform_scale`, the size the chunk is drawn at.
pub fn write_obj(path: &Path, mesh: &MeshData, uniform_scale: f32) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for p in &mesh.positions {
        let [x, y, z] = (*p * uniform_scale).to_array();
        writeln!(out, "v {x} {y} {z}")?;
    }
    for uv in &mesh.uvs {
        writeln!(out, "vt {} {}", uv.x, uv.y)?;
    }
    for [x, y, z] in mesh.normals_array() {
        writeln!(out, "vn {x} {y} {z}")?;
    }
    for [a, b, c] in mesh.triangles() {
        // obj indices are 1-based
        let (a, b, c) = (a + 1, b + 1, c + 1);
        writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
    }
    out.flush()?;
    Ok(())
}
