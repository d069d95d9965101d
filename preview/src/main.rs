//! Headless terrain preview: loads a generator config, renders every preview
//! mode of the origin chunk to disk and streams a small ring of chunks
//! through the background queues.
//!
//! Usage: terrain_preview [config.ron|config.json] [output dir]

mod export;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use terrain_engine::{GeneratorConfig, LevelOfDetail, Preview, PreviewMode, TerrainGenerator, Vec2};

const STREAM_RADIUS: i32 = 1;
const STREAM_TIMEOUT: Duration = Duration::from_secs(60);

fn load_config(path: Option<&str>) -> Result<GeneratorConfig> {
    match path {
        Some(path) => {
            log::info!("loading config from {path}");
            GeneratorConfig::load(path).with_context(|| format!("loading config {path}"))
        }
        None => {
            log::info!("no config given, using defaults");
            Ok(GeneratorConfig::default())
        }
    }
}

fn render_previews(generator: &TerrainGenerator, out_dir: &Path) -> Result<()> {
    for (mode, name) in [
        (PreviewMode::NoiseMap, "noise_map"),
        (PreviewMode::FalloffMap, "falloff_map"),
        (PreviewMode::ColourMap, "colour_map"),
        (PreviewMode::Mesh, "mesh"),
    ] {
        match generator.draw_preview(mode)? {
            Preview::Heights(map) => {
                let path = out_dir.join(format!("{name}.png"));
                export::write_png_gray(&path, &export::height_image(&map))?;
                log::info!("wrote {} ({}x{})", path.display(), map.width(), map.height());
            }
            Preview::Colours { width, height, pixels } => {
                let path = out_dir.join(format!("{name}.png"));
                export::write_png_rgba(&path, &export::colour_image(width, height, &pixels))?;
                log::info!("wrote {} ({width}x{height})", path.display());
            }
            Preview::Mesh(mesh) => {
                let path = out_dir.join(format!("{name}.obj"));
                export::write_obj(&path, &mesh, generator.config().terrain.uniform_scale)?;
                log::info!(
                    "wrote {} ({} vertices, {} triangles)",
                    path.display(),
                    mesh.vertex_count(),
                    mesh.triangle_count()
                );
            }
        }
    }
    Ok(())
}

/// Requests map data for a ring of chunks and a mesh per chunk at every LOD,
/// pumping `update` like a game loop until everything has arrived.
fn stream_chunks(generator: &mut TerrainGenerator) -> Result<()> {
    let step = generator.map_chunk_size() as f32 - 1.0;
    let maps = Rc::new(RefCell::new(Vec::new()));
    for x in -STREAM_RADIUS..=STREAM_RADIUS {
        for y in -STREAM_RADIUS..=STREAM_RADIUS {
            let maps = Rc::clone(&maps);
            let centre = Vec2::new(x as f32 * step, y as f32 * step);
            generator.request_map_data(centre, move |map| maps.borrow_mut().push((centre, map)));
        }
    }

    let meshes = Rc::new(RefCell::new(0usize));
    let started = Instant::now();
    let mut ticks = 0u32;
    while generator.in_flight() > 0 {
        generator.update();
        ticks += 1;

        for (centre, map) in maps.borrow_mut().drain(..) {
            log::debug!("chunk ({}, {}) ready, requesting meshes", centre.x, centre.y);
            for lod in LevelOfDetail::all() {
                let meshes = Rc::clone(&meshes);
                generator.request_mesh_data(&map, lod, move |mesh| {
                    log::trace!("lod {} mesh: {} vertices", lod.get(), mesh.vertex_count());
                    *meshes.borrow_mut() += 1;
                });
            }
        }

        if started.elapsed() > STREAM_TIMEOUT {
            bail!("chunk streaming timed out with {} requests in flight", generator.in_flight());
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    log::info!(
        "streamed {} meshes in {:?} over {ticks} ticks",
        meshes.borrow(),
        started.elapsed()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = load_config(args.next().as_deref())?;
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "preview_out".to_owned()));
    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut generator = TerrainGenerator::new(config)?;
    log::info!(
        "chunk size {}, {} worker threads",
        generator.map_chunk_size(),
        generator.worker_pool().num_threads()
    );

    render_previews(&generator, &out_dir)?;
    stream_chunks(&mut generator)?;
    Ok(())
}
