use glam::{Vec2, Vec3};

use crate::api::HeightMap;
use crate::config::LevelOfDetail;
use crate::curve::HeightCurve;

/// Finished terrain mesh, ready to hand to a renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize { self.positions.len() }

    pub fn triangle_count(&self) -> usize { self.indices.len() / 3 }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn positions_array(&self) -> Vec<[f32; 3]> {
        self.positions.iter().map(|v| v.to_array()).collect()
    }

    pub fn normals_array(&self) -> Vec<[f32; 3]> {
        self.normals.iter().map(|v| v.to_array()).collect()
    }
}

/// Unnormalized-safe face normal of triangle `a b c`.
#[inline]
fn surface_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

/// Collects vertices and triangles of a terrain chunk.
///
/// Vertex indices are signed: non-negative indices are real vertices, negative
/// ones address the border ring, which only feeds normal calculation and never
/// reaches the finished mesh.
#[derive(Default)]
pub struct TerrainMeshBuilder {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    border_positions: Vec<Vec3>,
    border_triangles: Vec<[i32; 3]>,
    flat_shaded: bool,
}

impl TerrainMeshBuilder {
    pub fn new(vertices_per_line: usize, flat_shaded: bool) -> Self {
        let vertices = vertices_per_line * vertices_per_line;
        let quads = vertices_per_line.saturating_sub(1).pow(2);
        Self {
            positions: Vec::with_capacity(vertices),
            uvs: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(quads * 6),
            border_positions: Vec::new(),
            border_triangles: Vec::new(),
            flat_shaded,
        }
    }

    /// Adds a real vertex and returns its index.
    pub fn add_vertex(&mut self, position: Vec3, uv: Vec2) -> i32 {
        self.positions.push(position);
        self.uvs.push(uv);
        self.positions.len() as i32 - 1
    }

    /// Adds a border vertex and returns its (negative) index.
    pub fn add_border_vertex(&mut self, position: Vec3) -> i32 {
        self.border_positions.push(position);
        -(self.border_positions.len() as i32)
    }

    pub fn add_triangle(&mut self, a: i32, b: i32, c: i32) {
        if a < 0 || b < 0 || c < 0 {
            self.border_triangles.push([a, b, c]);
        } else {
            self.indices.extend_from_slice(&[a as u32, b as u32, c as u32]);
        }
    }

    #[inline]
    fn position(&self, index: i32) -> Vec3 {
        if index < 0 {
            self.border_positions[(-index - 1) as usize]
        } else {
            self.positions[index as usize]
        }
    }

    /// Smooth normals: every triangle touching a vertex adds its face normal,
    /// including border triangles, so edge vertices match the neighbour chunk.
    fn bake_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let n = surface_normal(self.positions[a], self.positions[b], self.positions[c]);
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }

        for &[a, b, c] in &self.border_triangles {
            let n = surface_normal(self.position(a), self.position(b), self.position(c));
            for i in [a, b, c] {
                if i >= 0 {
                    normals[i as usize] += n;
                }
            }
        }

        normals.iter().map(|n| n.normalize_or_zero()).collect()
    }

    /// Gives each triangle its own three vertices and a single face normal.
    fn flat_shading(self) -> MeshData {
        let mut positions = Vec::with_capacity(self.indices.len());
        let mut uvs = Vec::with_capacity(self.indices.len());
        let mut normals = Vec::with_capacity(self.indices.len());

        for tri in self.indices.chunks_exact(3) {
            let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let n = surface_normal(
                self.positions[corners[0]],
                self.positions[corners[1]],
                self.positions[corners[2]],
            );
            for i in corners {
                positions.push(self.positions[i]);
                uvs.push(self.uvs[i]);
                normals.push(n);
            }
        }

        let indices = (0..positions.len() as u32).collect();
        MeshData { positions, normals, uvs, indices }
    }

    pub fn build(self) -> MeshData {
        if self.flat_shaded {
            return self.flat_shading();
        }
        let normals = self.bake_normals();
        MeshData { positions: self.positions, normals, uvs: self.uvs, indices: self.indices }
    }
}

/// Grid coordinates sampled along one axis: the border cells (if any) plus
/// every `stride`-th interior cell.
fn sample_coords(size: usize, border: usize, interior: usize, stride: usize) -> Vec<usize> {
    let mut coords = Vec::with_capacity(interior / stride + 3);
    if border > 0 {
        coords.push(0);
    }
    coords.extend((0..interior).step_by(stride).map(|i| border + i));
    if border > 0 {
        coords.push(size - 1);
    }
    coords
}

/// Turns a height map into a mesh at the requested level of detail.
///
/// The chunk is centred on the origin in XZ with one world unit per cell.
/// Heights are `curve(value) * height_multiplier`.
pub fn generate_terrain_mesh(
    height_map: &HeightMap,
    height_multiplier: f32,
    height_curve: &HeightCurve,
    lod: LevelOfDetail,
    flat_shaded: bool,
) -> MeshData {
    if height_map.is_empty() {
        return MeshData::default();
    }
    assert_eq!(height_map.width(), height_map.height(), "terrain chunks are square");

    let size = height_map.width();
    let border = height_map.border();
    let interior = height_map.interior_size();
    let stride = lod.stride();
    debug_assert!(
        (interior - 1) % stride == 0,
        "chunk size {interior} is not divisible by lod stride {stride}"
    );

    let span = (interior - 1) as f32;
    let top_left_x = -span / 2.0;
    let top_left_z = span / 2.0;
    let uv_scale = if interior > 1 { 1.0 / span } else { 0.0 };

    let coords = sample_coords(size, border, interior, stride);
    let line = coords.len();
    let vertices_per_line = (interior - 1) / stride + 1;

    let mut builder = TerrainMeshBuilder::new(vertices_per_line, flat_shaded);
    let mut index_map = vec![0i32; line * line];

    let is_border = |g: usize| border > 0 && (g == 0 || g == size - 1);

    for (j, &gy) in coords.iter().enumerate() {
        for (i, &gx) in coords.iter().enumerate() {
            let local_x = gx as f32 - border as f32;
            let local_y = gy as f32 - border as f32;
            let h = height_curve.evaluate(height_map.get(gx, gy)) * height_multiplier;
            let position = Vec3::new(top_left_x + local_x, h, top_left_z - local_y);

            index_map[j * line + i] = if is_border(gx) || is_border(gy) {
                builder.add_border_vertex(position)
            } else {
                builder.add_vertex(position, Vec2::new(local_x, local_y) * uv_scale)
            };
        }
    }

    for j in 0..line.saturating_sub(1) {
        for i in 0..line - 1 {
            let a = index_map[j * line + i];
            let b = index_map[j * line + i + 1];
            let c = index_map[(j + 1) * line + i];
            let d = index_map[(j + 1) * line + i + 1];
            builder.add_triangle(a, d, c);
            builder.add_triangle(d, a, b);
        }
    }

    let mesh = builder.build();
    log::trace!(
        "terrain mesh {}x{} lod {} flat {}: {} vertices, {} triangles",
        size, size, lod.get(), flat_shaded, mesh.vertex_count(), mesh.triangle_count()
    );
    mesh
}
