use std::collections::HashMap;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A triangle mesh with per-vertex normals and UVs.
///
/// `triangles` holds three vertex indices per triangle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub triangles: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// True when every position, normal and UV is finite.
    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(|v| v.is_finite())
            && self.normals.iter().all(|n| n.is_finite())
            && self.uvs.iter().all(|uv| uv.is_finite())
    }

    /// Replace normals with the area-weighted average of the adjacent face normals.
    pub fn recalculate_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.triangles.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
            let face = (self.vertices[b] - self.vertices[a])
                .cross(self.vertices[c] - self.vertices[a]);
            for i in [a, b, c] {
                normals[i] += face;
            }
        }
        self.normals = normals.into_iter().map(Vec3::normalize_or_zero).collect();
    }

    /// Append another mesh, rebasing its triangle indices.
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.triangles
            .extend(other.triangles.iter().map(|&i| i + base));
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

impl Aabb {
    /// Bounds of a point set. An empty set gives a zero-sized box at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// One vertex for [`MeshBuilder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    fn key(&self) -> [u32; 8] {
        [
            self.position.x.to_bits(),
            self.position.y.to_bits(),
            self.position.z.to_bits(),
            self.normal.x.to_bits(),
            self.normal.y.to_bits(),
            self.normal.z.to_bits(),
            self.uv.x.to_bits(),
            self.uv.y.to_bits(),
        ]
    }
}

/// Incremental mesh construction with vertex welding.
///
/// Vertices that are bit-identical in position, normal and UV share one index.
/// Triangles with two coincident positions are dropped.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    lookup: HashMap<[u32; 8], u32>,
    vertices: Vec<Vertex>,
    triangles: Vec<u32>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let next = self.vertices.len() as u32;
        let index = *self.lookup.entry(vertex.key()).or_insert(next);
        if index == next {
            self.vertices.push(vertex);
        }
        index
    }

    /// Add a clockwise triangle.
    pub fn add_triangle(&mut self, a: Vertex, b: Vertex, c: Vertex) {
        if a.position == b.position || b.position == c.position || a.position == c.position {
            return;
        }
        let ia = self.add_vertex(a);
        let ib = self.add_vertex(b);
        let ic = self.add_vertex(c);
        self.triangles.extend([ia, ib, ic]);
    }

    /// Add a quad as two triangles. Order: top left, top right, bottom right, bottom left.
    pub fn add_quad(&mut self, a: Vertex, b: Vertex, c: Vertex, d: Vertex) {
        self.add_triangle(a, b, c);
        self.add_triangle(c, d, a);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn bounds(&self) -> Aabb {
        let points: Vec<Vec3> = self.vertices.iter().map(|v| v.position).collect();
        Aabb::from_points(&points)
    }

    pub fn clear(&mut self) {
        self.lookup.clear();
        self.vertices.clear();
        self.triangles.clear();
    }

    pub fn to_mesh(&self) -> Mesh {
        Mesh {
            vertices: self.vertices.iter().map(|v| v.position).collect(),
            normals: self.vertices.iter().map(|v| v.normal).collect(),
            uvs: self.vertices.iter().map(|v| v.uv).collect(),
            triangles: self.triangles.clone(),
        }
    }
}

/// A flat, upward-facing square centred on the origin.
pub fn flat_quad(half_extent: f32, height: f32) -> Mesh {
    let mut builder = MeshBuilder::new();
    let e = half_extent;
    builder.add_quad(
        Vertex::new(Vec3::new(e, height, e), Vec3::Y, Vec2::ONE),
        Vertex::new(Vec3::new(e, height, -e), Vec3::Y, Vec2::X),
        Vertex::new(Vec3::new(-e, height, -e), Vec3::Y, Vec2::ZERO),
        Vertex::new(Vec3::new(-e, height, e), Vec3::Y, Vec2::Y),
    );
    builder.to_mesh()
}

/// A rectangular bar running along Z, `length` long, with open ends.
///
/// Used as the cross-section template for extruded track.
pub fn bar_along_z(half_width: f32, half_height: f32, length: f32) -> Mesh {
    let mut builder = MeshBuilder::new();
    let (w, h) = (half_width, half_height);
    let (z0, z1) = (-length / 2.0, length / 2.0);
    let faces = [
        (Vec3::Y, [(-w, h), (w, h)]),
        (Vec3::NEG_Y, [(w, -h), (-w, -h)]),
        (Vec3::X, [(w, h), (w, -h)]),
        (Vec3::NEG_X, [(-w, -h), (-w, h)]),
    ];
    for (normal, [(ax, ay), (bx, by)]) in faces {
        builder.add_quad(
            Vertex::new(Vec3::new(ax, ay, z1), normal, Vec2::new(0.0, 1.0)),
            Vertex::new(Vec3::new(bx, by, z1), normal, Vec2::new(1.0, 1.0)),
            Vertex::new(Vec3::new(bx, by, z0), normal, Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::new(ax, ay, z0), normal, Vec2::new(0.0, 0.0)),
        );
    }
    builder.to_mesh()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32) -> Vertex {
        Vertex::new(Vec3::new(x, y, z), Vec3::Y, Vec2::ZERO)
    }

    #[test]
    fn builder_welds_identical_vertices() {
        let mut builder = MeshBuilder::new();
        builder.add_quad(v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 0.0, 1.0), v(0.0, 0.0, 1.0));
        let mesh = builder.to_mesh();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn builder_drops_degenerate_triangles() {
        let mut builder = MeshBuilder::new();
        builder.add_triangle(v(0.0, 0.0, 0.0), v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0));
        assert_eq!(builder.vertex_count(), 0);
        assert!(builder.to_mesh().is_empty());
    }

    #[test]
    fn builder_clear_resets() {
        let mut builder = MeshBuilder::new();
        builder.add_triangle(v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0));
        builder.clear();
        assert_eq!(builder.vertex_count(), 0);
        builder.add_triangle(v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0));
        assert_eq!(builder.to_mesh().triangles, vec![0, 1, 2]);
    }

    #[test]
    fn aabb_of_points() {
        let b = Aabb::from_points(&[Vec3::new(-1.0, 2.0, 0.0), Vec3::new(3.0, -2.0, 4.0)]);
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(3.0, 2.0, 4.0));
        assert_eq!(b.center(), Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(b.extents(), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(Aabb::from_points(&[]), Aabb::default());
    }

    #[test]
    fn append_rebases_indices() {
        let quad = flat_quad(0.5, 0.0);
        let mut mesh = quad.clone();
        mesh.append(&quad);
        assert_eq!(mesh.vertex_count(), 8);
        let rebased: Vec<u32> = quad.triangles.iter().map(|i| i + 4).collect();
        assert_eq!(&mesh.triangles[6..], rebased.as_slice());
    }

    #[test]
    fn bar_has_four_faces() {
        let bar = bar_along_z(0.1, 0.05, 1.0);
        assert_eq!(bar.vertex_count(), 16);
        assert_eq!(bar.triangle_count(), 8);
        let bounds = bar.bounds();
        assert_eq!(bounds.size().z, 1.0);
        assert!(bar.is_finite());
    }

    #[test]
    fn recalculated_normals_follow_winding() {
        let mut quad = flat_quad(0.5, 1.0);
        quad.normals.iter_mut().for_each(|n| *n = Vec3::ZERO);
        quad.recalculate_normals();
        assert_eq!(quad.normals.len(), 4);
        assert!(quad.normals.iter().all(|n| n.abs_diff_eq(Vec3::Y, 1e-6)));
    }

    #[test]
    fn shared_vertices_average_face_normals() {
        let mut builder = MeshBuilder::new();
        let p = |x: f32, y: f32, z: f32| Vertex::new(Vec3::new(x, y, z), Vec3::ZERO, Vec2::ZERO);
        // Two faces folded along the z axis: one rising towards -x, one flat.
        builder.add_quad(p(0.0, 0.0, 1.0), p(0.0, 0.0, 0.0), p(-1.0, 1.0, 0.0), p(-1.0, 1.0, 1.0));
        builder.add_quad(p(1.0, 0.0, 1.0), p(1.0, 0.0, 0.0), p(0.0, 0.0, 0.0), p(0.0, 0.0, 1.0));
        let mut mesh = builder.to_mesh();
        mesh.recalculate_normals();
        let fold = mesh
            .vertices
            .iter()
            .position(|v| *v == Vec3::ZERO)
            .unwrap();
        let n = mesh.normals[fold];
        assert!(n.y > 0.0 && n.x > 0.0);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }
}
