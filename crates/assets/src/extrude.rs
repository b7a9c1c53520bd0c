//! Swept meshes: a cross-section template stretched along a chain of oriented segments.
//!
//! Each template vertex is placed by its position along the extrusion axis. That
//! position becomes a time `t` in `0..=1`: the vertex lands at the interpolated
//! transform between the segment's start and end (linear position, shortest-arc
//! rotation). Every segment therefore emits exactly one copy of the template's
//! vertices, so N segments over an M-vertex template give N×M vertices.

use glam::{Quat, Vec2, Vec3};
use parkscape_common::Pose;

use crate::AssetError;
use crate::mesh::{Aabb, Mesh};

/// Extrusion axis of the template, in template-local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The template axis lateral offsets are applied along.
    fn lateral(self) -> usize {
        match self {
            Axis::X => 1,
            Axis::Y | Axis::Z => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: Pose,
    end: Pose,
    offset: f32,
    multiplier: f32,
    layer: i32,
}

/// Builds one continuous mesh out of extruded segments.
#[derive(Debug, Clone)]
pub struct MeshExtruder {
    template: Mesh,
    bounds: Aabb,
    axis: Axis,
    segments: Vec<Segment>,
}

impl MeshExtruder {
    /// Create an extruder over a cross-section template, extruding along Z.
    ///
    /// A template without vertices or triangles is rejected.
    pub fn new(cross_section: Mesh) -> Result<Self, AssetError> {
        if cross_section.vertices.is_empty() || cross_section.triangles.is_empty() {
            return Err(AssetError::EmptyCrossSection);
        }
        Ok(Self {
            bounds: cross_section.bounds(),
            template: cross_section,
            axis: Axis::default(),
            segments: Vec::new(),
        })
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    pub fn template(&self) -> &Mesh {
        &self.template
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Queue a segment. Segments are emitted by ascending `layer`, then in the
    /// order they were added.
    pub fn add_segment(
        &mut self,
        start: Pose,
        end: Pose,
        offset: f32,
        multiplier: f32,
        layer: i32,
    ) {
        self.segments.push(Segment {
            start,
            end,
            offset,
            multiplier,
            layer,
        });
    }

    /// Drop all queued segments, keeping the template.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Build the mesh of all queued segments.
    pub fn to_mesh(&self) -> Mesh {
        let mut ordered: Vec<&Segment> = self.segments.iter().collect();
        // Vec::sort_by_key is stable, so insertion order breaks ties.
        ordered.sort_by_key(|s| s.layer);

        let per_segment = self.template.vertices.len();
        let mut out = Mesh {
            vertices: Vec::with_capacity(per_segment * ordered.len()),
            normals: Vec::with_capacity(per_segment * ordered.len()),
            uvs: Vec::with_capacity(per_segment * ordered.len()),
            triangles: Vec::with_capacity(self.template.triangles.len() * ordered.len()),
        };

        for segment in ordered {
            self.extrude_into(segment, &mut out);
        }

        tracing::trace!(
            segments = self.segments.len(),
            vertices = out.vertices.len(),
            "extruded mesh built"
        );
        out
    }

    fn extrude_into(&self, segment: &Segment, out: &mut Mesh) {
        let axis = self.axis.index();
        let lateral = self.axis.lateral();
        let min = self.bounds.min[axis];
        let span = self.bounds.size()[axis];

        let start_rot = normalize_or_identity(segment.start.rotation);
        let end_rot = normalize_or_identity(segment.end.rotation);
        let base = out.vertices.len() as u32;

        for (i, vertex) in self.template.vertices.iter().enumerate() {
            let t = if span > f32::EPSILON {
                ((vertex[axis] - min) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let mut local = *vertex;
            local[axis] = 0.0;
            local *= segment.multiplier;
            local[lateral] += segment.offset;

            let rotation = start_rot.slerp(end_rot, t);
            let position = segment.start.position.lerp(segment.end.position, t) + rotation * local;
            let normal = self.template.normals.get(i).copied().unwrap_or(Vec3::Y);

            out.vertices.push(position);
            out.normals.push(rotation * normal);
            out.uvs
                .push(self.template.uvs.get(i).copied().unwrap_or(Vec2::ZERO));
        }

        out.triangles
            .extend(self.template.triangles.iter().map(|&index| index + base));
    }
}

fn normalize_or_identity(rotation: Quat) -> Quat {
    let length = rotation.length();
    if !length.is_finite() || length <= f32::EPSILON {
        Quat::IDENTITY
    } else {
        rotation / length
    }
}
