//! Polygon mesh topology handed over by the host
//!
//! N-gon faces over a shared vertex list. The snap engine copies this at
//! session start; nothing here is tied to a live host mesh.

use crate::view::{Mat4, Vec3, mat4_transform_point};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// N-gon face (supports 3+ vertices)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Vertex indices (3 for triangle, 4 for quad, n for n-gon)
    pub vertices: Vec<usize>,
}

impl Face {
    /// Create a triangle face
    pub fn tri(v0: usize, v1: usize, v2: usize) -> Self {
        Self { vertices: vec![v0, v1, v2] }
    }

    /// Create a quad face
    pub fn quad(v0: usize, v1: usize, v2: usize, v3: usize) -> Self {
        Self { vertices: vec![v0, v1, v2, v3] }
    }

    /// Create an n-gon face from a slice of vertex indices
    pub fn ngon(vertices: &[usize]) -> Self {
        Self { vertices: vertices.to_vec() }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get edges as pairs of vertex indices (in winding order)
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Fan triangulation: split n-gon into triangles from first vertex
    pub fn triangulate(&self) -> Vec<[usize; 3]> {
        let n = self.vertices.len();
        if n < 3 {
            return vec![];
        }

        (1..n - 1)
            .map(|i| [self.vertices[0], self.vertices[i], self.vertices[i + 1]])
            .collect()
    }
}

/// Vertices plus n-gon faces
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshTopology {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
}

impl MeshTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(vertices: Vec<Vec3>, faces: Vec<Face>) -> Self {
        Self { vertices, faces }
    }

    /// Cube centered at origin with shared corners.
    /// Face order: back (-Z), front (+Z), bottom, top, left, right.
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new( h, -h, -h),
            Vec3::new( h,  h, -h),
            Vec3::new(-h,  h, -h),
            Vec3::new(-h, -h,  h),
            Vec3::new( h, -h,  h),
            Vec3::new( h,  h,  h),
            Vec3::new(-h,  h,  h),
        ];
        let faces = vec![
            Face::quad(0, 3, 2, 1), // Back
            Face::quad(4, 5, 6, 7), // Front
            Face::quad(0, 1, 5, 4), // Bottom
            Face::quad(3, 7, 6, 2), // Top
            Face::quad(0, 4, 7, 3), // Left
            Face::quad(1, 2, 6, 5), // Right
        ];
        Self { vertices, faces }
    }

    /// Plane on the XZ plane, centered at origin
    pub fn plane(size: f32) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new( h, 0.0, -h),
            Vec3::new( h, 0.0,  h),
            Vec3::new(-h, 0.0,  h),
        ];
        Self { vertices, faces: vec![Face::quad(0, 3, 2, 1)] }
    }

    /// Square pyramid, base on y = 0
    pub fn pyramid(base_size: f32, height: f32) -> Self {
        let h = base_size / 2.0;
        let vertices = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new( h, 0.0, -h),
            Vec3::new( h, 0.0,  h),
            Vec3::new(-h, 0.0,  h),
            Vec3::new(0.0, height, 0.0),
        ];
        let faces = vec![
            Face::quad(0, 1, 2, 3),
            Face::tri(3, 2, 4),
            Face::tri(2, 1, 4),
            Face::tri(1, 0, 4),
            Face::tri(0, 3, 4),
        ];
        Self { vertices, faces }
    }

    /// N-sided prism (cylinder approximation) centered on the Y axis, base on y = 0
    pub fn prism(sides: usize, radius: f32, height: f32) -> Self {
        let sides = sides.max(3);
        let mut vertices = Vec::with_capacity(sides * 2);
        for y in [0.0, height] {
            for i in 0..sides {
                let a = i as f32 / sides as f32 * std::f32::consts::TAU;
                vertices.push(Vec3::new(radius * a.cos(), y, radius * a.sin()));
            }
        }

        let mut faces = Vec::with_capacity(sides + 2);
        let bottom: Vec<usize> = (0..sides).rev().collect();
        let top: Vec<usize> = (sides..sides * 2).collect();
        faces.push(Face::ngon(&bottom));
        faces.push(Face::ngon(&top));
        for i in 0..sides {
            let j = (i + 1) % sides;
            faces.push(Face::quad(i, j, sides + j, sides + i));
        }
        Self { vertices, faces }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when there is nothing to render or snap to
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Unique undirected edges in first-seen order
    pub fn unique_edges(&self) -> Vec<(usize, usize)> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for face in &self.faces {
            for (a, b) in face.edges() {
                let e = (a.min(b), a.max(b));
                if seen.insert(e) {
                    edges.push(e);
                }
            }
        }
        edges
    }

    /// Median center of a face (mean of its corners)
    pub fn face_center(&self, face_idx: usize) -> Option<Vec3> {
        let face = self.faces.get(face_idx)?;
        let mut sum = Vec3::ZERO;
        let mut count = 0;
        for &vi in &face.vertices {
            if let Some(v) = self.vertices.get(vi) {
                sum += *v;
                count += 1;
            }
        }

        if count > 0 {
            Some(sum / count as f32)
        } else {
            None
        }
    }

    /// Copy with every vertex moved through `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            vertices: self.vertices.iter().map(|v| mat4_transform_point(matrix, *v)).collect(),
            faces: self.faces.clone(),
        }
    }

    /// Drop faces that reference missing vertices or have fewer than 3 corners
    pub fn sanitized(mut self) -> Self {
        let n = self.vertices.len();
        self.faces.retain(|f| f.vertices.len() >= 3 && f.vertices.iter().all(|&i| i < n));
        self
    }
}
