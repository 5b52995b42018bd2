//! Bounding volume hierarchy over a mesh snapshot
//!
//! Binary tree of triangle bounds, split at the median centroid along the
//! longest axis. Nodes live in a flat arena and refer to triangles by index;
//! triangles refer to mesh vertices by index, so the tree never borrows the
//! mesh it was built from. Ray casts take that mesh back as a parameter.

use crate::host::MeshTopology;
use crate::view::{Aabb, Vec3, ray_triangle_intersect};

/// Triangles per leaf before splitting
const LEAF_SIZE: usize = 4;

#[derive(Clone, Debug)]
struct Triangle {
    corners: [usize; 3],
    /// Polygon this triangle was fanned from
    face: usize,
    bounds: Aabb,
}

#[derive(Clone, Debug)]
enum BvhNode {
    Leaf { bounds: Aabb, start: usize, count: usize },
    Internal { bounds: Aabb, left: usize, right: usize },
}

impl BvhNode {
    fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

/// Closest ray hit against the hierarchy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhHit {
    pub location: Vec3,
    /// Index of the polygon face that was hit
    pub face_index: usize,
    /// Distance along the normalized ray direction
    pub distance: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    triangles: Vec<Triangle>,
}

impl Bvh {
    /// Build over the fan triangulation of every face of `mesh`
    pub fn build(mesh: &MeshTopology) -> Self {
        let mut triangles = Vec::new();
        for (face_idx, face) in mesh.faces.iter().enumerate() {
            for corners in face.triangulate() {
                let points = corners.iter().filter_map(|&i| mesh.vertices.get(i).copied());
                let bounds = match Aabb::from_points(points) {
                    Some(b) if corners.iter().all(|&i| i < mesh.vertices.len()) => b,
                    _ => continue,
                };
                triangles.push(Triangle { corners, face: face_idx, bounds });
            }
        }

        let mut bvh = Self { nodes: Vec::with_capacity(triangles.len() * 2), triangles };
        if !bvh.triangles.is_empty() {
            let count = bvh.triangles.len();
            bvh.build_recursive(0, count);
        }
        bvh
    }

    /// Build the subtree for `triangles[start..start + count]`, returns its node index
    fn build_recursive(&mut self, start: usize, count: usize) -> usize {
        let slice = &mut self.triangles[start..start + count];
        let bounds = slice[1..].iter().fold(slice[0].bounds, |acc, t| acc.union(&t.bounds));

        if count <= LEAF_SIZE {
            self.nodes.push(BvhNode::Leaf { bounds, start, count });
            return self.nodes.len() - 1;
        }

        // Find the longest axis and split there
        let size = bounds.size();
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };

        slice.sort_by(|a, b| {
            let va = a.bounds.center().axis(axis);
            let vb = b.bounds.center().axis(axis);
            va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
        });

        // Reserve the slot so children land after their parent
        let index = self.nodes.len();
        self.nodes.push(BvhNode::Leaf { bounds, start, count: 0 });

        let mid = count / 2;
        let left = self.build_recursive(start, mid);
        let right = self.build_recursive(start + mid, count - mid);
        self.nodes[index] = BvhNode::Internal { bounds, left, right };
        index
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Closest hit within `max_distance` of `origin`.
    ///
    /// `mesh` must be the topology this tree was built from.
    pub fn ray_cast(
        &self,
        mesh: &MeshTopology,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<BvhHit> {
        if self.nodes.is_empty() {
            return None;
        }
        let dir = direction.normalize();
        let mut closest: Option<(f32, usize)> = None;
        let mut stack = vec![0usize];

        while let Some(node_idx) = stack.pop() {
            let Some(node) = self.nodes.get(node_idx) else { continue };

            // Early exit if ray doesn't hit this node's bounds
            let Some(t_entry) = node.bounds().ray_entry(origin, dir) else { continue };
            let limit = closest.map_or(max_distance, |(t, _)| t);
            if t_entry > limit {
                continue;
            }

            match *node {
                BvhNode::Leaf { start, count, .. } => {
                    for tri in &self.triangles[start..start + count] {
                        let [a, b, c] = tri.corners.map(|i| mesh.vertices[i]);
                        if let Some(t) = ray_triangle_intersect(origin, dir, a, b, c) {
                            let limit = closest.map_or(max_distance, |(ct, _)| ct);
                            if t <= limit && closest.map_or(true, |(ct, _)| t < ct) {
                                closest = Some((t, tri.face));
                            }
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        closest.map(|(t, face_index)| BvhHit {
            location: origin + dir * t,
            face_index,
            distance: t,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mesh() {
        let bvh = Bvh::build(&MeshTopology::new());
        assert!(bvh.is_empty());
        assert!(bvh.ray_cast(&MeshTopology::new(), Vec3::ZERO, Vec3::X, 10.0).is_none());
    }

    #[test]
    fn test_cube_front_face_hit() {
        let cube = MeshTopology::cube(2.0);
        let bvh = Bvh::build(&cube);
        assert_eq!(bvh.triangle_count(), 12);

        let hit = bvh.ray_cast(&cube, Vec3::new(0.2, 0.3, 5.0), -Vec3::Z, 100.0).unwrap();
        assert_eq!(hit.face_index, 1);
        assert!((hit.distance - 4.0).abs() < 1e-4);
        assert!(hit.location.distance(Vec3::new(0.2, 0.3, 1.0)) < 1e-4);
    }

    #[test]
    fn test_max_distance_limits_hits() {
        let cube = MeshTopology::cube(2.0);
        let bvh = Bvh::build(&cube);
        assert!(bvh.ray_cast(&cube, Vec3::new(0.0, 0.0, 5.0), -Vec3::Z, 3.9).is_none());
        assert!(bvh.ray_cast(&cube, Vec3::new(0.0, 0.0, 5.0), -Vec3::Z, 4.1).is_some());
    }

    #[test]
    fn test_matches_brute_force_on_prism() {
        let mesh = MeshTopology::prism(32, 1.0, 3.0);
        let bvh = Bvh::build(&mesh);
        for i in 0..16 {
            let y = 0.1 + i as f32 * 0.18;
            let angle = i as f32 * 0.4;
            let origin = Vec3::new(angle.cos() * 4.0, y, angle.sin() * 4.0);
            let dir = Vec3::new(0.0, y, 0.0) - origin;

            let mut brute: Option<(f32, usize)> = None;
            for (fi, face) in mesh.faces.iter().enumerate() {
                for [a, b, c] in face.triangulate() {
                    let hit = ray_triangle_intersect(
                        origin, dir.normalize(), mesh.vertices[a], mesh.vertices[b], mesh.vertices[c],
                    );
                    if let Some(t) = hit {
                        if brute.map_or(true, |(bt, _)| t < bt) {
                            brute = Some((t, fi));
                        }
                    }
                }
            }

            let hit = bvh.ray_cast(&mesh, origin, dir, 100.0).unwrap();
            let (bt, bf) = brute.unwrap();
            assert!((hit.distance - bt).abs() < 1e-4);
            assert_eq!(hit.face_index, bf);
        }
    }
}
