//! 2D KD-tree over candidate screen positions
//!
//! Balanced by median splits at build time. There is no insert or remove;
//! callers rebuild when the point set changes.

use crate::view::Vec2;

#[derive(Clone, Debug)]
struct KdNode {
    point: Vec2,
    /// Caller-supplied id of the point
    item: usize,
    /// Split dimension (0 = x, 1 = y)
    axis: usize,
    /// Values <= split
    left: Option<usize>,
    /// Values >= split
    right: Option<usize>,
}

/// A point within range of a query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KdHit {
    pub item: usize,
    pub point: Vec2,
    pub distance: f32,
}

#[derive(Clone, Debug, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

fn coord(p: Vec2, axis: usize) -> f32 {
    if axis == 0 { p.x } else { p.y }
}

impl KdTree {
    pub fn build(mut points: Vec<(Vec2, usize)>) -> Self {
        let mut nodes = Vec::with_capacity(points.len());
        let root = Self::build_recursive(&mut nodes, &mut points, 0);
        Self { nodes, root }
    }

    fn build_recursive(nodes: &mut Vec<KdNode>, entries: &mut [(Vec2, usize)], depth: usize) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }
        let axis = depth % 2;

        // Sort by the current axis
        entries.sort_by(|a, b| {
            coord(a.0, axis).partial_cmp(&coord(b.0, axis)).unwrap_or(std::cmp::Ordering::Equal)
        });

        let median = entries.len() / 2;
        let (point, item) = entries[median];
        let index = nodes.len();
        nodes.push(KdNode { point, item, axis, left: None, right: None });

        let (left_slice, rest) = entries.split_at_mut(median);
        let left = Self::build_recursive(nodes, left_slice, depth + 1);
        let right = Self::build_recursive(nodes, &mut rest[1..], depth + 1);
        nodes[index].left = left;
        nodes[index].right = right;
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every point within `radius` (inclusive) of `center`, in no particular order
    pub fn within_radius(&self, center: Vec2, radius: f32) -> Vec<KdHit> {
        let mut hits = Vec::new();
        let mut stack: Vec<usize> = self.root.into_iter().collect();

        while let Some(idx) = stack.pop() {
            let Some(node) = self.nodes.get(idx) else { continue };
            let distance = node.point.distance(center);
            if distance <= radius {
                hits.push(KdHit { item: node.item, point: node.point, distance });
            }

            let q = coord(center, node.axis);
            let split = coord(node.point, node.axis);
            if let Some(left) = node.left {
                if q - radius <= split {
                    stack.push(left);
                }
            }
            if let Some(right) = node.right {
                if q + radius >= split {
                    stack.push(right);
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.within_radius(Vec2::ZERO, 100.0).is_empty());
    }

    #[test]
    fn test_radius_is_inclusive() {
        let tree = KdTree::build(vec![(Vec2::new(200.0, 0.0), 7), (Vec2::new(200.5, 0.0), 8)]);
        let hits = tree.within_radius(Vec2::ZERO, 200.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item, 7);
        assert_eq!(hits[0].distance, 200.0);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let points: Vec<(Vec2, usize)> = (0..500)
            .map(|i| (Vec2::new(rng.gen_range(0.0..1280.0), rng.gen_range(0.0..720.0)), i))
            .collect();
        let tree = KdTree::build(points.clone());
        assert_eq!(tree.len(), 500);

        for _ in 0..50 {
            let center = Vec2::new(rng.gen_range(-100.0..1380.0), rng.gen_range(-100.0..820.0));
            let radius = rng.gen_range(0.0..300.0);

            let mut expected: Vec<usize> = points
                .iter()
                .filter(|(p, _)| p.distance(center) <= radius)
                .map(|&(_, i)| i)
                .collect();
            let mut got: Vec<usize> = tree.within_radius(center, radius).iter().map(|h| h.item).collect();
            expected.sort_unstable();
            got.sort_unstable();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_duplicate_coordinates() {
        let points = (0..10).map(|i| (Vec2::new(5.0, 5.0), i)).collect();
        let tree = KdTree::build(points);
        assert_eq!(tree.within_radius(Vec2::new(5.0, 5.0), 0.0).len(), 10);
    }
}
