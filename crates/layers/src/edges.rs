//! Feature-edge extraction for outlines, matching three.js `EdgesGeometry`.

use std::collections::HashMap;

use foundation::math::Vec3;
use scene::components::{BufferGeometry, LineGeometry};

pub const DEFAULT_THRESHOLD_DEG: f64 = 1.0;

/// Vertices are welded on a 1e-4 grid before edges are matched.
const PRECISION: f64 = 1e4;

type VertexKey = [i64; 3];

struct HalfEdge {
    start: Vec3,
    end: Vec3,
    normal: Vec3,
    open: bool,
}

/// Emits every edge whose two faces meet at more than `threshold_deg`, plus
/// every boundary edge that only one triangle uses.
pub fn edges(geometry: &BufferGeometry, threshold_deg: f64) -> LineGeometry {
    let threshold_dot = threshold_deg.to_radians().cos();
    let mut lines = LineGeometry::default();
    let mut pending: Vec<HalfEdge> = Vec::new();
    let mut index: HashMap<(VertexKey, VertexKey), usize> = HashMap::new();

    for tri in geometry.triangles() {
        let keys = tri.map(vertex_key);
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[2] == keys[0] {
            continue;
        }
        let normal = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize();

        for j in 0..3 {
            let next = (j + 1) % 3;
            let (k0, k1) = (keys[j], keys[next]);
            if let Some(&slot) = index.get(&(k1, k0))
                && pending[slot].open
            {
                if normal.dot(pending[slot].normal) <= threshold_dot {
                    lines.push_segment(tri[j], tri[next]);
                }
                pending[slot].open = false;
            } else if !index.contains_key(&(k0, k1)) {
                index.insert((k0, k1), pending.len());
                pending.push(HalfEdge {
                    start: tri[j],
                    end: tri[next],
                    normal,
                    open: true,
                });
            }
        }
    }

    for edge in pending.iter().filter(|e| e.open) {
        lines.push_segment(edge.start, edge.end);
    }
    lines
}

fn vertex_key(v: Vec3) -> VertexKey {
    [
        (v.x * PRECISION).round() as i64,
        (v.y * PRECISION).round() as i64,
        (v.z * PRECISION).round() as i64,
    ]
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_THRESHOLD_DEG, edges};
    use crate::extrude::extrude_ring;
    use formats::ExtrudeOptions;
    use foundation::math::{Vec2, Vec3};
    use scene::components::BufferGeometry;

    #[test]
    fn coplanar_pair_keeps_only_the_border() {
        let mut g = BufferGeometry::new();
        let (a, b, c, d) = (
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        g.push_triangle(a, b, c);
        g.push_triangle(a, c, d);
        let lines = edges(&g, DEFAULT_THRESHOLD_DEG);
        // The shared diagonal is dropped.
        assert_eq!(lines.segment_count(), 4);
    }

    #[test]
    fn folded_pair_keeps_the_crease() {
        let mut g = BufferGeometry::new();
        let (a, b) = (Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        g.push_triangle(a, b, Vec3::new(0.5, 1.0, 0.0));
        g.push_triangle(b, a, Vec3::new(0.5, 0.0, 1.0));
        assert_eq!(edges(&g, DEFAULT_THRESHOLD_DEG).segment_count(), 5);
    }

    #[test]
    fn degenerate_triangles_are_ignored() {
        let mut g = BufferGeometry::new();
        let p = Vec3::new(1.0, 1.0, 1.0);
        g.push_triangle(p, p, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(edges(&g, DEFAULT_THRESHOLD_DEG).segment_count(), 0);
    }

    #[test]
    fn extruded_square_outlines_as_a_box() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let opts = ExtrudeOptions {
            depth: 1.0,
            bevel_enabled: false,
            ..ExtrudeOptions::default()
        };
        let solid = extrude_ring(&square, &opts).expect("extrude");
        // 4 bottom + 4 top + 4 vertical.
        assert_eq!(edges(&solid, DEFAULT_THRESHOLD_DEG).segment_count(), 12);
    }
}
