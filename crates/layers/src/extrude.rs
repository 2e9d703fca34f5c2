//! Extrusion of a closed 2D ring into a solid with optional bevelled rims.
//!
//! Layout follows three.js `ExtrudeGeometry`: layers of the ring are stacked
//! along +z (front bevel, body, back bevel), the caps are triangulated once
//! and reused on the first and last layer, and side quads join consecutive
//! layers. Caps form material group 0, sides group 1.

use std::f64::consts::FRAC_PI_2;

use earcutr::earcut;
use formats::ExtrudeOptions;
use foundation::math::{Vec2, Vec3};
use scene::components::BufferGeometry;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtrudeError {
    #[error("ring has {0} distinct points, at least 3 are required")]
    TooFewPoints(usize),
    #[error("ring encloses no area")]
    ZeroArea,
    #[error("ring contains non-finite coordinates")]
    NonFinite,
    #[error("cap triangulation failed")]
    Triangulation,
}

pub const CAP_GROUP: usize = 0;
pub const SIDE_GROUP: usize = 1;

pub fn extrude_ring(points: &[Vec2], opts: &ExtrudeOptions) -> Result<BufferGeometry, ExtrudeError> {
    if points.iter().any(|p| !p.is_finite()) {
        return Err(ExtrudeError::NonFinite);
    }
    let mut contour = dedup_ring(points);
    if contour.len() < 3 {
        return Err(ExtrudeError::TooFewPoints(contour.len()));
    }
    let area = signed_area(&contour);
    if area.abs() <= f64::EPSILON {
        return Err(ExtrudeError::ZeroArea);
    }
    // Clockwise contours make the bevel vectors point outwards.
    if area > 0.0 {
        contour.reverse();
    }
    let faces = triangulate(&contour)?;

    let (thickness, size, offset, segments) = if opts.bevel_enabled {
        (
            opts.bevel_thickness,
            opts.effective_bevel_size(),
            opts.bevel_offset,
            opts.bevel_segments,
        )
    } else {
        (0.0, 0.0, 0.0, 0)
    };
    let steps = opts.steps.max(1);

    let n = contour.len();
    let movements: Vec<Vec2> = (0..n)
        .map(|i| bevel_vec(contour[i], contour[(i + n - 1) % n], contour[(i + 1) % n]))
        .collect();
    let ring_at = |z: f64, bs: f64| -> Vec<Vec3> {
        contour
            .iter()
            .zip(&movements)
            .map(|(p, m)| Vec3::new(p.x + m.x * bs, p.y + m.y * bs, z))
            .collect()
    };
    let bevel_profile = |b: u32| {
        let t = f64::from(b) / f64::from(segments) * FRAC_PI_2;
        (thickness * t.cos(), size * t.sin() + offset)
    };

    let mut layers: Vec<Vec<Vec3>> = Vec::with_capacity((steps + 2 * segments + 1) as usize);
    for b in 0..segments {
        let (z, bs) = bevel_profile(b);
        layers.push(ring_at(-z, bs));
    }
    for s in 0..=steps {
        let z = opts.depth / f64::from(steps) * f64::from(s);
        layers.push(ring_at(z, size + offset));
    }
    for b in (0..segments).rev() {
        let (z, bs) = bevel_profile(b);
        layers.push(ring_at(opts.depth + z, bs));
    }

    let mut geometry = BufferGeometry::new();

    let (bottom, top) = (&layers[0], &layers[layers.len() - 1]);
    for [a, b, c] in &faces {
        geometry.push_triangle(bottom[*c], bottom[*b], bottom[*a]);
    }
    for [a, b, c] in &faces {
        geometry.push_triangle(top[*a], top[*b], top[*c]);
    }
    geometry.add_group(0, geometry.vertex_count(), CAP_GROUP);

    let side_start = geometry.vertex_count();
    for j in (0..n).rev() {
        let k = if j == 0 { n - 1 } else { j - 1 };
        for pair in layers.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            let (a, b, c, d) = (lower[j], lower[k], upper[k], upper[j]);
            geometry.push_triangle(a, b, d);
            geometry.push_triangle(b, c, d);
        }
    }
    geometry.add_group(side_start, geometry.vertex_count() - side_start, SIDE_GROUP);

    geometry.compute_bounding_box();
    geometry.compute_bounding_sphere();
    Ok(geometry)
}

/// Drops consecutive duplicates and the closing point when it repeats the first.
fn dedup_ring(points: &[Vec2]) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() != Some(p) {
            out.push(*p);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// Positive for counter-clockwise rings.
fn signed_area(ring: &[Vec2]) -> f64 {
    let n = ring.len();
    let twice: f64 = (0..n)
        .map(|i| ring[(i + n - 1) % n].cross(ring[i]))
        .sum();
    twice * 0.5
}

/// Cap triangles as counter-clockwise index triples (normal +z).
fn triangulate(contour: &[Vec2]) -> Result<Vec<[usize; 3]>, ExtrudeError> {
    let coords: Vec<f64> = contour.iter().flat_map(|p| [p.x, p.y]).collect();
    let indices = earcut(&coords, &[], 2).map_err(|_| ExtrudeError::Triangulation)?;
    if indices.is_empty() {
        return Err(ExtrudeError::Triangulation);
    }
    Ok(indices
        .chunks_exact(3)
        .map(|t| {
            let (a, b, c) = (t[0], t[1], t[2]);
            if (contour[b] - contour[a]).cross(contour[c] - contour[a]) >= 0.0 {
                [a, b, c]
            } else {
                [a, c, b]
            }
        })
        .collect())
}

/// Offset direction for `pt` such that both adjacent edges move outwards by
/// one unit; sharp corners are shrunk so the vector stays within sqrt(2).
fn bevel_vec(pt: Vec2, prev: Vec2, next: Vec2) -> Vec2 {
    let v_prev = pt - prev;
    let v_next = next - pt;
    let v_prev_lensq = v_prev.dot(v_prev);
    let collinear = v_prev.cross(v_next);

    let (trans, shrink_by) = if collinear.abs() > f64::EPSILON {
        let v_prev_len = v_prev_lensq.sqrt();
        let v_next_len = v_next.length();
        let prev_shift = Vec2::new(prev.x - v_prev.y / v_prev_len, prev.y + v_prev.x / v_prev_len);
        let next_shift = Vec2::new(next.x - v_next.y / v_next_len, next.y + v_next.x / v_next_len);
        let sf = (next_shift - prev_shift).cross(v_next) / collinear;
        let trans = prev_shift + v_prev.scale(sf) - pt;
        let lensq = trans.dot(trans);
        if lensq <= 2.0 {
            return trans;
        }
        (trans, (lensq / 2.0).sqrt())
    } else {
        // Straight line or a full U-turn.
        let same_direction = if v_prev.x > f64::EPSILON {
            v_next.x > f64::EPSILON
        } else if v_prev.x < -f64::EPSILON {
            v_next.x < -f64::EPSILON
        } else {
            v_prev.y.signum() == v_next.y.signum()
        };
        if same_direction {
            (Vec2::new(-v_prev.y, v_prev.x), v_prev_lensq.sqrt())
        } else {
            (v_prev, (v_prev_lensq / 2.0).sqrt())
        }
    };
    if shrink_by <= 0.0 {
        return Vec2::default();
    }
    trans.scale(1.0 / shrink_by)
}
