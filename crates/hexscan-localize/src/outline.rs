//! Board outline extraction: contour → six ordered vertices.

use hexscan_core::{
    convex_hull, is_convex, perimeter, signed_area, simplify_closed, sort_by_polar_angle, Point2,
};

use crate::params::SimplifySweep;

/// Order six vertices canonically.
///
/// Vertices are sorted by polar angle around their mean, rotated so the
/// topmost one (smallest `y`, then smallest `x`) comes first, and reversed
/// behind the first vertex if the loop's winding sign differs from
/// `winding`.
pub fn canonical_order(points: &[Point2<f32>; 6], winding: f32) -> [Point2<f32>; 6] {
    let mut ring = sort_by_polar_angle(points);
    let start = ring
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    ring.rotate_left(start);
    if signed_area(&ring).signum() != winding.signum() {
        ring[1..].reverse();
    }
    let mut out = [Point2::origin(); 6];
    out.copy_from_slice(&ring[..6]);
    out
}

/// Sweep simplification tolerances and return the first six-vertex polygon.
pub fn hexagon_from_contour(
    contour: &[Point2<f32>],
    sweep: &SimplifySweep,
    require_convex: bool,
) -> Option<[Point2<f32>; 6]> {
    let length = perimeter(contour);
    if length <= 0.0 {
        return None;
    }
    for frac in sweep.fractions() {
        let poly = simplify_closed(contour, frac * length);
        if poly.len() == 6 && (!require_convex || is_convex_loop(&poly)) {
            log::trace!("outline simplified to 6 vertices at {:.3} of perimeter", frac);
            let mut hex = [Point2::origin(); 6];
            hex.copy_from_slice(&poly);
            return Some(hex);
        }
    }
    None
}

/// Convex and simple: every vertex lies on the hull and the loop winds once.
fn is_convex_loop(poly: &[Point2<f32>]) -> bool {
    if !is_convex(poly) {
        return false;
    }
    let hull = convex_hull(poly);
    let hull_area = signed_area(&hull).abs();
    hull.len() == poly.len() && (signed_area(poly).abs() - hull_area).abs() <= 1e-3 * hull_area
}
