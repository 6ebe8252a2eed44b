//! Planar polygon helpers shared by the board model and the localizer.
//!
//! Polygons are plain vertex loops (`&[Point2<f32>]`), implicitly closed.

use nalgebra::{Point2, Vector2};

/// Below this absolute area a polygon is treated as degenerate.
pub const AREA_EPS: f32 = 1e-6;

#[inline]
fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Shoelace signed area. Positive for counter-clockwise loops in a y-up
/// frame (clockwise on screen, where y grows downwards).
pub fn signed_area(poly: &[Point2<f32>]) -> f32 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        acc += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    (acc * 0.5) as f32
}

#[inline]
pub fn polygon_area(poly: &[Point2<f32>]) -> f32 {
    signed_area(poly).abs()
}

/// Unweighted vertex average.
pub fn mean_point(points: &[Point2<f32>]) -> Option<Point2<f32>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}

/// Area-weighted centroid. Degenerate loops fall back to the vertex average.
pub fn polygon_centroid(poly: &[Point2<f32>]) -> Option<Point2<f32>> {
    if poly.len() < 3 {
        return mean_point(poly);
    }
    let mut a = 0.0f64;
    let mut cx = 0.0f64;
    let mut cy = 0.0f64;
    for i in 0..poly.len() {
        let p = poly[i];
        let q = poly[(i + 1) % poly.len()];
        let f = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
        a += f;
        cx += (p.x as f64 + q.x as f64) * f;
        cy += (p.y as f64 + q.y as f64) * f;
    }
    a *= 0.5;
    if a.abs() < AREA_EPS as f64 {
        return mean_point(poly);
    }
    Some(Point2::new(
        (cx / (6.0 * a)) as f32,
        (cy / (6.0 * a)) as f32,
    ))
}

/// Length of the closed loop.
pub fn perimeter(poly: &[Point2<f32>]) -> f32 {
    if poly.len() < 2 {
        return 0.0;
    }
    (0..poly.len())
        .map(|i| (poly[(i + 1) % poly.len()] - poly[i]).norm())
        .sum()
}

/// One Sutherland–Hodgman step: keep the part of `poly` on one side of the
/// line `normal · p = offset`.
///
/// With `keep_greater` the kept side is `normal · p >= offset`, otherwise
/// `normal · p <= offset`. Crossing edges contribute their exact
/// intersection point.
pub fn clip_half_plane(
    poly: &[Point2<f32>],
    normal: Vector2<f32>,
    offset: f32,
    keep_greater: bool,
) -> Vec<Point2<f32>> {
    let mut out = Vec::with_capacity(poly.len() + 2);
    if poly.is_empty() {
        return out;
    }
    let side = |p: &Point2<f32>| normal.dot(&p.coords);
    let inside = |d: f32| if keep_greater { d >= offset } else { d <= offset };

    for i in 0..poly.len() {
        let cur = poly[i];
        let prev = poly[(i + poly.len() - 1) % poly.len()];
        let (dc, dp) = (side(&cur), side(&prev));
        let (cur_in, prev_in) = (inside(dc), inside(dp));

        if cur_in != prev_in {
            let denom = dc - dp;
            if denom.abs() > 1e-6 {
                let t = (offset - dp) / denom;
                out.push(prev + (cur - prev) * t);
            }
        }
        if cur_in {
            out.push(cur);
        }
    }
    out
}

fn dist_to_segment(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-12 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Ramer–Douglas–Peucker on an open chain; both endpoints are kept.
fn simplify_chain(points: &[Point2<f32>], epsilon: f32) -> Vec<Point2<f32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let (mut best, mut best_d) = (lo, -1.0f32);
        for (k, &p) in points.iter().enumerate().take(hi).skip(lo + 1) {
            let d = dist_to_segment(p, points[lo], points[hi]);
            if d > best_d {
                best = k;
                best_d = d;
            }
        }
        if best_d > epsilon {
            keep[best] = true;
            stack.push((lo, best));
            stack.push((best, hi));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Simplify a closed contour to a polygon whose edges stay within
/// `epsilon` of the original points.
///
/// The loop is split at its first point and the point farthest from it;
/// vertices left almost on the line through their neighbours (for example
/// an anchor that fell mid-edge) are then dropped.
pub fn simplify_closed(contour: &[Point2<f32>], epsilon: f32) -> Vec<Point2<f32>> {
    let n = contour.len();
    if n < 4 {
        return contour.to_vec();
    }
    let origin = contour[0];
    let far = (1..n)
        .max_by(|&a, &b| {
            (contour[a] - origin)
                .norm_squared()
                .total_cmp(&(contour[b] - origin).norm_squared())
        })
        .unwrap_or(n / 2);

    let first = simplify_chain(&contour[..=far], epsilon);
    let mut second_src: Vec<Point2<f32>> = contour[far..].to_vec();
    second_src.push(origin);
    let second = simplify_chain(&second_src, epsilon);

    let mut poly = first;
    if second.len() > 2 {
        poly.extend_from_slice(&second[1..second.len() - 1]);
    }
    drop_collinear(&mut poly, epsilon);
    poly
}

fn drop_collinear(poly: &mut Vec<Point2<f32>>, epsilon: f32) {
    loop {
        if poly.len() <= 3 {
            return;
        }
        let n = poly.len();
        let victim = (0..n).find(|&i| {
            let prev = poly[(i + n - 1) % n];
            let next = poly[(i + 1) % n];
            dist_to_segment(poly[i], prev, next) <= epsilon
        });
        match victim {
            Some(i) => {
                poly.remove(i);
            }
            None => return,
        }
    }
}

/// True when every turn of the loop has the same orientation. Near-zero
/// turns (collinear vertices) are ignored.
pub fn is_convex(poly: &[Point2<f32>]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let n = poly.len();
    let mut sign = 0i8;
    for i in 0..n {
        let c = cross(poly[i], poly[(i + 1) % n], poly[(i + 2) % n]);
        if c.abs() < 1e-9 {
            continue;
        }
        let s = if c > 0.0 { 1 } else { -1 };
        if sign == 0 {
            sign = s;
        } else if s != sign {
            return false;
        }
    }
    sign != 0
}

/// Andrew's monotone chain. Returns the hull counter-clockwise in a y-up
/// frame without repeating the first vertex.
pub fn convex_hull(points: &[Point2<f32>]) -> Vec<Point2<f32>> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point2<f32>> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Even-odd point-in-polygon test.
pub fn contains_point(poly: &[Point2<f32>], p: Point2<f32>) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Sort points by polar angle around their mean, increasing `atan2(dy, dx)`.
pub fn sort_by_polar_angle(points: &[Point2<f32>]) -> Vec<Point2<f32>> {
    let Some(c) = mean_point(points) else {
        return Vec::new();
    };
    let mut out = points.to_vec();
    out.sort_by(|a, b| {
        let ta = (a.y - c.y).atan2(a.x - c.x);
        let tb = (b.y - c.y).atan2(b.x - c.x);
        ta.total_cmp(&tb)
    });
    out
}

/// Regular hexagon vertices, the first one at `start_angle` (radians).
pub fn regular_hexagon(center: Point2<f32>, radius: f32, start_angle: f32) -> [Point2<f32>; 6] {
    std::array::from_fn(|k| {
        let a = start_angle + k as f32 * std::f32::consts::FRAC_PI_3;
        Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(s: f32) -> Vec<Point2<f32>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ]
    }

    #[test]
    fn square_area_and_centroid() {
        let sq = square(4.0);
        assert_relative_eq!(signed_area(&sq), 16.0, epsilon = 1e-5);
        let mut rev = sq.clone();
        rev.reverse();
        assert_relative_eq!(signed_area(&rev), -16.0, epsilon = 1e-5);
        let c = polygon_centroid(&sq).unwrap();
        assert_relative_eq!(c.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(c.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(perimeter(&sq), 16.0, epsilon = 1e-5);
    }

    #[test]
    fn degenerate_polygon_centroid_is_vertex_mean() {
        let line = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
        ];
        let c = polygon_centroid(&line).unwrap();
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(c.y, 1.0, epsilon = 1e-6);
        assert!(polygon_centroid(&[]).is_none());
    }

    #[test]
    fn centroid_lies_inside_convex_polygons() {
        // Irregular convex loops: a hexagon with uneven radii, a skinny
        // triangle and a trapezoid.
        let hex: Vec<Point2<f32>> = (0..6)
            .map(|k| {
                let a = k as f32 * std::f32::consts::FRAC_PI_3 + 0.2;
                let r = if k % 2 == 0 { 10.0 } else { 7.0 };
                Point2::new(3.0 + r * a.cos(), -2.0 + r * a.sin())
            })
            .collect();
        let tri = vec![
            Point2::new(0.0, 0.0),
            Point2::new(50.0, 1.0),
            Point2::new(0.0, 2.0),
        ];
        let trap = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(7.0, 3.0),
            Point2::new(2.0, 3.0),
        ];
        for poly in [hex, tri, trap] {
            let hull = convex_hull(&poly);
            let c = polygon_centroid(&poly).unwrap();
            assert!(contains_point(&hull, c), "centroid {c:?} outside hull");
        }
    }

    #[test]
    fn clipping_keeps_requested_side() {
        let sq = square(4.0);
        let n = Vector2::new(1.0, 0.0);
        let left = clip_half_plane(&sq, n, 1.0, false);
        let right = clip_half_plane(&sq, n, 1.0, true);
        assert_relative_eq!(polygon_area(&left), 4.0, epsilon = 1e-4);
        assert_relative_eq!(polygon_area(&right), 12.0, epsilon = 1e-4);
        assert!(left.iter().all(|p| p.x <= 1.0 + 1e-5));

        let gone = clip_half_plane(&sq, n, 10.0, true);
        assert!(gone.len() < 3);
    }

    #[test]
    fn simplify_recovers_hexagon_from_dense_outline() {
        let hex = regular_hexagon(Point2::new(100.0, 100.0), 80.0, 0.35);
        let mut dense = Vec::new();
        for k in 0..6 {
            let a = hex[k];
            let b = hex[(k + 1) % 6];
            for s in 0..40 {
                let t = s as f32 / 40.0;
                // Pixel-level wobble.
                let wobble = if s % 3 == 0 { 0.6 } else { -0.4 };
                let p = a + (b - a) * t;
                dense.push(Point2::new(p.x.round() + wobble, p.y.round()));
            }
        }
        // Start mid-edge so the anchor is not a corner.
        dense.rotate_left(17);

        let eps = 0.02 * perimeter(&dense);
        let poly = simplify_closed(&dense, eps);
        assert_eq!(poly.len(), 6, "got {poly:?}");
        assert!(is_convex(&poly));
        for v in &poly {
            let nearest = hex
                .iter()
                .map(|h| (h - v).norm())
                .fold(f32::INFINITY, f32::min);
            assert!(nearest < 4.0, "vertex {v:?} far from any corner");
        }
    }

    #[test]
    fn convexity_and_hull() {
        let sq = square(2.0);
        assert!(is_convex(&sq));
        let dart = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 4.0),
        ];
        assert!(!is_convex(&dart));
        let hull = convex_hull(&dart);
        assert_eq!(hull.len(), 3);
        assert_relative_eq!(polygon_area(&hull), 8.0, epsilon = 1e-5);
    }

    #[test]
    fn polar_sort_orders_by_angle() {
        let pts = vec![
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, -1.0),
            Point2::new(-1.0, 0.0),
        ];
        let sorted = sort_by_polar_angle(&pts);
        assert_eq!(sorted[0], Point2::new(0.0, -1.0));
        assert_eq!(sorted[1], Point2::new(1.0, 0.0));
        assert_eq!(sorted[2], Point2::new(0.0, 1.0));
    }
}
