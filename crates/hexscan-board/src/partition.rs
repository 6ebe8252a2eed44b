//! Hexagon partition into cells bounded by three families of parallel lines.

use hexscan_core::{clip_half_plane, polygon_centroid, regular_hexagon, signed_area};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::BoardError;

/// Regular hexagon given by centre, circumradius and the angle of its first
/// vertex (radians).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hexagon {
    pub center: Point2<f32>,
    pub radius: f32,
    pub vertex_angle: f32,
}

impl Hexagon {
    pub fn vertices(&self) -> [Point2<f32>; 6] {
        regular_hexagon(self.center, self.radius, self.vertex_angle)
    }

    #[inline]
    pub fn apothem(&self) -> f32 {
        self.radius * (std::f32::consts::PI / 6.0).cos()
    }

    pub fn area(&self) -> f32 {
        1.5 * 3.0_f32.sqrt() * self.radius * self.radius
    }

    /// Same hexagon with the circumradius enlarged by `margin`.
    pub fn grown(&self, margin: f32) -> Self {
        Self {
            radius: self.radius + margin,
            ..*self
        }
    }
}

/// One partition cell.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HexCell {
    pub polygon: Vec<Point2<f32>>,
    pub centroid: Point2<f32>,
    pub area: f32,
}

/// Split `hex` into cells using `line_count` lines per axis.
///
/// The three axes run parallel to the hexagon's edges. Lines of one axis are
/// evenly spaced from `-apothem` to `+apothem` along the axis normal, so each
/// axis contributes `line_count - 1` bands. Every band triple clips the
/// hexagon; empty or near-zero results are dropped.
pub fn hex_partition(hex: &Hexagon, line_count: usize) -> Result<Vec<HexCell>, BoardError> {
    if line_count < 2 {
        return Err(BoardError::InvalidLineCount { line_count });
    }
    let apothem = hex.apothem();
    let spacing = apothem / ((line_count - 1) as f32 / 2.0);
    let offsets: Vec<f32> = (0..line_count)
        .map(|i| (i as f32 - (line_count - 1) as f32 / 2.0) * spacing)
        .collect();

    let third = std::f32::consts::FRAC_PI_3;
    let normals: [Vector2<f32>; 3] = [0.0, third, -third].map(|da| {
        let a = hex.vertex_angle + da + std::f32::consts::FRAC_PI_2;
        Vector2::new(a.cos(), a.sin())
    });
    // Offsets are relative to the centre; the clipper works in absolute terms.
    let base: [f32; 3] = normals.map(|n| n.dot(&hex.center.coords));

    let min_area = hex.area() * 1e-6;
    let bands = line_count - 1;
    let outline = hex.vertices().to_vec();
    let mut cells = Vec::new();

    for a in 0..bands {
        for b in 0..bands {
            for c in 0..bands {
                let mut poly = outline.clone();
                for (axis, band) in [a, b, c].into_iter().enumerate() {
                    let lo = base[axis] + offsets[band];
                    let hi = base[axis] + offsets[band + 1];
                    poly = clip_half_plane(&poly, normals[axis], lo, true);
                    poly = clip_half_plane(&poly, normals[axis], hi, false);
                    if poly.len() < 3 {
                        break;
                    }
                }
                drop_repeated(&mut poly, hex.radius * 1e-5);
                if poly.len() < 3 {
                    continue;
                }
                let area = signed_area(&poly).abs();
                if area < min_area {
                    continue;
                }
                let Some(centroid) = polygon_centroid(&poly) else {
                    continue;
                };
                cells.push(HexCell {
                    polygon: poly,
                    centroid,
                    area,
                });
            }
        }
    }
    log::debug!(
        "hex partition: line_count={line_count}, {} cells",
        cells.len()
    );
    Ok(cells)
}

// Clipping through a vertex emits it twice.
fn drop_repeated(poly: &mut Vec<Point2<f32>>, tol: f32) {
    poly.dedup_by(|a, b| (*a - *b).norm() <= tol);
    while poly.len() > 1 && (poly[0] - poly[poly.len() - 1]).norm() <= tol {
        poly.pop();
    }
}
