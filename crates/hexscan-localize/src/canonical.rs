//! The canonical hex frame every detected board is warped into.

use hexscan_board::BoardLayout;
use hexscan_core::{regular_hexagon, Point2};
use serde::{Deserialize, Serialize};

use crate::outline::canonical_order;

/// Square raster of `size × size` pixels holding the board outline as a
/// regular hexagon that touches the raster along its pointy axis.
///
/// Board-plane millimetres map linearly into the raster: the outline centre
/// lands on the raster centre and `outline_radius_mm` on the hexagon
/// circumradius. Pixel centres sit on integer coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFrame {
    pub size: usize,
    pub board_center_mm: Point2<f32>,
    pub outline_radius_mm: f32,
    /// Angle of the first outline vertex in the board frame (radians).
    pub vertex_angle: f32,
}

impl CanonicalFrame {
    pub fn new(layout: &BoardLayout, size: usize) -> Self {
        let outline = layout.outline_hexagon();
        Self {
            size,
            board_center_mm: outline.center,
            outline_radius_mm: outline.radius,
            vertex_angle: outline.vertex_angle,
        }
    }

    #[inline]
    pub fn center_px(&self) -> Point2<f32> {
        let c = (self.size.saturating_sub(1)) as f32 * 0.5;
        Point2::new(c, c)
    }

    #[inline]
    pub fn radius_px(&self) -> f32 {
        (self.size.saturating_sub(1)) as f32 * 0.5
    }

    #[inline]
    pub fn px_per_mm(&self) -> f32 {
        self.radius_px() / self.outline_radius_mm
    }

    #[inline]
    pub fn board_to_pixel(&self, mm: Point2<f32>) -> Point2<f32> {
        self.center_px() + (mm - self.board_center_mm) * self.px_per_mm()
    }

    #[inline]
    pub fn pixel_to_board(&self, px: Point2<f32>) -> Point2<f32> {
        self.board_center_mm + (px - self.center_px()) / self.px_per_mm()
    }

    /// Outline vertices in raster pixels, in canonical vertex order.
    pub fn outline_px(&self) -> [Point2<f32>; 6] {
        let hex = regular_hexagon(self.center_px(), self.radius_px(), self.vertex_angle);
        canonical_order(&hex, 1.0)
    }

    /// Axis-aligned extent of the outline: `[min_x, min_y, max_x, max_y]`.
    pub fn outline_bounds_px(&self) -> [f32; 4] {
        self.outline_px().iter().fold(
            [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
            |b, p| [b[0].min(p.x), b[1].min(p.y), b[2].max(p.x), b[3].max(p.y)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use hexscan_board::BoardSpec;

    #[test]
    fn board_centre_maps_to_raster_centre() {
        let layout = BoardLayout::new(BoardSpec::default()).unwrap();
        let cf = CanonicalFrame::new(&layout, 401);
        let c = cf.board_to_pixel(Point2::new(0.0, 0.0));
        assert_abs_diff_eq!(c.x, 200.0, epsilon = 1e-2);
        assert_abs_diff_eq!(c.y, 200.0, epsilon = 1e-2);

        let p = Point2::new(37.5, -64.95);
        let back = cf.pixel_to_board(cf.board_to_pixel(p));
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-3);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-3);
    }

    #[test]
    fn outline_starts_at_the_top_vertex() {
        let layout = BoardLayout::new(BoardSpec::default()).unwrap();
        let cf = CanonicalFrame::new(&layout, 401);
        let hex = cf.outline_px();
        assert!(hex.iter().all(|v| v.y >= hex[0].y - 1e-3));
        let b = cf.outline_bounds_px();
        assert_abs_diff_eq!(b[1], 0.0, epsilon = 0.05);
        assert_abs_diff_eq!(b[3], 400.0, epsilon = 0.05);
    }
}
