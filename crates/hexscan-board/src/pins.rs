use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Nominal centre distance between neighbouring pins on the reference board.
pub const REFERENCE_SPACING_MM: f32 = 43.3;
/// Accepted deviation from [`REFERENCE_SPACING_MM`] when building adjacency.
pub const REFERENCE_TOLERANCE_MM: f32 = 1.2;

/// Horizontal distance between pin columns (`spacing * sin 60°`, rounded).
const COLUMN_STEP_MM: f32 = 37.5;

/// One physical peg in board-plane millimetres, origin at the board centre.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinPosition {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

impl PinPosition {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }

    #[inline]
    pub fn point(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn distance(&self, other: &PinPosition) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The 37-pin reference grid: seven columns of 4, 5, 6, 7, 6, 5, 4 pins,
/// numbered column by column from the left, top to bottom.
pub fn reference_pin_grid() -> Vec<PinPosition> {
    let mut pins = Vec::with_capacity(37);
    let mut id = 1;
    for col in -3i32..=3 {
        let count = 7 - col.unsigned_abs() as usize;
        let x = col as f32 * COLUMN_STEP_MM;
        let y0 = -((count - 1) as f32) * 0.5 * REFERENCE_SPACING_MM;
        for k in 0..count {
            pins.push(PinPosition::new(
                id,
                x,
                y0 + k as f32 * REFERENCE_SPACING_MM,
            ));
            id += 1;
        }
    }
    pins
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reference_grid_has_37_pins_in_seven_columns() {
        let pins = reference_pin_grid();
        assert_eq!(pins.len(), 37);
        assert_eq!(pins[0].id, 1);
        assert_abs_diff_eq!(pins[0].x, -112.5);
        assert_abs_diff_eq!(pins[0].y, -64.95, epsilon = 1e-3);
        assert_eq!(pins[36].id, 37);

        let centre = pins.iter().find(|p| p.id == 19).unwrap();
        assert_abs_diff_eq!(centre.x, 0.0);
        assert_abs_diff_eq!(centre.y, 0.0, epsilon = 1e-4);

        let top = pins.iter().find(|p| p.id == 16).unwrap();
        assert_abs_diff_eq!(top.y, -129.9, epsilon = 1e-3);
    }
}
