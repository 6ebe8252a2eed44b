use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::graph::{triangle_centers, AdjacencyGraph};
use crate::partition::{hex_partition, HexCell, Hexagon};
use crate::pins::{
    reference_pin_grid, PinPosition, REFERENCE_SPACING_MM, REFERENCE_TOLERANCE_MM,
};

/// How scoring positions are derived from the pin grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SampleStrategy {
    /// Centroid of every 3-clique of adjacent pins.
    #[default]
    TriangleCenters,
    /// Centroids of a hexagon partition spanning the pin grid.
    HexPartition { line_count: usize },
}

/// Static board description, loaded from configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSpec {
    pub pins: Vec<PinPosition>,
    pub nominal_spacing_mm: f32,
    pub tolerance_mm: f32,
    /// Circumradius of the board's outer hexagonal outline, the shape the
    /// localizer looks for. Same orientation as the pin hexagon.
    pub outline_radius_mm: f32,
    /// Footprint of one game piece.
    pub marker_diameter_mm: f32,
    pub sample_strategy: SampleStrategy,
}

impl Default for BoardSpec {
    fn default() -> Self {
        Self {
            pins: reference_pin_grid(),
            nominal_spacing_mm: REFERENCE_SPACING_MM,
            tolerance_mm: REFERENCE_TOLERANCE_MM,
            outline_radius_mm: 150.0,
            marker_diameter_mm: 18.0,
            sample_strategy: SampleStrategy::TriangleCenters,
        }
    }
}

/// Board specification validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("board has no pins")]
    EmptyPinSet,
    #[error("duplicate pin id {0}")]
    DuplicatePinId(u32),
    #[error("nominal_spacing_mm must be > 0")]
    InvalidSpacing,
    #[error("tolerance_mm must be in [0, nominal_spacing_mm)")]
    InvalidTolerance,
    #[error("line_count must be >= 2 (got {line_count})")]
    InvalidLineCount { line_count: usize },
    #[error("outline_radius_mm must enclose the pin grid (pins reach {pin_radius:.1} mm)")]
    InvalidOutlineRadius { pin_radius: f32 },
    #[error("marker_diameter_mm must be > 0")]
    InvalidMarkerDiameter,
    #[error("board layout yields no sample points")]
    NoSamplePoints,
}

/// One scoring position in board-plane millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: f32,
    pub y: f32,
}

impl From<Point2<f32>> for SamplePoint {
    fn from(p: Point2<f32>) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl SamplePoint {
    #[inline]
    pub fn point(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }
}

/// Validated board geometry with its derived adjacency and sample points.
#[derive(Clone, Debug)]
pub struct BoardLayout {
    spec: BoardSpec,
    graph: AdjacencyGraph,
    pin_hexagon: Hexagon,
    sample_points: Vec<SamplePoint>,
    cells: Vec<HexCell>,
}

impl BoardLayout {
    /// Validate `spec` and derive everything the scanner needs from it.
    pub fn new(spec: BoardSpec) -> Result<Self, BoardError> {
        validate(&spec)?;

        let graph = AdjacencyGraph::build(&spec.pins, spec.nominal_spacing_mm, spec.tolerance_mm);
        let pin_hexagon = pin_hexagon(&spec.pins);
        if spec.outline_radius_mm < pin_hexagon.radius {
            return Err(BoardError::InvalidOutlineRadius {
                pin_radius: pin_hexagon.radius,
            });
        }

        let (sample_points, cells) = match spec.sample_strategy {
            SampleStrategy::TriangleCenters => {
                let pts: Vec<SamplePoint> = triangle_centers(&spec.pins, &graph)
                    .into_iter()
                    .map(SamplePoint::from)
                    .collect();
                (pts, Vec::new())
            }
            SampleStrategy::HexPartition { line_count } => {
                let cells = hex_partition(&pin_hexagon, line_count)?;
                let pts: Vec<SamplePoint> =
                    cells.iter().map(|c| SamplePoint::from(c.centroid)).collect();
                (pts, cells)
            }
        };
        if sample_points.is_empty() {
            return Err(BoardError::NoSamplePoints);
        }

        log::debug!(
            "board layout: {} pins, {} edges, {} sample points ({:?})",
            spec.pins.len(),
            graph.edges().len(),
            sample_points.len(),
            spec.sample_strategy
        );

        Ok(Self {
            spec,
            graph,
            pin_hexagon,
            sample_points,
            cells,
        })
    }

    #[inline]
    pub fn spec(&self) -> &BoardSpec {
        &self.spec
    }

    #[inline]
    pub fn pins(&self) -> &[PinPosition] {
        &self.spec.pins
    }

    #[inline]
    pub fn adjacency(&self) -> &AdjacencyGraph {
        &self.graph
    }

    #[inline]
    pub fn sample_points(&self) -> &[SamplePoint] {
        &self.sample_points
    }

    /// Partition cells; empty unless the hex-partition strategy is active.
    #[inline]
    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    /// Smallest regular hexagon through the outermost pins.
    #[inline]
    pub fn pin_hexagon(&self) -> Hexagon {
        self.pin_hexagon
    }

    /// Board outline: the pin hexagon grown to `outline_radius_mm`.
    pub fn outline_hexagon(&self) -> Hexagon {
        Hexagon {
            radius: self.spec.outline_radius_mm,
            ..self.pin_hexagon
        }
    }
}

fn validate(spec: &BoardSpec) -> Result<(), BoardError> {
    if spec.pins.is_empty() {
        return Err(BoardError::EmptyPinSet);
    }
    let mut ids: Vec<u32> = spec.pins.iter().map(|p| p.id).collect();
    ids.sort_unstable();
    if let Some(w) = ids.windows(2).find(|w| w[0] == w[1]) {
        return Err(BoardError::DuplicatePinId(w[0]));
    }
    if !spec.nominal_spacing_mm.is_finite() || spec.nominal_spacing_mm <= 0.0 {
        return Err(BoardError::InvalidSpacing);
    }
    if !spec.tolerance_mm.is_finite()
        || spec.tolerance_mm < 0.0
        || spec.tolerance_mm >= spec.nominal_spacing_mm
    {
        return Err(BoardError::InvalidTolerance);
    }
    if !spec.marker_diameter_mm.is_finite() || spec.marker_diameter_mm <= 0.0 {
        return Err(BoardError::InvalidMarkerDiameter);
    }
    Ok(())
}

fn pin_hexagon(pins: &[PinPosition]) -> Hexagon {
    let n = pins.len().max(1) as f32;
    let cx = pins.iter().map(|p| p.x).sum::<f32>() / n;
    let cy = pins.iter().map(|p| p.y).sum::<f32>() / n;
    let far = pins
        .iter()
        .map(|p| (p.x - cx, p.y - cy))
        .max_by(|a, b| a.0.hypot(a.1).total_cmp(&b.0.hypot(b.1)))
        .unwrap_or((0.0, 1.0));
    Hexagon {
        center: Point2::new(cx, cy),
        radius: far.0.hypot(far.1),
        vertex_angle: far.1.atan2(far.0),
    }
}
