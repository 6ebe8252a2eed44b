//! Static geometry of the hexagonal pegboard.
//!
//! A [`BoardSpec`] lists the physical pins (board-plane millimetres, origin
//! at the board centre). [`BoardLayout::new`] validates it once and derives
//! the adjacency graph and the scoring [`SamplePoint`]s, either as pin
//! triangle centres or as the centroids of a hexagon partition.
//!
//! ```
//! use hexscan_board::{BoardLayout, BoardSpec};
//!
//! let layout = BoardLayout::new(BoardSpec::default()).unwrap();
//! assert_eq!(layout.sample_points().len(), 54);
//! ```

mod graph;
mod layout;
mod partition;
mod pins;

pub use graph::{triangle_centers, AdjacencyEdge, AdjacencyGraph};
pub use layout::{BoardError, BoardLayout, BoardSpec, SampleStrategy, SamplePoint};
pub use partition::{hex_partition, HexCell, Hexagon};
pub use pins::{reference_pin_grid, PinPosition, REFERENCE_SPACING_MM, REFERENCE_TOLERANCE_MM};
