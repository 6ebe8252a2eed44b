//! Marker color analysis on an aligned board raster.
//!
//! [`ColorSampler`] averages a small star or disk of pixels at every board
//! sample point, optionally after gray-world white balance. Samples are
//! converted to half-scale HSV and matched against a disjoint
//! [`ColorTable`]; hue ranges may wrap through zero. [`BlobCounter`] is the
//! stronger alternative: per-color masks, open/close filtering and
//! connected components of marker size. [`ColorEngine`] runs both and
//! picks the count used for scoring.
//!
//! ```no_run
//! use hexscan_board::{BoardLayout, BoardSpec};
//! use hexscan_color::{BlobParams, ColorEngine, ColorTable, SamplingParams};
//! # fn raster() -> hexscan_localize::AlignedRaster { unimplemented!() }
//!
//! let layout = BoardLayout::new(BoardSpec::default()).unwrap();
//! let engine = ColorEngine::new(
//!     ColorTable::default(),
//!     SamplingParams::default(),
//!     BlobParams::default(),
//!     layout.spec().marker_diameter_mm,
//! )
//! .unwrap();
//! let analysis = engine.analyze(&raster(), &layout);
//! println!("magenta: {}", analysis.count_of("magenta"));
//! ```

mod analysis;
mod blob;
mod classify;
mod hsv;
mod profile;
mod sampler;

pub use analysis::{ColorAnalysis, ColorEngine, ColorError, CountSource};
pub use blob::{BlobCounter, BlobParams};
pub use classify::{classify_samples, PointClassification};
pub use hsv::{rgb_to_hsv, Hsv};
pub use profile::{ColorProfile, ColorTable, ColorTableError, HUE_MAX};
pub use sampler::{disk_average, star_average, ColorSampler, SamplingParams, TapMode, WhiteBalance};
