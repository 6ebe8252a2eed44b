//! Board localization and alignment.
//!
//! A [`Localizer`] turns a camera frame into a [`BoardTransform`]: a
//! homography from the [`CanonicalFrame`] raster into frame pixels. Three
//! strategies share the trait and are picked by [`LocalizerKind`]:
//!
//! - [`HexContourLocalizer`]: edge map → largest top-level outline → area
//!   gate → simplification sweep to six vertices → canonical vertex order →
//!   six-point homography, with threshold maps as fallback;
//! - [`BoundingBoxLocalizer`]: the outline's bounding box and a 4-point
//!   homography;
//! - [`StaticFrameLocalizer`]: no detection, board assumed centred.
//!
//! [`StabilityTracker`] gates capture on a run of successful attempts.

mod canonical;
mod localizer;
mod outline;
mod params;
pub mod primitives;
mod stability;
mod transform;

pub use canonical::CanonicalFrame;
pub use localizer::{
    build_localizer, BoundingBoxLocalizer, HexContourLocalizer, Localizer, StaticFrameLocalizer,
};
pub use outline::{canonical_order, hexagon_from_contour};
pub use params::{LocalizeParamsError, LocalizerKind, LocalizerParams, SimplifySweep};
pub use stability::{DetectionState, StabilityParams, StabilityTracker};
pub use transform::{AlignedRaster, BoardTransform};
