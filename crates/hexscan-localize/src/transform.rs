use hexscan_core::{warp_perspective_rgb, Homography, Point2, RgbImage, RgbImageView};
use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalFrame;

/// Frame-to-board alignment produced by one localization attempt.
///
/// Replaced wholesale on every detection; never patched in place.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardTransform {
    /// Maps canonical raster pixels into frame pixels.
    pub img_from_raster: Homography,
    pub canonical: CanonicalFrame,
    /// Board outline in frame pixels, canonical vertex order.
    pub corners: [Point2<f32>; 6],
    pub valid: bool,
    pub timestamp_ms: u64,
}

impl BoardTransform {
    /// Wrap a homography and check that it is usable: finite, far from
    /// singular, and keeping the whole outline on one side of the horizon.
    pub fn new(img_from_raster: Homography, canonical: CanonicalFrame, timestamp_ms: u64) -> Self {
        let outline = canonical.outline_px();
        let corners = outline.map(|p| img_from_raster.apply(p));
        let valid = is_well_conditioned(&img_from_raster, &outline)
            && corners.iter().all(|c| c.x.is_finite() && c.y.is_finite());
        Self {
            img_from_raster,
            canonical,
            corners,
            valid,
            timestamp_ms,
        }
    }

    /// Inverse mapping, frame pixels into the raster.
    pub fn raster_from_img(&self) -> Option<Homography> {
        self.img_from_raster.inverse()
    }

    /// Board-plane millimetres to frame pixels.
    pub fn board_to_image(&self, mm: Point2<f32>) -> Point2<f32> {
        self.img_from_raster.apply(self.canonical.board_to_pixel(mm))
    }

    /// Resample `frame` into the canonical square raster.
    pub fn warp(&self, frame: &RgbImageView<'_>) -> AlignedRaster {
        let n = self.canonical.size;
        AlignedRaster {
            image: warp_perspective_rgb(frame, &self.img_from_raster, n, n),
            canonical: self.canonical,
        }
    }
}

fn is_well_conditioned(h: &Homography, outline: &[Point2<f32>; 6]) -> bool {
    if !h.h.iter().all(|v| v.is_finite()) {
        return false;
    }
    if h.normalized_determinant().abs() < 1e-12 {
        return false;
    }
    let d0 = h.depth(outline[0]);
    d0.abs() > 1e-12 && outline.iter().all(|&p| h.depth(p) * d0 > 0.0)
}

/// Board image in the canonical frame.
#[derive(Clone, Debug)]
pub struct AlignedRaster {
    pub image: RgbImage,
    pub canonical: CanonicalFrame,
}

impl AlignedRaster {
    #[inline]
    pub fn view(&self) -> RgbImageView<'_> {
        self.image.view()
    }

    /// Board-plane millimetres to raster pixels.
    #[inline]
    pub fn board_to_pixel(&self, mm: Point2<f32>) -> Point2<f32> {
        self.canonical.board_to_pixel(mm)
    }

    /// Raster pixels per board millimetre.
    #[inline]
    pub fn px_per_mm(&self) -> f32 {
        self.canonical.px_per_mm()
    }
}
