//! Marker counting by connected components over per-color masks.

use hexscan_core::Point2;
use hexscan_localize::primitives::{close, connected_components, mask_and, open, polygon_mask};
use hexscan_localize::AlignedRaster;
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::hsv::rgb_to_hsv;
use crate::profile::ColorTable;
use crate::sampler::WhiteBalance;

/// Blob-mode settings. Kernel radii and area bounds are empirical and
/// should be re-checked against the markers actually in use.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    pub enabled: bool,
    /// Square kernel radius of the opening pass (speckle removal).
    pub open_radius: u8,
    /// Square kernel radius of the closing pass (fills connector gaps).
    pub close_radius: u8,
    /// Smallest accepted component, as a fraction of one marker's area.
    pub min_area_frac: f32,
    /// Largest accepted component, as a fraction of one marker's area.
    pub max_area_frac: f32,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            enabled: true,
            open_radius: 1,
            close_radius: 1,
            min_area_frac: 0.35,
            max_area_frac: 3.0,
        }
    }
}

/// Counts marker-sized blobs per color inside a board region.
#[derive(Clone, Debug)]
pub struct BlobCounter {
    params: BlobParams,
    marker_radius_mm: f32,
}

impl BlobCounter {
    pub fn new(params: BlobParams, marker_diameter_mm: f32) -> Self {
        Self {
            params,
            marker_radius_mm: marker_diameter_mm * 0.5,
        }
    }

    #[inline]
    pub fn params(&self) -> &BlobParams {
        &self.params
    }

    /// Area of one marker in raster pixels.
    pub fn expected_area_px(&self, raster: &AlignedRaster) -> f32 {
        let r = self.marker_radius_mm * raster.px_per_mm();
        std::f32::consts::PI * r * r
    }

    /// Accepted component count per profile, in table order. `region` is
    /// the validity polygon in board millimetres.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(colors = table.len()))
    )]
    pub fn count_blobs(
        &self,
        raster: &AlignedRaster,
        table: &ColorTable,
        wb: &WhiteBalance,
        region: &[Point2<f32>],
    ) -> Vec<u32> {
        let view = raster.view();
        let (w, h) = (view.width as u32, view.height as u32);
        let region_px: Vec<Point2<f32>> =
            region.iter().map(|&p| raster.board_to_pixel(p)).collect();
        let valid = polygon_mask(w, h, &region_px);

        let labels: Vec<Option<usize>> = view
            .data
            .chunks_exact(3)
            .map(|px| table.classify_hsv(rgb_to_hsv(wb.apply([px[0], px[1], px[2]]))))
            .collect();

        let expected = self.expected_area_px(raster);
        let min_area = expected * self.params.min_area_frac;
        let max_area = expected * self.params.max_area_frac;

        (0..table.len())
            .map(|i| {
                let mask = GrayImage::from_fn(w, h, |x, y| {
                    let on = labels[y as usize * view.width + x as usize] == Some(i);
                    Luma([if on { 255 } else { 0 }])
                });
                let mask = mask_and(&mask, &valid);
                let mask = close(&open(&mask, self.params.open_radius), self.params.close_radius);
                let accepted = connected_components(&mask)
                    .into_iter()
                    .filter(|c| (min_area..=max_area).contains(&(c.area as f32)))
                    .count() as u32;
                log::trace!("blob count {}: {}", table.profiles[i].id, accepted);
                accepted
            })
            .collect()
    }
}
