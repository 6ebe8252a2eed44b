//! Denoised color samples at board positions.

use hexscan_board::SamplePoint;
use hexscan_core::RgbImageView;
use hexscan_localize::AlignedRaster;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How the pixels around a sample point are averaged.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TapMode {
    /// Centre plus eight neighbours at ±`jitter_px`. Without an explicit
    /// jitter it scales with the raster: `max(2, round(min(w, h) / 160))`.
    Star { jitter_px: Option<u32> },
    /// Every pixel within `radius_frac` of the marker radius.
    Disk { radius_frac: f32 },
}

impl Default for TapMode {
    fn default() -> Self {
        Self::Star { jitter_px: None }
    }
}

/// Sampling configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub taps: TapMode,
    pub white_balance: bool,
    /// Pixel stride used when estimating the white balance.
    pub wb_stride: usize,
    pub gain_min: f32,
    pub gain_max: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            taps: TapMode::default(),
            white_balance: true,
            wb_stride: 4,
            gain_min: 0.6,
            gain_max: 1.4,
        }
    }
}

/// Per-channel gray-world gains.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhiteBalance {
    pub gains: [f32; 3],
}

impl Default for WhiteBalance {
    fn default() -> Self {
        Self { gains: [1.0; 3] }
    }
}

impl WhiteBalance {
    /// Average every `stride`-th pixel in both directions and scale each
    /// channel towards the overall gray level, gains clamped to
    /// `[gain_min, gain_max]`.
    pub fn estimate(view: &RgbImageView<'_>, stride: usize, gain_min: f32, gain_max: f32) -> Self {
        let stride = stride.max(1);
        let mut sum = [0f64; 3];
        let mut n = 0u64;
        for y in (0..view.height).step_by(stride) {
            for x in (0..view.width).step_by(stride) {
                let i = (y * view.width + x) * 3;
                for c in 0..3 {
                    sum[c] += view.data[i + c] as f64;
                }
                n += 1;
            }
        }
        if n == 0 {
            return Self::default();
        }
        let avg = sum.map(|s| s / n as f64);
        let gray = (avg[0] + avg[1] + avg[2]) / 3.0;
        let gains = avg.map(|a| {
            if a < 1e-6 {
                1.0
            } else {
                ((gray / a) as f32).clamp(gain_min, gain_max)
            }
        });
        log::debug!(
            "white balance gains r={:.3} g={:.3} b={:.3}",
            gains[0],
            gains[1],
            gains[2]
        );
        Self { gains }
    }

    #[inline]
    pub fn apply(&self, rgb: [u8; 3]) -> [u8; 3] {
        std::array::from_fn(|c| (rgb[c] as f32 * self.gains[c]).round().clamp(0.0, 255.0) as u8)
    }
}

/// Extracts one averaged RGB value per sample point.
#[derive(Clone, Debug)]
pub struct ColorSampler {
    params: SamplingParams,
    /// Marker radius in board millimetres.
    marker_radius_mm: f32,
}

impl ColorSampler {
    pub fn new(params: SamplingParams, marker_diameter_mm: f32) -> Self {
        Self {
            params,
            marker_radius_mm: marker_diameter_mm * 0.5,
        }
    }

    #[inline]
    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    /// Gray-world gains for `raster`, or unit gains when disabled.
    pub fn white_balance(&self, raster: &AlignedRaster) -> WhiteBalance {
        if !self.params.white_balance {
            return WhiteBalance::default();
        }
        WhiteBalance::estimate(
            &raster.view(),
            self.params.wb_stride,
            self.params.gain_min,
            self.params.gain_max,
        )
    }

    /// Averaged color at each point, white balance already applied.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(points = points.len()))
    )]
    pub fn sample_colors(
        &self,
        raster: &AlignedRaster,
        points: &[SamplePoint],
        wb: &WhiteBalance,
    ) -> Vec<[u8; 3]> {
        let view = raster.view();
        points
            .iter()
            .map(|sp| {
                let p = raster.board_to_pixel(sp.point());
                let rgb = match self.params.taps {
                    TapMode::Star { jitter_px } => {
                        let j = jitter_px.unwrap_or_else(|| default_jitter(&view)) as i32;
                        star_average(&view, p.x, p.y, j)
                    }
                    TapMode::Disk { radius_frac } => {
                        let r = radius_frac * self.marker_radius_mm * raster.px_per_mm();
                        disk_average(&view, p.x, p.y, r)
                    }
                };
                wb.apply(rgb)
            })
            .collect()
    }
}

fn default_jitter(view: &RgbImageView<'_>) -> u32 {
    ((view.width.min(view.height) as f32 / 160.0).round() as u32).max(2)
}

fn average(sum: [u32; 3], count: u32) -> [u8; 3] {
    if count == 0 {
        return [0; 3];
    }
    sum.map(|s| (s as f32 / count as f32).round() as u8)
}

/// Mean of the nine star taps that fall inside the image.
pub fn star_average(view: &RgbImageView<'_>, x: f32, y: f32, jitter: i32) -> [u8; 3] {
    const DIRS: [(i32, i32); 9] = [
        (0, 0),
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (-1, 1),
        (1, -1),
        (-1, -1),
    ];
    let (mut sum, mut count) = ([0u32; 3], 0u32);
    for (dx, dy) in DIRS {
        let px = (x + (dx * jitter) as f32).round() as i32;
        let py = (y + (dy * jitter) as f32).round() as i32;
        if let Some(rgb) = view.pixel(px, py) {
            for c in 0..3 {
                sum[c] += rgb[c] as u32;
            }
            count += 1;
        }
    }
    average(sum, count)
}

/// Mean of all in-bounds pixels within `radius` of `(x, y)`.
pub fn disk_average(view: &RgbImageView<'_>, x: f32, y: f32, radius: f32) -> [u8; 3] {
    let r = radius.max(0.0);
    let r2 = r * r;
    let (x0, x1) = ((x - r).floor() as i32, (x + r).ceil() as i32);
    let (y0, y1) = ((y - r).floor() as i32, (y + r).ceil() as i32);
    let (mut sum, mut count) = ([0u32; 3], 0u32);
    for py in y0..=y1 {
        for px in x0..=x1 {
            let (dx, dy) = (px as f32 - x, py as f32 - y);
            if dx * dx + dy * dy > r2 {
                continue;
            }
            if let Some(rgb) = view.pixel(px, py) {
                for c in 0..3 {
                    sum[c] += rgb[c] as u32;
                }
                count += 1;
            }
        }
    }
    if count == 0 {
        return view
            .pixel(x.round() as i32, y.round() as i32)
            .unwrap_or([0; 3]);
    }
    average(sum, count)
}
