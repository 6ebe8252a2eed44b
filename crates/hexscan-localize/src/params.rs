use serde::{Deserialize, Serialize};

/// Which localization strategy the scanner runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalizerKind {
    /// Six-vertex outline + homography.
    #[default]
    HexContour,
    /// Axis-aligned bounding box of the largest outline, 4-point homography.
    BoundingBox,
    /// No detection: the board is assumed centred in the frame.
    StaticFrame,
}

/// Polygon simplification tolerances, as fractions of the contour perimeter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifySweep {
    pub start: f32,
    pub end: f32,
    pub step: f32,
}

impl Default for SimplifySweep {
    fn default() -> Self {
        Self {
            start: 0.01,
            end: 0.06,
            step: 0.005,
        }
    }
}

impl SimplifySweep {
    /// Tolerance fractions from `start` to `end` inclusive.
    pub fn fractions(&self) -> impl Iterator<Item = f32> + '_ {
        let steps = ((self.end - self.start) / self.step + 1e-3).floor().max(0.0) as usize;
        (0..=steps).map(move |i| self.start + i as f32 * self.step)
    }
}

/// Localizer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerParams {
    pub kind: LocalizerKind,
    /// Frames are downscaled so their longer side is at most this many
    /// pixels before detection.
    pub max_dimension: u32,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Edge maps are dilated by this radius to close small gaps.
    pub edge_dilate_radius: u8,
    /// Smallest accepted outline area relative to the frame area.
    pub min_area_fraction: f32,
    pub simplify: SimplifySweep,
    pub require_convex: bool,
    /// Retry with local-mean and global thresholding when the edge map
    /// yields no hexagon.
    pub threshold_fallback: bool,
    pub adaptive_block_radius: u32,
    pub adaptive_offset: f32,
    /// Side of the square aligned raster in pixels.
    pub raster_size: usize,
    /// Largest accepted vertex reprojection error, relative to the
    /// canonical hexagon radius.
    pub max_reprojection_frac: f32,
}

impl Default for LocalizerParams {
    fn default() -> Self {
        Self {
            kind: LocalizerKind::HexContour,
            max_dimension: 480,
            blur_sigma: 1.2,
            canny_low: 30.0,
            canny_high: 90.0,
            edge_dilate_radius: 1,
            min_area_fraction: 0.13,
            simplify: SimplifySweep::default(),
            require_convex: true,
            threshold_fallback: true,
            adaptive_block_radius: 15,
            adaptive_offset: 7.0,
            raster_size: 400,
            max_reprojection_frac: 0.08,
        }
    }
}

/// Invalid localizer or stability configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocalizeParamsError {
    #[error("raster_size must be >= 32 (got {0})")]
    InvalidRasterSize(usize),
    #[error("max_dimension must be >= 64 (got {0})")]
    InvalidMaxDimension(u32),
    #[error("blur_sigma must be finite and >= 0")]
    InvalidBlurSigma,
    #[error("canny thresholds must satisfy 0 <= low <= high")]
    InvalidCannyThresholds,
    #[error("min_area_fraction must be in (0, 1)")]
    InvalidAreaFraction,
    #[error("simplify sweep must satisfy 0 < start <= end < 1 and step > 0")]
    InvalidSimplifySweep,
    #[error("adaptive_block_radius must be >= 1")]
    InvalidBlockRadius,
    #[error("max_reprojection_frac must be > 0")]
    InvalidReprojection,
    #[error("lock_threshold must be >= 1")]
    InvalidLockThreshold,
    #[error("failure_penalty must be >= 2")]
    InvalidPenalty,
    #[error("counter_cap must be >= lock_threshold")]
    InvalidCounterCap,
}

impl LocalizerParams {
    pub fn validate(&self) -> Result<(), LocalizeParamsError> {
        if self.raster_size < 32 {
            return Err(LocalizeParamsError::InvalidRasterSize(self.raster_size));
        }
        if self.max_dimension < 64 {
            return Err(LocalizeParamsError::InvalidMaxDimension(self.max_dimension));
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(LocalizeParamsError::InvalidBlurSigma);
        }
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return Err(LocalizeParamsError::InvalidCannyThresholds);
        }
        if !(self.min_area_fraction > 0.0 && self.min_area_fraction < 1.0) {
            return Err(LocalizeParamsError::InvalidAreaFraction);
        }
        let s = &self.simplify;
        if !(s.start > 0.0 && s.start <= s.end && s.end < 1.0 && s.step > 0.0) {
            return Err(LocalizeParamsError::InvalidSimplifySweep);
        }
        if self.adaptive_block_radius == 0 {
            return Err(LocalizeParamsError::InvalidBlockRadius);
        }
        if !(self.max_reprojection_frac > 0.0) {
            return Err(LocalizeParamsError::InvalidReprojection);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sweep_covers_one_to_six_percent() {
        let f: Vec<f32> = SimplifySweep::default().fractions().collect();
        assert_eq!(f.len(), 11);
        assert!((f[0] - 0.01).abs() < 1e-6);
        assert!((f[10] - 0.06).abs() < 1e-5);
    }

    #[test]
    fn validation_catches_bad_values() {
        assert!(LocalizerParams::default().validate().is_ok());
        let p = LocalizerParams {
            canny_low: 100.0,
            canny_high: 50.0,
            ..LocalizerParams::default()
        };
        assert_eq!(
            p.validate(),
            Err(LocalizeParamsError::InvalidCannyThresholds)
        );
        let p = LocalizerParams {
            min_area_fraction: 0.0,
            ..LocalizerParams::default()
        };
        assert_eq!(p.validate(), Err(LocalizeParamsError::InvalidAreaFraction));
    }

    #[test]
    fn kind_parses_from_snake_case() {
        let p: LocalizerParams = serde_json::from_str(r#"{"kind":"bounding_box"}"#).unwrap();
        assert_eq!(p.kind, LocalizerKind::BoundingBox);
        assert_eq!(p.raster_size, 400);
    }
}
