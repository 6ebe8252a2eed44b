//! Sampling, classification and blob counting over one aligned raster.

use hexscan_board::BoardLayout;
use hexscan_localize::AlignedRaster;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::blob::{BlobCounter, BlobParams};
use crate::classify::classify_samples;
use crate::profile::{ColorTable, ColorTableError};
use crate::sampler::{ColorSampler, SamplingParams, TapMode, WhiteBalance};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ColorError {
    #[error(transparent)]
    Table(#[from] ColorTableError),
    #[error("white-balance stride must be positive")]
    InvalidStride,
    #[error("gain clamp must satisfy 0 < min <= 1 <= max")]
    InvalidGainClamp,
    #[error("disk radius fraction must be positive, got {0}")]
    InvalidDiskRadius(f32),
    #[error("blob area bounds must satisfy 0 < min <= max")]
    InvalidBlobArea,
}

/// Which counter produced [`ColorAnalysis::counts`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    Points,
    Blobs,
}

/// Result of analysing one raster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColorAnalysis {
    /// Color id per profile, in table order.
    pub color_ids: Vec<String>,
    /// White-balanced sample per sample point.
    pub samples: Vec<[u8; 3]>,
    pub labels: Vec<Option<usize>>,
    pub point_counts: Vec<u32>,
    pub blob_counts: Option<Vec<u32>>,
    /// Counts used for scoring.
    pub counts: Vec<u32>,
    pub source: CountSource,
    pub white_balance: WhiteBalance,
}

impl ColorAnalysis {
    /// Count for a color id; zero for unknown ids.
    pub fn count_of(&self, id: &str) -> u32 {
        self.color_ids
            .iter()
            .position(|c| c == id)
            .map_or(0, |i| self.counts[i])
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Color pipeline bound to a color table and marker size.
#[derive(Clone, Debug)]
pub struct ColorEngine {
    table: ColorTable,
    sampler: ColorSampler,
    blobs: BlobCounter,
}

impl ColorEngine {
    pub fn new(
        table: ColorTable,
        sampling: SamplingParams,
        blob: BlobParams,
        marker_diameter_mm: f32,
    ) -> Result<Self, ColorError> {
        table.validate()?;
        validate_sampling(&sampling)?;
        if !(blob.min_area_frac > 0.0 && blob.min_area_frac <= blob.max_area_frac) {
            return Err(ColorError::InvalidBlobArea);
        }
        Ok(Self {
            table,
            sampler: ColorSampler::new(sampling, marker_diameter_mm),
            blobs: BlobCounter::new(blob, marker_diameter_mm),
        })
    }

    #[inline]
    pub fn table(&self) -> &ColorTable {
        &self.table
    }

    /// Sample and classify every layout point. Blob counts replace point
    /// counts when their total lies in `[1, sample_points]`.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn analyze(&self, raster: &AlignedRaster, layout: &BoardLayout) -> ColorAnalysis {
        let points = layout.sample_points();
        let wb = self.sampler.white_balance(raster);
        let samples = self.sampler.sample_colors(raster, points, &wb);
        let classified = classify_samples(&self.table, &samples);

        let blob_counts = self.blobs.params().enabled.then(|| {
            let spec = layout.spec();
            let region = layout.pin_hexagon().grown(spec.marker_diameter_mm).vertices();
            self.blobs.count_blobs(raster, &self.table, &wb, &region)
        });

        let blob_total: u32 = blob_counts.iter().flatten().sum();
        let (counts, source) = match &blob_counts {
            Some(b) if (1..=points.len() as u32).contains(&blob_total) => {
                (b.clone(), CountSource::Blobs)
            }
            _ => (classified.counts.clone(), CountSource::Points),
        };
        log::debug!(
            "color counts {:?} from {:?} (points {:?}, blobs {:?})",
            counts,
            source,
            classified.counts,
            blob_counts
        );

        ColorAnalysis {
            color_ids: self.table.ids().map(str::to_string).collect(),
            samples,
            labels: classified.labels,
            point_counts: classified.counts,
            blob_counts,
            counts,
            source,
            white_balance: wb,
        }
    }
}

fn validate_sampling(p: &SamplingParams) -> Result<(), ColorError> {
    if p.wb_stride == 0 {
        return Err(ColorError::InvalidStride);
    }
    if !(p.gain_min > 0.0 && p.gain_min <= 1.0 && p.gain_max >= 1.0) {
        return Err(ColorError::InvalidGainClamp);
    }
    if let TapMode::Disk { radius_frac } = p.taps {
        if radius_frac.is_nan() || radius_frac <= 0.0 {
            return Err(ColorError::InvalidDiskRadius(radius_frac));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::tests::{gray_raster, paint_disk};
    use hexscan_board::{BoardSpec, SampleStrategy};
    use hexscan_core::Point2;

    fn engine(layout: &BoardLayout, blob: BlobParams) -> ColorEngine {
        ColorEngine::new(
            ColorTable::default(),
            SamplingParams {
                white_balance: false,
                ..SamplingParams::default()
            },
            blob,
            layout.spec().marker_diameter_mm,
        )
        .unwrap()
    }

    fn painted(layout: &BoardLayout, magenta: usize, yellow: usize) -> AlignedRaster {
        let mut raster = gray_raster(layout);
        let r = layout.spec().marker_diameter_mm * 0.5 * raster.px_per_mm();
        let points = layout.sample_points();
        for (i, sp) in points.iter().take(magenta + yellow).enumerate() {
            let rgb = if i < magenta { [233, 30, 99] } else { [255, 235, 59] };
            let c = raster.board_to_pixel(sp.point());
            paint_disk(&mut raster.image, c, r * 0.8, rgb);
        }
        raster
    }

    #[test]
    fn point_counts_without_blobs() {
        let layout = BoardLayout::new(BoardSpec::default()).unwrap();
        let raster = painted(&layout, 5, 3);
        let disabled = BlobParams {
            enabled: false,
            ..BlobParams::default()
        };
        let a = engine(&layout, disabled).analyze(&raster, &layout);
        assert_eq!(a.source, CountSource::Points);
        assert_eq!(a.counts, vec![5, 3, 0, 0]);
        assert_eq!(a.count_of("magenta"), 5);
        assert_eq!(a.count_of("orange"), 0);
        assert!(a.blob_counts.is_none());
    }

    #[test]
    fn blob_counts_used_when_plausible() {
        let layout = BoardLayout::new(BoardSpec::default()).unwrap();
        let raster = painted(&layout, 5, 3);
        let a = engine(&layout, BlobParams::default()).analyze(&raster, &layout);
        assert_eq!(a.source, CountSource::Blobs);
        assert_eq!(a.counts, vec![5, 3, 0, 0]);
        assert_eq!(a.point_counts, vec![5, 3, 0, 0]);
    }

    #[test]
    fn empty_board_falls_back_to_points() {
        let layout = BoardLayout::new(BoardSpec::default()).unwrap();
        let raster = gray_raster(&layout);
        let a = engine(&layout, BlobParams::default()).analyze(&raster, &layout);
        assert_eq!(a.source, CountSource::Points);
        assert_eq!(a.total(), 0);
        assert_eq!(a.blob_counts, Some(vec![0; 4]));
    }

    #[test]
    fn more_blobs_than_sample_points_falls_back_to_points() {
        // A single partition cell: one sample point at the board centre.
        let layout = BoardLayout::new(BoardSpec {
            sample_strategy: SampleStrategy::HexPartition { line_count: 2 },
            ..BoardSpec::default()
        })
        .unwrap();
        assert_eq!(layout.sample_points().len(), 1);

        let mut raster = gray_raster(&layout);
        let r = layout.spec().marker_diameter_mm * 0.5 * raster.px_per_mm();
        let pins = layout.pins();
        let centres = [Point2::new(0.0, 0.0), pins[0].point(), pins[10].point()];
        for mm in centres {
            let c = raster.board_to_pixel(mm);
            paint_disk(&mut raster.image, c, r * 0.8, [233, 30, 99]);
        }

        let a = engine(&layout, BlobParams::default()).analyze(&raster, &layout);
        assert_eq!(a.blob_counts, Some(vec![3, 0, 0, 0]));
        assert_eq!(a.source, CountSource::Points);
        assert_eq!(a.counts, vec![1, 0, 0, 0]);
        assert_eq!(a.counts, a.point_counts);
    }

    #[test]
    fn rejects_bad_parameters() {
        let bad = SamplingParams {
            gain_min: 1.2,
            ..SamplingParams::default()
        };
        let err = ColorEngine::new(ColorTable::default(), bad, BlobParams::default(), 18.0);
        assert_eq!(err.unwrap_err(), ColorError::InvalidGainClamp);

        let disk = SamplingParams {
            taps: TapMode::Disk { radius_frac: 0.0 },
            ..SamplingParams::default()
        };
        let err = ColorEngine::new(ColorTable::default(), disk, BlobParams::default(), 18.0);
        assert_eq!(err.unwrap_err(), ColorError::InvalidDiskRadius(0.0));
    }
}
