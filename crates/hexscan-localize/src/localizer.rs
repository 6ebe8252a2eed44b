//! Interchangeable board localization strategies.

use hexscan_core::{estimate_homography, homography_from_4pt, Homography, Point2, RgbImageView};
use image::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::canonical::CanonicalFrame;
use crate::outline::{canonical_order, hexagon_from_contour};
use crate::params::{LocalizeParamsError, LocalizerKind, LocalizerParams};
use crate::primitives::{
    adaptive_threshold, blur, downscale, edge_map, largest_outer_contour, otsu_level,
    rgb_to_gray, threshold, upscale_point, OutlineCandidate,
};
use crate::transform::BoardTransform;

/// Finds the board in a camera frame.
///
/// `None` is an ordinary outcome (no board this frame) and carries no
/// reason; callers feed it into the stability decay.
pub trait Localizer: Send + Sync {
    fn localize(&self, frame: &RgbImageView<'_>, timestamp_ms: u64) -> Option<BoardTransform>;

    fn canonical(&self) -> &CanonicalFrame;

    fn name(&self) -> &'static str;
}

/// Build the strategy selected by `params.kind`.
pub fn build_localizer(
    params: &LocalizerParams,
    canonical: CanonicalFrame,
) -> Result<Box<dyn Localizer>, LocalizeParamsError> {
    params.validate()?;
    Ok(match params.kind {
        LocalizerKind::HexContour => Box::new(HexContourLocalizer::new(params.clone(), canonical)),
        LocalizerKind::BoundingBox => {
            Box::new(BoundingBoxLocalizer::new(params.clone(), canonical))
        }
        LocalizerKind::StaticFrame => Box::new(StaticFrameLocalizer::new(canonical)),
    })
}

/// Binarizations tried in order until one yields a board outline.
///
/// Global thresholds come before the local-mean ones: a region mask traces
/// the board edge itself, while a local-mean ring may sit just outside it.
#[derive(Clone, Copy, Debug)]
enum BinaryMap {
    Edges,
    OtsuBright,
    OtsuDark,
    AdaptiveBright,
    AdaptiveDark,
}

impl BinaryMap {
    fn passes(params: &LocalizerParams) -> &'static [BinaryMap] {
        const ALL: [BinaryMap; 5] = [
            BinaryMap::Edges,
            BinaryMap::OtsuBright,
            BinaryMap::OtsuDark,
            BinaryMap::AdaptiveBright,
            BinaryMap::AdaptiveDark,
        ];
        if params.threshold_fallback {
            &ALL
        } else {
            &ALL[..1]
        }
    }

    fn render(self, gray: &GrayImage, params: &LocalizerParams) -> GrayImage {
        let (r, off) = (params.adaptive_block_radius, params.adaptive_offset);
        match self {
            Self::Edges => edge_map(
                gray,
                params.canny_low,
                params.canny_high,
                params.edge_dilate_radius,
            ),
            Self::AdaptiveDark => adaptive_threshold(gray, r, off, true),
            Self::AdaptiveBright => adaptive_threshold(gray, r, off, false),
            Self::OtsuBright => threshold(gray, otsu_level(gray), true),
            Self::OtsuDark => threshold(gray, otsu_level(gray), false),
        }
    }
}

/// Downscaled, blurred intensity image plus the factor back to full size.
struct DetectionInput {
    gray: GrayImage,
    factor: f32,
}

impl DetectionInput {
    fn new(frame: &RgbImageView<'_>, params: &LocalizerParams) -> Self {
        let (small, factor) = downscale(rgb_to_gray(frame), params.max_dimension);
        Self {
            gray: blur(&small, params.blur_sigma),
            factor,
        }
    }

    fn min_area(&self, params: &LocalizerParams) -> f32 {
        let (w, h) = self.gray.dimensions();
        params.min_area_fraction * (w as f32 * h as f32)
    }

    fn candidate(&self, mask: &GrayImage, params: &LocalizerParams) -> Option<OutlineCandidate> {
        let c = largest_outer_contour(mask)?;
        let min_area = self.min_area(params);
        if c.area < min_area {
            log::trace!("largest outline {:.0} px² below {:.0} px²", c.area, min_area);
            return None;
        }
        Some(c)
    }

    fn to_frame(&self, p: Point2<f32>) -> Point2<f32> {
        upscale_point(p, self.factor)
    }
}

fn accept(
    h: Option<Homography>,
    canonical: &CanonicalFrame,
    timestamp_ms: u64,
) -> Option<BoardTransform> {
    let t = BoardTransform::new(h?, *canonical, timestamp_ms);
    if !t.valid {
        log::debug!("rejecting degenerate board homography");
        return None;
    }
    Some(t)
}

/// Outline → six vertices → six-point homography.
#[derive(Clone, Debug)]
pub struct HexContourLocalizer {
    params: LocalizerParams,
    canonical: CanonicalFrame,
}

impl HexContourLocalizer {
    pub fn new(params: LocalizerParams, canonical: CanonicalFrame) -> Self {
        Self { params, canonical }
    }

    fn solve(&self, corners: &[Point2<f32>; 6], timestamp_ms: u64) -> Option<BoardTransform> {
        let dst = self.canonical.outline_px();
        let ordered = canonical_order(corners, hexscan_core::signed_area(&dst));
        let h = estimate_homography(&dst, &ordered);
        let t = accept(h, &self.canonical, timestamp_ms)?;

        // A six-gon that is not a projected regular hexagon fits badly.
        let raster_from_img = t.raster_from_img()?;
        let tol = self.params.max_reprojection_frac * self.canonical.radius_px();
        let worst = ordered
            .iter()
            .zip(dst.iter())
            .map(|(img, canon)| (raster_from_img.apply(*img) - canon).norm())
            .fold(0.0f32, f32::max);
        if worst > tol {
            log::debug!("outline reprojection error {worst:.1} px exceeds {tol:.1} px");
            return None;
        }
        Some(t)
    }
}

impl Localizer for HexContourLocalizer {
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, frame),
            fields(width = frame.width, height = frame.height)
        )
    )]
    fn localize(&self, frame: &RgbImageView<'_>, timestamp_ms: u64) -> Option<BoardTransform> {
        let input = DetectionInput::new(frame, &self.params);
        for &pass in BinaryMap::passes(&self.params) {
            let mask = pass.render(&input.gray, &self.params);
            let Some(candidate) = input.candidate(&mask, &self.params) else {
                continue;
            };
            let Some(hex) = hexagon_from_contour(
                &candidate.points,
                &self.params.simplify,
                self.params.require_convex,
            ) else {
                log::trace!("{pass:?}: outline does not simplify to a hexagon");
                continue;
            };
            let corners = hex.map(|p| input.to_frame(p));
            if let Some(t) = self.solve(&corners, timestamp_ms) {
                log::debug!("{pass:?}: board found");
                return Some(t);
            }
        }
        None
    }

    fn canonical(&self) -> &CanonicalFrame {
        &self.canonical
    }

    fn name(&self) -> &'static str {
        "hex_contour"
    }
}

/// Largest outline's bounding box mapped onto the canonical hexagon's
/// bounding box.
#[derive(Clone, Debug)]
pub struct BoundingBoxLocalizer {
    params: LocalizerParams,
    canonical: CanonicalFrame,
}

impl BoundingBoxLocalizer {
    pub fn new(params: LocalizerParams, canonical: CanonicalFrame) -> Self {
        Self { params, canonical }
    }
}

fn box_corners(b: [f32; 4]) -> [Point2<f32>; 4] {
    [
        Point2::new(b[0], b[1]),
        Point2::new(b[2], b[1]),
        Point2::new(b[2], b[3]),
        Point2::new(b[0], b[3]),
    ]
}

impl Localizer for BoundingBoxLocalizer {
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, frame),
            fields(width = frame.width, height = frame.height)
        )
    )]
    fn localize(&self, frame: &RgbImageView<'_>, timestamp_ms: u64) -> Option<BoardTransform> {
        let input = DetectionInput::new(frame, &self.params);
        for &pass in BinaryMap::passes(&self.params) {
            let mask = pass.render(&input.gray, &self.params);
            let Some(candidate) = input.candidate(&mask, &self.params) else {
                continue;
            };
            let src = box_corners(self.canonical.outline_bounds_px());
            let dst = box_corners(candidate.bounds).map(|p| input.to_frame(p));
            if let Some(t) = accept(homography_from_4pt(&src, &dst), &self.canonical, timestamp_ms)
            {
                log::debug!("{pass:?}: board bounding box found");
                return Some(t);
            }
        }
        None
    }

    fn canonical(&self) -> &CanonicalFrame {
        &self.canonical
    }

    fn name(&self) -> &'static str {
        "bounding_box"
    }
}

/// No detection: the canonical raster is the centred square of the frame.
#[derive(Clone, Debug)]
pub struct StaticFrameLocalizer {
    canonical: CanonicalFrame,
}

impl StaticFrameLocalizer {
    pub fn new(canonical: CanonicalFrame) -> Self {
        Self { canonical }
    }
}

impl Localizer for StaticFrameLocalizer {
    fn localize(&self, frame: &RgbImageView<'_>, timestamp_ms: u64) -> Option<BoardTransform> {
        let side = frame.width.min(frame.height) as f64;
        let n = self.canonical.size as f64;
        let s = side / n;
        let tx = (frame.width as f64 - side) * 0.5 + 0.5 * s - 0.5;
        let ty = (frame.height as f64 - side) * 0.5 + 0.5 * s - 0.5;
        accept(
            Some(Homography::scale_translate(s, tx, ty)),
            &self.canonical,
            timestamp_ms,
        )
    }

    fn canonical(&self) -> &CanonicalFrame {
        &self.canonical
    }

    fn name(&self) -> &'static str {
        "static_frame"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexscan_board::{BoardLayout, BoardSpec};
    use hexscan_core::RgbImage;
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;
    use nalgebra::Matrix3;

    const W: u32 = 640;
    const H: u32 = 480;

    fn canonical() -> CanonicalFrame {
        CanonicalFrame::new(&BoardLayout::new(BoardSpec::default()).unwrap(), 401)
    }

    /// Bright board outline drawn through `img_from_raster` on a dark table.
    fn render(img_from_raster: &Homography, outline: &[Point2<f32>]) -> RgbImage {
        let mut img = image::RgbImage::from_pixel(W, H, image::Rgb([60, 55, 50]));
        let poly: Vec<Point<i32>> = outline
            .iter()
            .map(|&p| {
                let q = img_from_raster.apply(p);
                Point::new(q.x.round() as i32, q.y.round() as i32)
            })
            .collect();
        draw_polygon_mut(&mut img, &poly, image::Rgb([225, 220, 210]));
        RgbImage::from_raw(W as usize, H as usize, img.into_raw()).unwrap()
    }

    fn fronto_parallel() -> Homography {
        // Raster radius 200 px → 180 px in the frame, centred.
        Homography::scale_translate(0.9, 320.0 - 0.9 * 200.0, 240.0 - 0.9 * 200.0)
    }

    fn tilted() -> Homography {
        let base = fronto_parallel();
        let tilt = Homography::new(Matrix3::new(
            1.05, 0.08, -20.0, //
            -0.03, 0.95, 12.0, //
            0.0002, 0.0001, 1.0,
        ));
        tilt.compose(&base)
    }

    fn assert_maps_board_like(found: &BoardTransform, truth: &Homography, tol: f32) {
        let cf = canonical();
        for mm in [
            Point2::new(0.0, 0.0),
            Point2::new(-112.5, -64.95),
            Point2::new(75.0, 86.6),
            Point2::new(0.0, 129.9),
        ] {
            let expected = truth.apply(cf.board_to_pixel(mm));
            let got = found.board_to_image(mm);
            assert!(
                (got - expected).norm() < tol,
                "{mm:?}: expected {expected:?}, got {got:?}"
            );
        }
    }

    #[test]
    fn finds_fronto_parallel_board() {
        let truth = fronto_parallel();
        let frame = render(&truth, &canonical().outline_px());
        let loc = HexContourLocalizer::new(LocalizerParams::default(), canonical());
        let t = loc.localize(&frame.view(), 7).expect("board");
        assert!(t.valid);
        assert_eq!(t.timestamp_ms, 7);
        assert_maps_board_like(&t, &truth, 5.0);
    }

    #[test]
    fn finds_tilted_board() {
        let truth = tilted();
        let frame = render(&truth, &canonical().outline_px());
        let loc = HexContourLocalizer::new(LocalizerParams::default(), canonical());
        let t = loc.localize(&frame.view(), 0).expect("board");
        assert_maps_board_like(&t, &truth, 6.0);
    }

    #[test]
    fn threshold_fallback_recovers_when_edges_fail() {
        let truth = fronto_parallel();
        let frame = render(&truth, &canonical().outline_px());
        let edges_only = LocalizerParams {
            canny_low: 5000.0,
            canny_high: 5000.0,
            threshold_fallback: false,
            ..LocalizerParams::default()
        };
        let loc = HexContourLocalizer::new(edges_only.clone(), canonical());
        assert!(loc.localize(&frame.view(), 0).is_none());

        let with_fallback = LocalizerParams {
            threshold_fallback: true,
            ..edges_only
        };
        let loc = HexContourLocalizer::new(with_fallback, canonical());
        let t = loc.localize(&frame.view(), 0).expect("fallback board");
        assert_maps_board_like(&t, &truth, 5.0);
    }

    #[test]
    fn blank_and_small_frames_have_no_board() {
        let blank = RgbImage::from_raw(
            W as usize,
            H as usize,
            vec![90; (W * H * 3) as usize],
        )
        .unwrap();
        let loc = HexContourLocalizer::new(LocalizerParams::default(), canonical());
        assert!(loc.localize(&blank.view(), 0).is_none());

        let tiny = Homography::scale_translate(0.2, 300.0, 200.0);
        let frame = render(&tiny, &canonical().outline_px());
        assert!(loc.localize(&frame.view(), 0).is_none());
    }

    #[test]
    fn rectangles_are_not_hexagons_but_have_a_bounding_box() {
        let truth = fronto_parallel();
        let b = canonical().outline_bounds_px();
        let rect = box_corners(b);
        let frame = render(&truth, &rect);

        let hex = HexContourLocalizer::new(LocalizerParams::default(), canonical());
        assert!(hex.localize(&frame.view(), 0).is_none());

        let bbox = BoundingBoxLocalizer::new(LocalizerParams::default(), canonical());
        let t = bbox.localize(&frame.view(), 0).expect("bounding box");
        let c = t.board_to_image(Point2::new(0.0, 0.0));
        assert!((c.x - 320.0).abs() < 4.0 && (c.y - 240.0).abs() < 4.0);
    }

    #[test]
    fn static_frame_uses_centred_square() {
        let params = LocalizerParams {
            kind: LocalizerKind::StaticFrame,
            ..LocalizerParams::default()
        };
        let loc = build_localizer(&params, canonical()).unwrap();
        assert_eq!(loc.name(), "static_frame");
        let frame = RgbImage::new(W as usize, H as usize);
        let t = loc.localize(&frame.view(), 3).expect("always succeeds");
        let c = t.board_to_image(Point2::new(0.0, 0.0));
        assert!((c.x - 319.5).abs() < 0.6 && (c.y - 239.5).abs() < 0.6);
    }

    #[test]
    fn builder_validates_params() {
        let bad = LocalizerParams {
            raster_size: 4,
            ..LocalizerParams::default()
        };
        assert!(matches!(
            build_localizer(&bad, canonical()),
            Err(LocalizeParamsError::InvalidRasterSize(4))
        ));
    }
}
