//! Raster primitives used by the localizers and the blob counter.
//!
//! Grayscale conversion comes from `image`; thresholding, polygon fill, edge
//! detection, blurring, morphology, contour tracing and connected components
//! come from `imageproc`. The local-mean threshold and Otsu level live here.

use hexscan_core::{signed_area, Point2, RgbImageView};
use image::imageops::FilterType;
use image::{GrayImage, ImageBuffer, Luma, Rgb};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::ThresholdType;
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use imageproc::region_labelling::Connectivity;

const FG: Luma<u8> = Luma([255]);
const BG: Luma<u8> = Luma([0]);

/// Luma of an RGB view. A view whose buffer does not match its size
/// yields a black image.
pub fn rgb_to_gray(view: &RgbImageView<'_>) -> GrayImage {
    let (w, h) = (view.width as u32, view.height as u32);
    ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(w, h, view.data)
        .map_or_else(|| GrayImage::new(w, h), |rgb| image::imageops::grayscale(&rgb))
}

/// Shrink `gray` so its longer side is at most `max_dim`. Returns the image
/// and the factor that maps small-image lengths back to the input.
pub fn downscale(gray: GrayImage, max_dim: u32) -> (GrayImage, f32) {
    let (w, h) = gray.dimensions();
    let longest = w.max(h);
    if longest <= max_dim || max_dim == 0 {
        return (gray, 1.0);
    }
    let s = max_dim as f32 / longest as f32;
    let nw = ((w as f32 * s).round() as u32).max(1);
    let nh = ((h as f32 * s).round() as u32).max(1);
    let small = image::imageops::resize(&gray, nw, nh, FilterType::Triangle);
    (small, w as f32 / nw as f32)
}

/// Map a point found in a downscaled image back to full resolution
/// (pixel centres on integers in both).
#[inline]
pub fn upscale_point(p: Point2<f32>, factor: f32) -> Point2<f32> {
    Point2::new((p.x + 0.5) * factor - 0.5, (p.y + 0.5) * factor - 0.5)
}

pub fn blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(gray, sigma)
    } else {
        gray.clone()
    }
}

/// Canny edges, optionally thickened to close small gaps in the outline.
pub fn edge_map(gray: &GrayImage, low: f32, high: f32, dilate_radius: u8) -> GrayImage {
    let edges = imageproc::edges::canny(gray, low, high);
    if dilate_radius == 0 {
        return edges;
    }
    imageproc::morphology::dilate(&edges, Norm::LInf, dilate_radius)
}

/// Local-mean threshold over a `(2r+1)²` box, computed with an integral
/// image.
///
/// With `dark` a pixel is foreground when it is more than `offset` below
/// its neighbourhood mean; otherwise when it is more than `offset` above.
/// On a board that contrasts with the table this leaves a thin ring along
/// the outline on one side or the other.
pub fn adaptive_threshold(gray: &GrayImage, radius: u32, offset: f32, dark: bool) -> GrayImage {
    let (w, h) = gray.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let stride = wu + 1;
    let mut integral = vec![0u64; stride * (hu + 1)];
    for y in 0..hu {
        let mut row = 0u64;
        for x in 0..wu {
            row += gray.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row;
        }
    }

    let r = radius as i64;
    let mut out = GrayImage::new(w, h);
    for y in 0..hu {
        let y0 = (y as i64 - r).max(0) as usize;
        let y1 = (y as i64 + r + 1).min(hu as i64) as usize;
        for x in 0..wu {
            let x0 = (x as i64 - r).max(0) as usize;
            let x1 = (x as i64 + r + 1).min(wu as i64) as usize;
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let area = ((x1 - x0) * (y1 - y0)) as f32;
            let mean = sum as f32 / area;
            let v = gray.get_pixel(x as u32, y as u32)[0] as f32;
            let fg = if dark { v < mean - offset } else { v > mean + offset };
            if fg {
                out.put_pixel(x as u32, y as u32, FG);
            }
        }
    }
    out
}

/// Otsu threshold of the whole image.
pub fn otsu_level(gray: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[p[0] as usize] += 1;
    }
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 127;
    }
    let occupied: Vec<usize> = (0..256).filter(|&i| hist[i] > 0).collect();
    match occupied.as_slice() {
        [only] => return *only as u8,
        [lo, hi] => return ((lo + hi) / 2) as u8,
        _ => {}
    }

    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum();
    let (mut w_b, mut sum_b) = (0f64, 0f64);
    let (mut best_var, mut best_t) = (-1f64, 127u8);
    for (t, &n) in hist.iter().enumerate() {
        w_b += n as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total as f64 - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * n as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var > best_var {
            best_var = var;
            best_t = t as u8;
        }
    }
    best_t
}

/// Binary map of pixels above (`bright`) or at/below `level`.
pub fn threshold(gray: &GrayImage, level: u8, bright: bool) -> GrayImage {
    let kind = if bright {
        ThresholdType::Binary
    } else {
        ThresholdType::BinaryInverted
    };
    imageproc::contrast::threshold(gray, level, kind)
}

/// Outer border of a top-level foreground region.
#[derive(Clone, Debug)]
pub struct OutlineCandidate {
    pub points: Vec<Point2<f32>>,
    pub area: f32,
    /// `[min_x, min_y, max_x, max_y]` in pixels.
    pub bounds: [f32; 4],
}

/// Largest top-level outer contour that does not touch the image border.
pub fn largest_outer_contour(mask: &GrayImage) -> Option<OutlineCandidate> {
    let (w, h) = mask.dimensions();
    let max_x = w.saturating_sub(1) as f32;
    let max_y = h.saturating_sub(1) as f32;

    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            if c.points.len() < 6 {
                return None;
            }
            let points: Vec<Point2<f32>> = c
                .points
                .iter()
                .map(|p| Point2::new(p.x as f32, p.y as f32))
                .collect();
            let bounds = points.iter().fold(
                [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
                |b, p| [b[0].min(p.x), b[1].min(p.y), b[2].max(p.x), b[3].max(p.y)],
            );
            if bounds[0] <= 0.0 || bounds[1] <= 0.0 || bounds[2] >= max_x || bounds[3] >= max_y {
                return None;
            }
            let area = signed_area(&points).abs();
            Some(OutlineCandidate {
                points,
                area,
                bounds,
            })
        })
        .max_by(|a, b| a.area.total_cmp(&b.area))
}

/// Morphological opening (erode, then dilate) with a square kernel.
pub fn open(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    imageproc::morphology::open(mask, Norm::LInf, radius)
}

/// Morphological closing (dilate, then erode) with a square kernel.
pub fn close(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    imageproc::morphology::close(mask, Norm::LInf, radius)
}

/// One 8-connected foreground region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Component {
    pub area: u32,
    pub centroid: Point2<f32>,
}

pub fn connected_components(mask: &GrayImage) -> Vec<Component> {
    let labels = imageproc::region_labelling::connected_components(mask, Connectivity::Eight, BG);
    let mut acc: Vec<(u32, f64, f64)> = Vec::new();
    for (x, y, l) in labels.enumerate_pixels() {
        let l = l[0] as usize;
        if l == 0 {
            continue;
        }
        if acc.len() < l {
            acc.resize(l, (0, 0.0, 0.0));
        }
        let e = &mut acc[l - 1];
        e.0 += 1;
        e.1 += x as f64;
        e.2 += y as f64;
    }
    acc.into_iter()
        .filter(|e| e.0 > 0)
        .map(|(n, sx, sy)| Component {
            area: n,
            centroid: Point2::new((sx / n as f64) as f32, (sy / n as f64) as f32),
        })
        .collect()
}

/// Binary mask of `poly` filled at integer pixel positions.
pub fn polygon_mask(width: u32, height: u32, poly: &[Point2<f32>]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let mut pts: Vec<Point<i32>> = poly
        .iter()
        .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
        .collect();
    pts.dedup();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() >= 3 {
        draw_polygon_mut(&mut mask, &pts, FG);
    }
    mask
}

/// Pixel-wise AND of two equally sized masks.
pub fn mask_and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let on = a.get_pixel(x, y)[0] > 0
            && x < b.width()
            && y < b.height()
            && b.get_pixel(x, y)[0] > 0;
        if on {
            FG
        } else {
            BG
        }
    })
}
