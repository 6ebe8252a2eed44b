#![allow(dead_code)]

use hexscan::board::{BoardLayout, BoardSpec};
use hexscan::core::{contains_point, homography_from_4pt, Homography, Point2};
use hexscan::localize::CanonicalFrame;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;

pub const MAGENTA: [u8; 3] = [233, 30, 99];
pub const YELLOW: [u8; 3] = [255, 235, 59];
pub const BLUE: [u8; 3] = [33, 150, 243];

const W: u32 = 640;
const H: u32 = 480;

pub fn layout() -> BoardLayout {
    BoardLayout::new(BoardSpec::default()).unwrap()
}

/// Canonical raster (400 px, the default) → frame: board centred, 0.9x.
pub fn img_from_raster() -> Homography {
    Homography::scale_translate(0.9, 319.5 - 0.9 * 199.5, 239.5 - 0.9 * 199.5)
}

/// Light board on a dark table with a disk at each `(sample index, color)`.
pub fn render_board(pieces: &[(usize, [u8; 3])]) -> RgbImage {
    let layout = layout();
    let canonical = CanonicalFrame::new(&layout, 400);
    let h = img_from_raster();
    let to_frame = |mm: Point2<f32>| h.apply(canonical.board_to_pixel(mm));

    let mut img = RgbImage::from_pixel(W, H, Rgb([60, 55, 50]));
    let outline: Vec<Point<i32>> = canonical
        .outline_px()
        .iter()
        .map(|&p| {
            let q = h.apply(p);
            Point::new(q.x.round() as i32, q.y.round() as i32)
        })
        .collect();
    draw_polygon_mut(&mut img, &outline, Rgb([225, 220, 210]));

    let radius_px = layout.spec().marker_diameter_mm * 0.5 * canonical.px_per_mm() * 0.9;
    let r = (radius_px * 0.85).round() as i32;
    let points = layout.sample_points();
    for &(i, rgb) in pieces {
        let c = to_frame(points[i].point());
        draw_filled_circle_mut(&mut img, (c.x.round() as i32, c.y.round() as i32), r, Rgb(rgb));
    }
    img
}

/// Five magenta and three yellow pieces on distinct sample points.
pub fn five_magenta_three_yellow_pieces() -> Vec<(usize, [u8; 3])> {
    let mut pieces: Vec<(usize, [u8; 3])> =
        [3, 9, 17, 30, 44].iter().map(|&i| (i, MAGENTA)).collect();
    pieces.extend([6, 25, 50].iter().map(|&i| (i, YELLOW)));
    pieces
}

pub fn five_magenta_three_yellow() -> RgbImage {
    render_board(&five_magenta_three_yellow_pieces())
}

/// Canonical raster → frame with keystone and a slight roll.
pub fn tilted_img_from_raster() -> Homography {
    let raster = [
        Point2::new(0.0, 0.0),
        Point2::new(399.0, 0.0),
        Point2::new(399.0, 399.0),
        Point2::new(0.0, 399.0),
    ];
    let frame = [
        Point2::new(150.0, 40.0),
        Point2::new(500.0, 70.0),
        Point2::new(520.0, 440.0),
        Point2::new(130.0, 420.0),
    ];
    homography_from_4pt(&raster, &frame).unwrap()
}

/// Same scene as [`render_board`] seen through `img_from_raster`, rendered
/// by mapping every frame pixel back into the canonical raster.
pub fn render_through(img_from_raster: &Homography, pieces: &[(usize, [u8; 3])]) -> RgbImage {
    let layout = layout();
    let canonical = CanonicalFrame::new(&layout, 400);
    let raster_from_img = img_from_raster.inverse().unwrap();
    let outline = canonical.outline_px();

    let r = layout.spec().marker_diameter_mm * 0.5 * canonical.px_per_mm() * 0.85;
    let points = layout.sample_points();
    let disks: Vec<(Point2<f32>, [u8; 3])> = pieces
        .iter()
        .map(|&(i, rgb)| (canonical.board_to_pixel(points[i].point()), rgb))
        .collect();

    RgbImage::from_fn(W, H, |x, y| {
        let q = raster_from_img.apply(Point2::new(x as f32, y as f32));
        if !contains_point(&outline, q) {
            return Rgb([60, 55, 50]);
        }
        disks
            .iter()
            .find(|(c, _)| (q - c).norm() <= r)
            .map_or(Rgb([225, 220, 210]), |&(_, rgb)| Rgb(rgb))
    })
}
