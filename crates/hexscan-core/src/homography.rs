use crate::{sample_bilinear_rgb_u8, RgbImage, RgbImageView};
use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Planar projective transform `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Pure scale + translation: `dst = s * src + t`.
    pub fn scale_translate(s: f64, tx: f64, ty: f64) -> Self {
        Self::new(Matrix3::new(s, 0.0, tx, 0.0, s, ty, 0.0, 0.0, 1.0))
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    /// Projective depth `w` of `p`; its sign tells on which side of the
    /// horizon line the point lands.
    #[inline]
    pub fn depth(&self, p: Point2<f32>) -> f64 {
        self.h[(2, 0)] * p.x as f64 + self.h[(2, 1)] * p.y as f64 + self.h[(2, 2)]
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Compose: `(self ∘ other)(p) = self(other(p))`.
    pub fn compose(&self, other: &Homography) -> Self {
        Self::new(self.h * other.h)
    }

    /// Determinant of `H` scaled so that `|H|_F = 1`. Values near zero mark
    /// a (nearly) rank-deficient transform.
    pub fn normalized_determinant(&self) -> f64 {
        let norm = self.h.norm();
        if norm < 1e-300 {
            return 0.0;
        }
        (self.h / norm).determinant()
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

// Hartley normalization: translate to centroid, scale so mean distance = sqrt(2).
fn normalize_points(pts: &[Point2<f32>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len().max(1) as f64;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mean_dist = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / n;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

/// Estimate `H` such that `dst ~ H * src` from four or more correspondences.
///
/// Exactly four points go through the closed-form solve, more points through
/// a normalized DLT (smallest right singular vector).
pub fn estimate_homography(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    if src.len() == 4 {
        let s: &[Point2<f32>; 4] = src.try_into().ok()?;
        let d: &[Point2<f32>; 4] = dst.try_into().ok()?;
        return homography_from_4pt(s, d);
    }

    let (s, ts) = normalize_points(src);
    let (d, td) = normalize_points(dst);

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let (x, y) = (s[k].x, s[k].y);
        let (u, v) = (d[k].x, d[k].y);

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // A^T A is 9x9 regardless of N, so the SVD always yields a full V^T.
    let ata = a.transpose() * &a;
    let svd = ata.svd(false, true);
    let vt = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = vt.row(min_idx);

    let hn =
        Matrix3::<f64>::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    let h_den = denormalize_homography(hn, ts, td)?;
    let h_den = normalize_homography(h_den)?;
    Some(Homography::new(h_den))
}

/// Compute `H` such that `dst ~ H * src` from exactly four correspondences.
///
/// Corner order must be consistent between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
    let (src_n, t_src) = normalize_points(src);
    let (dst_n, t_dst) = normalize_points(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    let h_den = denormalize_homography(hn, t_src, t_dst)?;
    let h_den = normalize_homography(h_den)?;
    Some(Homography::new(h_den))
}

/// Warp into an `out_w × out_h` raster: every destination pixel is mapped
/// through `h_src_from_dst` and bilinearly sampled in `src`.
///
/// Pixel centers sit on integer coordinates in both images.
pub fn warp_perspective_rgb(
    src: &RgbImageView<'_>,
    h_src_from_dst: &Homography,
    out_w: usize,
    out_h: usize,
) -> RgbImage {
    let mut out = RgbImage::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let ps = h_src_from_dst.apply(Point2::new(x as f32, y as f32));
            out.put_pixel(x, y, sample_bilinear_rgb_u8(src, ps.x, ps.y));
        }
    }
    out
}
