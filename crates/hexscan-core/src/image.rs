/// Buffer validation errors for raw RGB frames.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageBufferError {
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("invalid RGB buffer length (expected {expected} bytes, got {got})")]
    InvalidLength { expected: usize, got: usize },
}

/// Borrowed, tightly packed RGB8 image.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h*3
}

impl<'a> RgbImageView<'a> {
    /// Wrap a raw camera buffer after checking its length.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageBufferError> {
        if width == 0 || height == 0 {
            return Err(ImageBufferError::InvalidDimensions { width, height });
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or(ImageBufferError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageBufferError::InvalidLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Pixel at integer coordinates, `None` outside the image.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        if !self.contains(x, y) {
            return None;
        }
        let idx = (y as usize * self.width + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }
}

/// Owned RGB8 image (camera frame or aligned raster).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width * height * 3],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageBufferError> {
        RgbImageView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.width + x) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }
}

/// One frame handed out by a camera source.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbImage,
    /// Capture time in milliseconds on the source's clock.
    pub timestamp_ms: u64,
}

#[inline]
fn get_rgb(src: &RgbImageView<'_>, x: i32, y: i32) -> [f32; 3] {
    match src.pixel(x, y) {
        Some([r, g, b]) => [r as f32, g as f32, b as f32],
        None => [0.0; 3],
    }
}

/// Bilinear RGB sample; pixels outside the image read as black.
#[inline]
pub fn sample_bilinear_rgb(src: &RgbImageView<'_>, x: f32, y: f32) -> [f32; 3] {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = a + fy * (b - a);
    }
    out
}

#[inline]
pub fn sample_bilinear_rgb_u8(src: &RgbImageView<'_>, x: f32, y: f32) -> [u8; 3] {
    sample_bilinear_rgb(src, x, y).map(|v| v.round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffers() {
        let data = vec![0u8; 10];
        let err = RgbImageView::new(2, 2, &data).unwrap_err();
        assert_eq!(
            err,
            ImageBufferError::InvalidLength {
                expected: 12,
                got: 10
            }
        );
        assert!(RgbImageView::new(0, 4, &[]).is_err());
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, [0, 100, 200]);
        img.put_pixel(1, 0, [100, 200, 0]);
        let s = sample_bilinear_rgb(&img.view(), 0.5, 0.0);
        assert!((s[0] - 50.0).abs() < 1e-4);
        assert!((s[1] - 150.0).abs() < 1e-4);
        assert!((s[2] - 100.0).abs() < 1e-4);
    }
}
