use std::path::Path;

use hexscan_core::{ImageBufferError, RgbImageView};
use hexscan_localize::AlignedRaster;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::scanner::{CaptureError, ScanResult, Scanner};

/// Errors produced by the `image`-crate helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error(transparent)]
    Buffer(#[from] ImageBufferError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Borrow an `image::RgbImage` as the lightweight view type.
pub fn rgb_view(img: &::image::RgbImage) -> Result<RgbImageView<'_>, DetectError> {
    Ok(RgbImageView::new(
        img.width() as usize,
        img.height() as usize,
        img.as_raw(),
    )?)
}

/// Decode any supported image file to RGB8.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<::image::RgbImage, DetectError> {
    Ok(::image::ImageReader::open(path)
        .map_err(::image::ImageError::IoError)?
        .decode()?
        .to_rgb8())
}

/// Copy an aligned raster into an `image::RgbImage`, e.g. for saving.
pub fn raster_to_image(raster: &AlignedRaster) -> Result<::image::RgbImage, DetectError> {
    let (w, h) = (raster.image.width, raster.image.height);
    ::image::RgbImage::from_raw(w as u32, h as u32, raster.image.data.clone()).ok_or(
        DetectError::Buffer(ImageBufferError::InvalidLength {
            expected: w * h * 3,
            got: raster.image.data.len(),
        }),
    )
}

/// Localize and analyse a still image. The still is treated as a frozen
/// capture frame: the detection gate is not consulted.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(scanner, img),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn scan_image(
    scanner: &mut Scanner,
    img: &::image::RgbImage,
) -> Result<ScanResult, DetectError> {
    let view = rgb_view(img)?;
    let state = scanner.tick(&view, 0);
    log::debug!("still image detection state {state:?}");
    Ok(scanner.analyze(&view, 0)?)
}
