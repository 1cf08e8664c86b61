//! Decoded frames as something the rasterizer can sample.

use image::GrayImage;

use crate::config::FrameFormat;
use crate::error::{Error, Result};

/// A pixel-addressable grayscale image.
pub trait Raster {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Luminance in 0..=255 at `(x, y)`, with `x < width` and `y < height`.
    fn luminance(&self, x: u32, y: u32) -> u8;
}

impl Raster for GrayImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn luminance(&self, x: u32, y: u32) -> u8 {
        self.get_pixel(x, y)[0]
    }
}

/// Turns the bytes of one complete encoded image into a raster.
pub trait FrameDecoder {
    type Output: Raster;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Output>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder {
    format: FrameFormat,
}

impl ImageDecoder {
    pub fn new(format: FrameFormat) -> Self {
        Self { format }
    }
}

impl FrameDecoder for ImageDecoder {
    type Output = GrayImage;

    fn decode(&self, bytes: &[u8]) -> Result<GrayImage> {
        let img = image::load_from_memory_with_format(bytes, self.format.image_format())
            .map_err(|e| Error::decode(format!("{} bytes of {:?} data: {}", bytes.len(), self.format, e)))?;
        Ok(img.to_luma8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn png_bytes(img: GrayImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img).write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_to_grayscale() {
        let img = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let decoded = ImageDecoder::new(FrameFormat::Png).decode(&png_bytes(img)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
        assert_eq!(decoded.luminance(3, 2), 32);
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        let mut bytes = crate::scanner::PNG_MARKERS.start.to_vec();
        bytes.extend_from_slice(b"not really a png");
        bytes.extend_from_slice(crate::scanner::PNG_MARKERS.end);
        let err = ImageDecoder::default().decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(_)));
    }
}
