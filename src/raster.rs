use std::borrow::Cow;

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ImageResult, RgbImage, RgbaImage};

use thiserror::Error;

use crate::config::{OutputFormat, Sizing};

pub const JPEG_QUALITY: u8 = 75;

/// Largest width or height a resized image may have
pub const MAX_DIMENSION: u32 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("resized image would be {width}x{height}, larger than {MAX_DIMENSION} pixels on a side")]
pub struct TooLarge {
    pub width: u64,
    pub height: u64,
}

/// Bilinear resize to an exact size
pub fn resize(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Make an image `factor` times smaller in both dimensions, never below 1x1.
/// A factor below 1 enlarges it, up to [`MAX_DIMENSION`].
pub fn scale_down(image: &RgbaImage, factor: f32) -> Result<RgbaImage, TooLarge> {
    let scaled = |side: u32| (f64::from(side) / f64::from(factor)).max(1.0) as u64;
    let (width, height) = checked_size(scaled(image.width()), scaled(image.height()))?;
    Ok(resize(image, width, height))
}

fn checked_size(width: u64, height: u64) -> Result<(u32, u32), TooLarge> {
    let limit = u64::from(MAX_DIMENSION);
    if width > limit || height > limit {
        return Err(TooLarge { width, height });
    }
    // Both fit after the check above
    Ok((width as u32, height as u32))
}

pub fn apply_sizing(image: &RgbaImage, sizing: Sizing) -> Result<Cow<'_, RgbaImage>, TooLarge> {
    Ok(match sizing {
        Sizing::Original => Cow::Borrowed(image),
        Sizing::Exact(size) => {
            let (width, height) = checked_size(size.width.into(), size.height.into())?;
            Cow::Owned(resize(image, width, height))
        }
        Sizing::ScaleDown(factor) => Cow::Owned(scale_down(image, factor)?),
    })
}

/// Encode an image into the bytes of an image file
pub fn encode(image: &RgbaImage, format: OutputFormat) -> ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut bytes))?,
        OutputFormat::Jpg | OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb: RgbImage = image.convert();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))?;
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Size;
    use image::{ImageFormat, Rgba};

    fn sample(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]))
    }

    #[test]
    fn test_resize_exact() {
        let out = resize(&sample(100, 50), 20, 40);
        assert_eq!(out.dimensions(), (20, 40));
    }

    #[test]
    fn test_scale_down() {
        assert_eq!(scale_down(&sample(100, 50), 10.0).unwrap().dimensions(), (10, 5));
        assert_eq!(scale_down(&sample(100, 50), 2.5).unwrap().dimensions(), (40, 20));
    }

    #[test]
    fn test_scale_down_never_empty() {
        assert_eq!(scale_down(&sample(4, 4), 100.0).unwrap().dimensions(), (1, 1));
    }

    #[test]
    fn test_tiny_factor_is_an_error_not_a_panic() {
        let err = scale_down(&sample(100, 50), 1e-9).unwrap_err();
        assert!(err.width > u64::from(MAX_DIMENSION));
        assert!(apply_sizing(&sample(100, 50), Sizing::ScaleDown(1e-9)).is_err());
    }

    #[test]
    fn test_oversized_exact_size_rejected() {
        let sizing = Sizing::Exact(Size {
            width: MAX_DIMENSION + 1,
            height: 10,
        });
        assert_eq!(
            apply_sizing(&sample(10, 10), sizing).unwrap_err(),
            TooLarge {
                width: u64::from(MAX_DIMENSION) + 1,
                height: 10
            }
        );
    }

    #[test]
    fn test_apply_sizing() {
        let image = sample(30, 30);
        assert!(matches!(
            apply_sizing(&image, Sizing::Original),
            Ok(Cow::Borrowed(_))
        ));
        let exact = apply_sizing(
            &image,
            Sizing::Exact(Size {
                width: 5,
                height: 6,
            }),
        )
        .unwrap();
        assert_eq!(exact.dimensions(), (5, 6));
        assert_eq!(
            apply_sizing(&image, Sizing::ScaleDown(3.0)).unwrap().dimensions(),
            (10, 10)
        );
    }

    #[test]
    fn test_encode_png() {
        let bytes = encode(&sample(8, 8), OutputFormat::Png).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn test_encode_jpeg() {
        for format in [OutputFormat::Jpg, OutputFormat::Jpeg] {
            let bytes = encode(&sample(16, 8), format).unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (16, 8));
        }
    }
}
