//! The raster backend: raw interleaved pixel buffers behind a fixed
//! capability list.
//!
//! Decoded images are stored as 8-bit interleaved BGR, the backend's native
//! channel order. Every exchange with the dynamic backend swizzles
//! explicitly; nothing here reinterprets another backend's storage in place.
//!
//! JPEG decoding goes through `jpeg-decoder` (with grayscale expansion and
//! CMYK rejection); the remaining raster formats go through the codec layer
//! of the `image` crate, driven by tag rather than by its registry.

use std::fmt;
use std::io::Cursor;

use image::ImageEncoder as _;
use imgref::ImgVec;
use rgb::alt::BGR8;

use crate::format::FormatTag;

/// Diagnostic codes attached to raster backend failures.
pub mod codes {
    /// Input buffer was empty.
    pub const EMPTY_INPUT: i32 = 1;
    /// Input bytes were malformed for the claimed format.
    pub const DECODE_MALFORMED: i32 = 2;
    /// Format or pixel layout the backend does not handle.
    pub const UNSUPPORTED: i32 = 3;
    /// Encoder rejected the operation.
    pub const ENCODE_FAILED: i32 = 4;
}

/// Failure raised by the raster codec layer.
///
/// Unlike the dynamic backend, raster failures always carry a numeric
/// diagnostic code alongside the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterError {
    /// Diagnostic code from [`codes`].
    pub code: i32,
    /// Diagnostic text, preserved verbatim by the normalizer.
    pub message: String,
}

impl RasterError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for RasterError {}

/// Decoded raster owned by the raster backend.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: ImgVec<BGR8>,
}

impl RasterImage {
    /// Wrap an interleaved RGB8 buffer, swizzling into the backend's native
    /// BGR storage order.
    #[must_use]
    pub fn from_rgb8(data: &[u8], width: usize, height: usize) -> Self {
        let pixels: Vec<BGR8> = data
            .chunks_exact(3)
            .map(|px| BGR8 {
                b: px[2],
                g: px[1],
                r: px[0],
            })
            .collect();
        Self {
            pixels: ImgVec::new(pixels, width, height),
        }
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// True when the buffer holds no pixel data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Raw matrix storage: interleaved BGR bytes, row-major.
    #[must_use]
    pub fn bgr_bytes(&self) -> Vec<u8> {
        self.pixels
            .pixels()
            .flat_map(|px| [px.b, px.g, px.r])
            .collect()
    }

    /// Interleaved RGB bytes, swizzled out of native storage. Used at every
    /// boundary where the other backend's channel order is required.
    pub(crate) fn rgb_bytes(&self) -> Vec<u8> {
        self.pixels
            .pixels()
            .flat_map(|px| [px.r, px.g, px.b])
            .collect()
    }
}

/// Parameters for a raster encode. Quality applies to JPEG-family targets.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EncodeParams {
    pub quality: u8,
}

/// True when the raster backend can encode the given tag.
pub(crate) fn can_encode(tag: FormatTag) -> bool {
    matches!(
        tag,
        FormatTag::Jpeg | FormatTag::Png | FormatTag::Bmp | FormatTag::Tiff | FormatTag::Pnm
    )
}

/// Decode raw bytes into a pixel buffer.
pub(crate) fn decode(data: &[u8], tag: FormatTag) -> Result<RasterImage, RasterError> {
    if data.is_empty() {
        return Err(RasterError::new(codes::EMPTY_INPUT, "empty input buffer"));
    }
    match tag {
        FormatTag::Jpeg => decode_jpeg(data),
        _ => decode_via_codec(data, tag),
    }
}

fn decode_jpeg(data: &[u8]) -> Result<RasterImage, RasterError> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(data));
    let pixels = decoder
        .decode()
        .map_err(|e| RasterError::new(codes::DECODE_MALFORMED, e.to_string()))?;
    let info = decoder.info().ok_or_else(|| {
        RasterError::new(codes::DECODE_MALFORMED, "missing JPEG info after decode")
    })?;

    let width = info.width as usize;
    let height = info.height as usize;

    let rgb = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => pixels,
        jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&g| [g, g, g]).collect(),
        jpeg_decoder::PixelFormat::L16 => {
            // 16-bit grayscale: take the high byte
            pixels
                .chunks_exact(2)
                .flat_map(|c| {
                    let g = c[0];
                    [g, g, g]
                })
                .collect()
        }
        jpeg_decoder::PixelFormat::CMYK32 => {
            return Err(RasterError::new(
                codes::UNSUPPORTED,
                "CMYK JPEGs are not supported",
            ));
        }
    };

    Ok(RasterImage::from_rgb8(&rgb, width, height))
}

fn decode_via_codec(data: &[u8], tag: FormatTag) -> Result<RasterImage, RasterError> {
    let fmt = tag.to_image_format().ok_or_else(|| {
        RasterError::new(
            codes::UNSUPPORTED,
            format!("raster backend cannot decode {tag:?}"),
        )
    })?;
    let decoded = image::load_from_memory_with_format(data, fmt)
        .map_err(|e| RasterError::new(codes::DECODE_MALFORMED, e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(RasterImage::from_rgb8(
        rgb.as_raw(),
        width as usize,
        height as usize,
    ))
}

/// Encode a pixel buffer into an in-memory byte buffer.
pub(crate) fn encode(
    image: &RasterImage,
    tag: FormatTag,
    params: EncodeParams,
) -> Result<Vec<u8>, RasterError> {
    if image.is_empty() {
        return Err(RasterError::new(codes::EMPTY_INPUT, "no pixel data to encode"));
    }

    let rgb = image.rgb_bytes();
    let width = image.width() as u32;
    let height = image.height() as u32;
    let color = image::ExtendedColorType::Rgb8;
    let mut out = Cursor::new(Vec::new());

    let encode_err = |e: image::ImageError| RasterError::new(codes::ENCODE_FAILED, e.to_string());

    match tag {
        FormatTag::Jpeg => {
            // the encoder's valid range starts at 1
            let quality = params.quality.max(1);
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality)
                .write_image(&rgb, width, height, color)
                .map_err(encode_err)?;
        }
        FormatTag::Png => {
            image::codecs::png::PngEncoder::new(&mut out)
                .write_image(&rgb, width, height, color)
                .map_err(encode_err)?;
        }
        FormatTag::Bmp => {
            image::codecs::bmp::BmpEncoder::new(&mut out)
                .write_image(&rgb, width, height, color)
                .map_err(encode_err)?;
        }
        FormatTag::Tiff => {
            image::codecs::tiff::TiffEncoder::new(&mut out)
                .write_image(&rgb, width, height, color)
                .map_err(encode_err)?;
        }
        FormatTag::Pnm => {
            image::codecs::pnm::PnmEncoder::new(&mut out)
                .write_image(&rgb, width, height, color)
                .map_err(encode_err)?;
        }
        FormatTag::Gif | FormatTag::WebP | FormatTag::Unknown => {
            return Err(RasterError::new(
                codes::UNSUPPORTED,
                format!("raster backend cannot encode {tag:?}"),
            ));
        }
    }

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard_rgb(width: usize, height: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v / 2, 255 - v]);
            }
        }
        data
    }

    #[test]
    fn test_bgr_storage_round_trips_swizzle() {
        let rgb = vec![10, 20, 30, 40, 50, 60];
        let img = RasterImage::from_rgb8(&rgb, 2, 1);
        assert_eq!(img.rgb_bytes(), rgb);
        assert_eq!(img.bgr_bytes(), vec![30, 20, 10, 60, 50, 40]);
    }

    #[test]
    fn test_empty_input_rejected_with_code() {
        let err = decode(&[], FormatTag::Png).unwrap_err();
        assert_eq!(err.code, codes::EMPTY_INPUT);
    }

    #[test]
    fn test_malformed_bytes_rejected_with_code() {
        let err = decode(&[0xde, 0xad, 0xbe, 0xef], FormatTag::Jpeg).unwrap_err();
        assert_eq!(err.code, codes::DECODE_MALFORMED);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_png_encode_decode_preserves_pixels() {
        let rgb = checkerboard_rgb(8, 6);
        let img = RasterImage::from_rgb8(&rgb, 8, 6);
        let bytes = encode(&img, FormatTag::Png, EncodeParams { quality: 100 }).unwrap();
        let back = decode(&bytes, FormatTag::Png).unwrap();
        assert_eq!(back.width(), 8);
        assert_eq!(back.height(), 6);
        assert_eq!(back.rgb_bytes(), rgb);
    }

    #[test]
    fn test_jpeg_encode_then_jpeg_decoder_path() {
        let rgb = checkerboard_rgb(16, 16);
        let img = RasterImage::from_rgb8(&rgb, 16, 16);
        let bytes = encode(&img, FormatTag::Jpeg, EncodeParams { quality: 75 }).unwrap();
        let back = decode(&bytes, FormatTag::Jpeg).unwrap();
        assert_eq!(back.width(), 16);
        assert_eq!(back.height(), 16);
        assert!(!back.is_empty());
    }

    #[test]
    fn test_unencodable_tag_rejected() {
        let img = RasterImage::from_rgb8(&checkerboard_rgb(4, 4), 4, 4);
        let err = encode(&img, FormatTag::Gif, EncodeParams { quality: 75 }).unwrap_err();
        assert_eq!(err.code, codes::UNSUPPORTED);
    }
}
