//! The dynamic backend: polymorphic codec objects and a runtime format
//! registry.
//!
//! This backend owns decoded images as [`image::DynamicImage`] values and
//! answers capability questions by querying the codec registry at call time,
//! filtered to coders that are simultaneously readable and writable.
//! Multi-frame capability is not a deciding factor.
//!
//! Decode can succeed with a non-fatal warning: a container that does not
//! match the claimed format, or a channel layout other than 8-bit RGB/RGBA.
//! Warnings never invalidate the decoded object.

use std::io::Cursor;

use image::{ColorType, DynamicImage, ImageError, ImageFormat, ImageReader};
use image::ImageEncoder as _;

/// Native image object owned by the dynamic backend, together with the
/// container format the object currently claims.
#[derive(Debug, Clone)]
pub struct CodecImage {
    pub(crate) image: DynamicImage,
    pub(crate) format: ImageFormat,
}

impl CodecImage {
    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The container format the object currently claims.
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

/// Non-fatal decode diagnostics. The decoded object remains usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeWarning {
    /// The container did not match the claimed format; decoded under the
    /// detected one.
    FormatMismatch,
    /// Channel layout other than 8-bit RGB/RGBA; converted on encode.
    ChannelType,
}

/// Snapshot of registry entries that are simultaneously readable and
/// writable. Multi-frame support is not consulted.
#[must_use]
pub fn registry_formats() -> Vec<ImageFormat> {
    ImageFormat::all()
        .filter(|f| f.reading_enabled() && f.writing_enabled())
        .collect()
}

/// Find the readable-and-writable registry entry for an extension.
///
/// Matching is case-insensitive and exact against every registered
/// extension, never substring containment.
pub(crate) fn registry_lookup(ext: &str) -> Option<ImageFormat> {
    if ext.is_empty() {
        return None;
    }
    let lower = ext.to_ascii_lowercase();
    ImageFormat::all()
        .filter(|f| f.reading_enabled() && f.writing_enabled())
        .find(|f| f.extensions_str().iter().any(|e| *e == lower))
}

/// Decode raw bytes into a native image object.
///
/// The container is sniffed from the bytes; when it disagrees with
/// `claimed` the decode proceeds under the detected format and reports a
/// [`DecodeWarning::FormatMismatch`].
pub(crate) fn decode(
    data: &[u8],
    claimed: ImageFormat,
) -> Result<(CodecImage, Option<DecodeWarning>), ImageError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let (image, actual, mismatch) = match reader.format() {
        Some(detected) => (reader.decode()?, detected, detected != claimed),
        // Sniffing failed; trust the caller's claim.
        None => (
            image::load_from_memory_with_format(data, claimed)?,
            claimed,
            false,
        ),
    };

    let warning = if mismatch {
        Some(DecodeWarning::FormatMismatch)
    } else if !matches!(image.color(), ColorType::Rgb8 | ColorType::Rgba8) {
        Some(DecodeWarning::ChannelType)
    } else {
        None
    };

    Ok((CodecImage { image, format: actual }, warning))
}

/// Encode a native image object to an in-memory byte buffer.
///
/// Quality applies to JPEG targets; other coders use their own defaults.
/// JPEG cannot carry alpha, so that path flattens to RGB first.
pub(crate) fn encode(
    img: &CodecImage,
    target: ImageFormat,
    quality: u8,
) -> Result<Vec<u8>, ImageError> {
    let mut out = Cursor::new(Vec::new());
    match target {
        ImageFormat::Jpeg => {
            // the encoder's valid range starts at 1
            let quality = quality.max(1);
            let rgb = img.image.to_rgb8();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )?;
        }
        _ => img.image.write_to(&mut out, target)?,
    }
    Ok(out.into_inner())
}

/// Serialize the object to bytes in its currently claimed format.
pub(crate) fn to_bytes(img: &CodecImage) -> Result<Vec<u8>, ImageError> {
    // Serialization, not requantization: highest quality when the claimed
    // format is lossy.
    encode(img, img.format, 100)
}
