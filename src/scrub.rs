//! The recompression engine: deterministic lossy re-encodes that destroy
//! low-order-bit payloads.
//!
//! Every successful encode replaces the image's payload with a freshly
//! decoded copy of the bytes it just produced, so the surviving pixels are
//! always the requantized ones — an encoded buffer is never kept alongside
//! its un-requantized source. When the holding backend cannot write the
//! target format the payload crosses to the other backend, and that crossing
//! happens only through an encoded byte buffer (lossless PNG intermediate),
//! never by reinterpreting the other backend's storage in place.

use crate::backend::dynamic;
use crate::backend::raster::{self, EncodeParams, RasterError};
use crate::backend::{CodecImage, RasterImage};
use crate::error::{Error, NormalizedError, Result};
use crate::format::{FormatPair, FormatTag};
use crate::unified::{Payload, UnifiedImage};

/// Named quality presets for the scrub profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Aggressive requantization, quality 50.
    Low,
    /// The standard scrub setting, quality 75.
    #[default]
    Default,
    /// Gentlest setting, quality 100.
    High,
}

impl CompressionLevel {
    /// The JPEG quality value for this preset.
    #[must_use]
    pub fn quality(self) -> u8 {
        match self {
            Self::Low => 50,
            Self::Default => 75,
            Self::High => 100,
        }
    }
}

/// Descending quality ladder used by the default sweep.
pub const DEFAULT_QUALITY_SWEEP: [u8; 11] = [100, 90, 80, 70, 60, 50, 40, 30, 20, 10, 0];

/// One artifact produced by a sweep step.
#[derive(Debug, Clone)]
pub struct SweepArtifact {
    /// Quality the step encoded at.
    pub quality: u8,
    /// The encoded bytes for this step.
    pub data: Vec<u8>,
}

/// Re-encode an image to `target` at the given quality.
///
/// On success the payload is replaced with the requantized decode of the
/// produced bytes, the claimed format becomes `target`, any prior status is
/// cleared, and the encoded bytes are returned for the caller's writer. On
/// failure the payload and format are left untouched and the normalized
/// error is recorded on the image.
///
/// A [`Payload::Raw`] image fails fast with [`Error::Unencodable`]: no
/// backend ever validated those bytes, so no backend call is attempted.
pub fn encode(image: &mut UnifiedImage, target: FormatPair, quality: u8) -> Result<Vec<u8>> {
    let outcome = if quality > 100 {
        // recorded on the image like any other failure, so batch
        // aggregation and the failed subset see the rejection
        Err(Error::InvalidQuality(quality))
    } else {
        match image.payload() {
            Payload::Raw(_) => Err(Error::Unencodable),
            Payload::Codec(img) => encode_codec(img, target, quality),
            Payload::Pixels(img) => encode_pixels(img, target, quality),
        }
    };

    match outcome {
        Ok((payload, bytes)) => {
            image.replace_payload(payload, target);
            image.set_ok();
            Ok(bytes)
        }
        Err(err) => {
            image.set_failure(err.kind(), normalize(&err));
            Err(err)
        }
    }
}

/// Apply [`encode`] once per quality step, each against a fresh copy of the
/// source, producing one artifact per step.
///
/// Step order is deterministic: always descending from the highest quality
/// to the lowest, whatever order the caller supplies.
pub fn sweep(
    image: &UnifiedImage,
    target: FormatPair,
    qualities: &[u8],
) -> Result<Vec<SweepArtifact>> {
    let mut ladder = qualities.to_vec();
    ladder.sort_unstable_by(|a, b| b.cmp(a));

    let mut artifacts = Vec::with_capacity(ladder.len());
    for quality in ladder {
        let mut step = image.clone();
        let data = encode(&mut step, target, quality)?;
        artifacts.push(SweepArtifact { quality, data });
    }
    Ok(artifacts)
}

fn encode_codec(img: &CodecImage, target: FormatPair, quality: u8) -> Result<(Payload, Vec<u8>)> {
    if let Some(fmt) = writable_dynamic_format(target.tag) {
        let bytes = dynamic::encode(img, fmt, quality).map_err(dynamic_err)?;
        let (decoded, _warning) = dynamic::decode(&bytes, fmt).map_err(dynamic_err)?;
        Ok((Payload::Codec(decoded), bytes))
    } else if raster::can_encode(target.tag) {
        let crossed = codec_to_raster(img)?;
        let bytes =
            raster::encode(&crossed, target.tag, EncodeParams { quality }).map_err(raster_err)?;
        let decoded = raster::decode(&bytes, target.tag).map_err(raster_err)?;
        Ok((Payload::Pixels(decoded), bytes))
    } else {
        Err(Error::UnsupportedFormat(target.name.to_string()))
    }
}

fn encode_pixels(img: &RasterImage, target: FormatPair, quality: u8) -> Result<(Payload, Vec<u8>)> {
    if raster::can_encode(target.tag) {
        let bytes =
            raster::encode(img, target.tag, EncodeParams { quality }).map_err(raster_err)?;
        // Decode the buffer straight back: this is the destructive
        // requantization step.
        let decoded = raster::decode(&bytes, target.tag).map_err(raster_err)?;
        Ok((Payload::Pixels(decoded), bytes))
    } else if let Some(fmt) = writable_dynamic_format(target.tag) {
        let crossed = raster_to_codec(img)?;
        let bytes = dynamic::encode(&crossed, fmt, quality).map_err(dynamic_err)?;
        let (decoded, _warning) = dynamic::decode(&bytes, fmt).map_err(dynamic_err)?;
        Ok((Payload::Codec(decoded), bytes))
    } else {
        Err(Error::UnsupportedFormat(target.name.to_string()))
    }
}

/// The dynamic backend's writable registry entry for a tag, if any.
fn writable_dynamic_format(tag: FormatTag) -> Option<image::ImageFormat> {
    tag.to_image_format()
        .filter(|f| f.reading_enabled() && f.writing_enabled())
}

/// Cross a codec object into the raster backend through a lossless byte
/// buffer round trip.
fn codec_to_raster(img: &CodecImage) -> Result<RasterImage> {
    let bytes = dynamic::encode(img, image::ImageFormat::Png, 100).map_err(dynamic_err)?;
    raster::decode(&bytes, FormatTag::Png).map_err(raster_err)
}

/// Cross a pixel buffer into the dynamic backend through a lossless byte
/// buffer round trip. The encode swizzles BGR storage out to RGB explicitly.
fn raster_to_codec(img: &RasterImage) -> Result<CodecImage> {
    let bytes = raster::encode(img, FormatTag::Png, EncodeParams { quality: 100 })
        .map_err(raster_err)?;
    let (decoded, _warning) =
        dynamic::decode(&bytes, image::ImageFormat::Png).map_err(dynamic_err)?;
    Ok(decoded)
}

fn dynamic_err(err: image::ImageError) -> Error {
    Error::Backend(NormalizedError::dynamic(err.to_string()))
}

fn raster_err(err: RasterError) -> Error {
    Error::Backend(NormalizedError::raster(err.message, Some(err.code)))
}

fn normalize(err: &Error) -> NormalizedError {
    match err.normalized() {
        Some(norm) => norm.clone(),
        None => NormalizedError::other(err.to_string()),
    }
}
