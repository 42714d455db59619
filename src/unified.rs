//! The unified image value: one closed polymorphic container for both
//! backends.
//!
//! A [`UnifiedImage`] holds exactly one payload variant at any time. Which
//! backend decodes the input is gated by the capability resolver, so at most
//! one decode path runs per construction and errors never accumulate across
//! backends. An input neither backend could decode stays in the terminal
//! [`Payload::Raw`] state, retaining the original bytes for diagnostics.

use crate::backend::dynamic::{self, DecodeWarning};
use crate::backend::{raster, CodecImage, RasterImage};
use crate::error::{Error, ErrorKind, NormalizedError, Result};
use crate::format::{self, FormatPair};

/// Active payload of a [`UnifiedImage`]. Exactly one variant at a time.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Decoded raster owned by the raster backend.
    Pixels(RasterImage),
    /// Native object owned by the dynamic backend.
    Codec(CodecImage),
    /// Undecoded input, kept verbatim. Terminal: never eligible for encode.
    Raw(Vec<u8>),
}

impl Payload {
    /// True for the terminal undecoded state.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

/// An image normalized behind the dual-backend abstraction.
///
/// Invariant: `last_error().is_some()` exactly when `status()` is not
/// [`ErrorKind::None`]. Both are maintained together by the status setters.
///
/// `Clone` deep-copies the active payload variant only; a clone never
/// aliases the source.
#[derive(Debug, Clone)]
pub struct UnifiedImage {
    payload: Payload,
    format: FormatPair,
    status: ErrorKind,
    last_error: Option<NormalizedError>,
}

impl UnifiedImage {
    /// Construct from raw bytes and a format resolved via
    /// [`get_format_pair`](crate::format::get_format_pair).
    ///
    /// Construction never fails outright: decode problems are recorded in
    /// the value's status and the payload falls back to [`Payload::Raw`]
    /// with the input retained verbatim.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>, format: FormatPair) -> Self {
        // Capability gates which single decode path is tried.
        if let Some(claimed) = dynamic::registry_lookup(format.name) {
            return match dynamic::decode(&data, claimed) {
                Ok((codec, warning)) => {
                    let (status, last_error) = match warning {
                        Some(DecodeWarning::FormatMismatch) => (
                            ErrorKind::WarningFormatInvalid,
                            Some(NormalizedError::dynamic(format!(
                                "non-critical format mismatch for \"{}\"",
                                format.name
                            ))),
                        ),
                        Some(DecodeWarning::ChannelType) => (
                            ErrorKind::WarningChannelType,
                            Some(NormalizedError::dynamic(format!(
                                "non-critical channel type for \"{}\"",
                                format.name
                            ))),
                        ),
                        None => (ErrorKind::None, None),
                    };
                    Self {
                        payload: Payload::Codec(codec),
                        format,
                        status,
                        last_error,
                    }
                }
                Err(err) => Self {
                    payload: Payload::Raw(data),
                    format,
                    status: ErrorKind::ReadFailure,
                    last_error: Some(NormalizedError::dynamic(err.to_string())),
                },
            };
        }

        if format::is_raster_supported(format.name) {
            return match raster::decode(&data, format.tag) {
                Ok(img) if !img.is_empty() => Self {
                    payload: Payload::Pixels(img),
                    format,
                    status: ErrorKind::None,
                    last_error: None,
                },
                Ok(_) => Self {
                    payload: Payload::Raw(data),
                    format,
                    status: ErrorKind::ReadFailure,
                    last_error: Some(NormalizedError::raster(
                        "decode produced no pixel data",
                        None,
                    )),
                },
                Err(err) => Self {
                    payload: Payload::Raw(data),
                    format,
                    status: ErrorKind::ReadFailure,
                    last_error: Some(NormalizedError::raster(err.message, Some(err.code))),
                },
            };
        }

        Self {
            last_error: Some(NormalizedError::other(format!(
                "no backend supports format \"{}\"",
                format.name
            ))),
            payload: Payload::Raw(data),
            format,
            status: ErrorKind::ReadFailure,
        }
    }

    /// Wrap an already-decoded raster buffer.
    #[must_use]
    pub fn from_raster(image: RasterImage, format: FormatPair) -> Self {
        Self {
            payload: Payload::Pixels(image),
            format,
            status: ErrorKind::None,
            last_error: None,
        }
    }

    /// Wrap an already-decoded native codec object.
    #[must_use]
    pub fn from_codec(image: CodecImage, format: FormatPair) -> Self {
        Self {
            payload: Payload::Codec(image),
            format,
            status: ErrorKind::None,
            last_error: None,
        }
    }

    /// The format this image currently claims to be in. Mutated by a
    /// successful re-encode.
    #[must_use]
    pub fn format(&self) -> FormatPair {
        self.format
    }

    /// Status from construction or the last operation.
    #[must_use]
    pub fn status(&self) -> ErrorKind {
        self.status
    }

    /// The normalized failure behind [`status`](Self::status), present
    /// exactly when the status is not `None`.
    #[must_use]
    pub fn last_error(&self) -> Option<&NormalizedError> {
        self.last_error.as_ref()
    }

    /// The active payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Byte representation of the active payload.
    ///
    /// - `Codec`: serialized to an in-memory buffer in the claimed format.
    /// - `Pixels`: the raw interleaved BGR matrix storage.
    /// - `Raw`: the stored input, verbatim.
    pub fn raw_data(&self) -> Result<Vec<u8>> {
        match &self.payload {
            Payload::Codec(img) => dynamic::to_bytes(img)
                .map_err(|e| Error::Backend(NormalizedError::dynamic(e.to_string()))),
            Payload::Pixels(img) => Ok(img.bgr_bytes()),
            Payload::Raw(data) => Ok(data.clone()),
        }
    }

    /// Replace the payload and claimed format after a successful re-encode.
    pub(crate) fn replace_payload(&mut self, payload: Payload, format: FormatPair) {
        self.payload = payload;
        self.format = format;
    }

    /// Record a successful operation, clearing any prior status.
    pub(crate) fn set_ok(&mut self) {
        self.status = ErrorKind::None;
        self.last_error = None;
    }

    /// Record a failed operation. Keeps the status/error invariant.
    pub(crate) fn set_failure(&mut self, kind: ErrorKind, err: NormalizedError) {
        self.status = kind;
        self.last_error = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::get_format_pair;
    use std::io::Cursor;

    fn sample_png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_fn(8, 8, |x, y| {
            image::Rgb([(x * 31) as u8, (y * 17) as u8, 200])
        });
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decodable_bytes_leave_clean_status() {
        let img = UnifiedImage::from_bytes(sample_png_bytes(), get_format_pair("png"));
        assert_eq!(img.status(), ErrorKind::None);
        assert!(img.last_error().is_none());
        assert!(matches!(img.payload(), Payload::Codec(_)));
        assert!(!img.raw_data().unwrap().is_empty());
    }

    #[test]
    fn test_empty_input_is_terminal_raw() {
        let img = UnifiedImage::from_bytes(Vec::new(), get_format_pair("png"));
        assert!(img.status().is_failure());
        assert_eq!(img.status(), ErrorKind::ReadFailure);
        assert!(img.last_error().is_some());
        assert!(img.payload().is_raw());
        // original input preserved unchanged, even when empty
        assert_eq!(img.raw_data().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_malformed_input_retains_original_bytes() {
        let junk = vec![0x00, 0x01, 0x02, 0x03, 0x04];
        let img = UnifiedImage::from_bytes(junk.clone(), get_format_pair("jpg"));
        assert_eq!(img.status(), ErrorKind::ReadFailure);
        assert!(img.payload().is_raw());
        assert_eq!(img.raw_data().unwrap(), junk);
    }

    #[test]
    fn test_unknown_format_is_read_failure() {
        let img = UnifiedImage::from_bytes(vec![1, 2, 3], get_format_pair("xyz"));
        assert_eq!(img.status(), ErrorKind::ReadFailure);
        assert!(img.payload().is_raw());
        assert_eq!(img.format().name, "INVALID");
    }

    #[test]
    fn test_format_mismatch_is_warning_not_failure() {
        // PNG container handed in with a jpg hint: decodes, but warns.
        let img = UnifiedImage::from_bytes(sample_png_bytes(), get_format_pair("jpg"));
        assert_eq!(img.status(), ErrorKind::WarningFormatInvalid);
        assert!(img.status().is_warning());
        assert!(!img.status().is_failure());
        assert!(img.last_error().is_some());
        assert!(matches!(img.payload(), Payload::Codec(_)));
    }

    #[test]
    fn test_grayscale_channel_warning_keeps_payload() {
        let gray = image::GrayImage::from_pixel(4, 4, image::Luma([90]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(gray)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();

        let img = UnifiedImage::from_bytes(out.into_inner(), get_format_pair("png"));
        assert_eq!(img.status(), ErrorKind::WarningChannelType);
        assert!(matches!(img.payload(), Payload::Codec(_)));
    }

    #[test]
    fn test_status_error_invariant() {
        let clean = UnifiedImage::from_bytes(sample_png_bytes(), get_format_pair("png"));
        assert_eq!(
            clean.last_error().is_some(),
            clean.status() != ErrorKind::None
        );

        let broken = UnifiedImage::from_bytes(vec![0xff], get_format_pair("png"));
        assert_eq!(
            broken.last_error().is_some(),
            broken.status() != ErrorKind::None
        );
    }

    #[test]
    fn test_clone_is_deep_and_independent() {
        let original = UnifiedImage::from_bytes(sample_png_bytes(), get_format_pair("png"));
        let mut copy = original.clone();
        copy.set_failure(
            ErrorKind::Other,
            NormalizedError::other("mutated copy only"),
        );
        assert_eq!(original.status(), ErrorKind::None);
        assert_eq!(copy.status(), ErrorKind::Other);
        assert_eq!(original.raw_data().unwrap(), copy.raw_data().unwrap());
    }

    #[test]
    fn test_codec_wrap_starts_clean() {
        let rgb = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let codec = CodecImage {
            image: image::DynamicImage::ImageRgb8(rgb),
            format: image::ImageFormat::Png,
        };
        let img = UnifiedImage::from_codec(codec, get_format_pair("png"));
        assert_eq!(img.status(), ErrorKind::None);
        assert!(matches!(img.payload(), Payload::Codec(_)));
        assert!(!img.raw_data().unwrap().is_empty());
    }

    #[test]
    fn test_raster_wrap_reports_matrix_storage() {
        let raster = RasterImage::from_rgb8(&[10, 20, 30], 1, 1);
        let img = UnifiedImage::from_raster(raster, get_format_pair("bmp"));
        assert_eq!(img.status(), ErrorKind::None);
        // BGR interleaved storage order
        assert_eq!(img.raw_data().unwrap(), vec![30, 20, 10]);
    }
}
