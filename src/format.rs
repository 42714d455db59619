//! Format identity and capability resolution across the two backends.
//!
//! Formats are identified by a stable numeric [`FormatTag`] paired with the
//! canonical lowercase extension string it was resolved from. Aliases
//! ("jpg", "jpeg", "jpe") share one tag but keep their own string, so a
//! re-encode to an image's recorded format writes the extension the caller
//! handed in.
//!
//! Capability tables are process-wide read-only state: the raster backend's
//! list is fixed at compile time, the dynamic backend's is a snapshot of its
//! coder registry taken at call time.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::backend::dynamic;

/// Stable numeric tag for fast format comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    /// Sentinel for unknown format strings. Never maps to a backend.
    Unknown = 0,
    Jpeg = 1,
    Png = 2,
    Bmp = 3,
    Gif = 4,
    Tiff = 5,
    WebP = 6,
    Pnm = 7,
}

impl FormatTag {
    /// The dynamic backend's identifier for this tag, when it has one.
    pub(crate) fn to_image_format(self) -> Option<image::ImageFormat> {
        match self {
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
            Self::Png => Some(image::ImageFormat::Png),
            Self::Bmp => Some(image::ImageFormat::Bmp),
            Self::Gif => Some(image::ImageFormat::Gif),
            Self::Tiff => Some(image::ImageFormat::Tiff),
            Self::WebP => Some(image::ImageFormat::WebP),
            Self::Pnm => Some(image::ImageFormat::Pnm),
            Self::Unknown => None,
        }
    }
}

/// A format tag with the canonical extension string it resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatPair {
    /// Numeric tag shared by all aliases of the format.
    pub tag: FormatTag,
    /// Canonical lowercase extension; distinct per alias.
    pub name: &'static str,
}

/// Returned for format strings absent from the mapping table.
pub const INVALID_FORMAT_PAIR: FormatPair = FormatPair {
    tag: FormatTag::Unknown,
    name: "INVALID",
};

/// Extensions the raster backend always handles. Fixed list, no runtime
/// query; membership is exact-match, never substring.
static RASTER_SUPPORTED: &[&str] = &[
    "jpeg", "jpg", "jpe", "png", "bmp", "dib", "tif", "tiff", "pbm", "pgm", "ppm", "pnm",
];

/// Lowercase extension string to format pair. Aliases deliberately map to
/// the same tag with different canonical strings.
static FORMAT_MAP: LazyLock<HashMap<&'static str, FormatPair>> = LazyLock::new(|| {
    [
        ("jpeg", FormatTag::Jpeg),
        ("jpg", FormatTag::Jpeg),
        ("jpe", FormatTag::Jpeg),
        ("png", FormatTag::Png),
        ("bmp", FormatTag::Bmp),
        ("dib", FormatTag::Bmp),
        ("gif", FormatTag::Gif),
        ("tif", FormatTag::Tiff),
        ("tiff", FormatTag::Tiff),
        ("webp", FormatTag::WebP),
        ("pbm", FormatTag::Pnm),
        ("pgm", FormatTag::Pnm),
        ("ppm", FormatTag::Pnm),
        ("pnm", FormatTag::Pnm),
    ]
    .into_iter()
    .map(|(name, tag)| (name, FormatPair { tag, name }))
    .collect()
});

/// Look up a format string in the static mapping table.
///
/// Lookup is case-insensitive. Unknown strings return
/// [`INVALID_FORMAT_PAIR`], never an error.
#[must_use]
pub fn get_format_pair(format: &str) -> FormatPair {
    let lower = format.to_ascii_lowercase();
    FORMAT_MAP
        .get(lower.as_str())
        .copied()
        .unwrap_or(INVALID_FORMAT_PAIR)
}

/// Which backend(s) can read and write a given format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSupport {
    /// Only the raster backend handles it.
    Raster,
    /// Only the dynamic backend handles it.
    Dynamic,
    /// Both backends handle it.
    Both,
    /// Neither backend handles it.
    Neither,
}

impl BackendSupport {
    /// True when at least one backend handles the format.
    #[must_use]
    pub fn any(self) -> bool {
        !matches!(self, Self::Neither)
    }
}

/// True when the format is on the raster backend's fixed list.
#[must_use]
pub fn is_raster_supported(format: &str) -> bool {
    if format.is_empty() {
        return false;
    }
    let lower = format.to_ascii_lowercase();
    RASTER_SUPPORTED.iter().any(|entry| *entry == lower)
}

/// True when the dynamic backend's registry has a coder for the format that
/// is simultaneously readable and writable.
#[must_use]
pub fn is_dynamic_supported(format: &str) -> bool {
    dynamic::registry_lookup(format).is_some()
}

/// Resolve which backend(s) can handle a format. Empty input is `Neither`.
#[must_use]
pub fn supports(format: &str) -> BackendSupport {
    if format.is_empty() {
        return BackendSupport::Neither;
    }
    match (is_raster_supported(format), is_dynamic_supported(format)) {
        (true, true) => BackendSupport::Both,
        (true, false) => BackendSupport::Raster,
        (false, true) => BackendSupport::Dynamic,
        (false, false) => BackendSupport::Neither,
    }
}

/// True when at least one backend can handle the format.
#[must_use]
pub fn is_format_supported(format: &str) -> bool {
    supports(format).any()
}
