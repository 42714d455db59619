//! The two codec backends hidden behind [`UnifiedImage`](crate::UnifiedImage).
//!
//! - [`raster`]: raw interleaved BGR pixel buffers, fixed capability list,
//!   failures carry numeric diagnostic codes.
//! - [`dynamic`]: polymorphic image objects, capability resolved from the
//!   codec registry at call time, decode can succeed with non-fatal warnings.
//!
//! Neither backend's native error type leaves this module un-normalized, and
//! pixel data only crosses between the two through encoded byte buffers.

pub mod dynamic;
pub mod raster;

pub use dynamic::{registry_formats, CodecImage};
pub use raster::{RasterError, RasterImage};
