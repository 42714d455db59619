//! # steg-scrub
//!
//! Dual-backend image normalization and destructive recompression for
//! steganography removal.
//!
//! Images of unknown or mixed format are decoded behind one of two
//! interchangeable codec backends and wrapped in a single [`UnifiedImage`]
//! value that hides which backend produced it. Hidden low-order-bit payloads
//! are destroyed by forcing every image through a deterministic lossy
//! re-encode — no detection is attempted, the recompression is
//! unconditional.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use steg_scrub::{get_format_pair, BatchHandler, LogLevel, ScrubLogger};
//!
//! let logger = Arc::new(ScrubLogger::new(LogLevel::Default));
//! let mut batch = BatchHandler::new(Arc::clone(&logger)).with_quality(75);
//!
//! for (name, bytes, ext) in inputs {
//!     batch.ingest(name, bytes, ext);
//! }
//!
//! // One image's failure never halts the run.
//! batch.encode_all_to_format(get_format_pair("jpg"));
//! println!("{} of {} failed", batch.failed_count(), batch.len());
//!
//! batch.report().write_csv("scrub_report.csv".as_ref())?;
//! logger.flush(None)?;
//! ```
//!
//! ## Modules
//!
//! - [`format`]: format identity and backend capability resolution
//! - [`backend`]: the two codec backends (raster pixel buffers, dynamic
//!   codec objects)
//! - [`unified`]: the polymorphic image value both backends hide behind
//! - [`scrub`]: the recompression engine and quality sweep
//! - [`batch`]: batch ingestion and failure-isolating processing
//! - [`error`]: the shared error taxonomy and backend error normalization
//! - [`logger`]: buffered diagnostic logging
//! - [`report`]: serializable batch outcome reports

pub mod backend;
pub mod batch;
pub mod error;
pub mod format;
pub mod logger;
pub mod report;
pub mod scrub;
pub mod unified;

// Re-export commonly used types
pub use backend::{CodecImage, RasterError, RasterImage};
pub use batch::{BatchHandler, BatchItem, BatchState};
pub use error::{Backend, Error, ErrorKind, NormalizedError, Result};
pub use format::{
    get_format_pair, is_format_supported, supports, BackendSupport, FormatPair, FormatTag,
    INVALID_FORMAT_PAIR,
};
pub use logger::{LogLevel, ScrubLogger};
pub use report::{BatchReport, ItemOutcome};
pub use scrub::{encode, sweep, CompressionLevel, SweepArtifact, DEFAULT_QUALITY_SWEEP};
pub use unified::{Payload, UnifiedImage};
