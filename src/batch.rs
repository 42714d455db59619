//! Batch handler: ingest many images, recompress all of them, isolate
//! per-image failure.
//!
//! Ingestion order is never disturbed: a failed decode still occupies its
//! slot, so indices keep corresponding to the caller's input list. During
//! processing one image's failure never halts the run — the failure is
//! recorded on the image, one normalized line goes to the logger, and the
//! loop moves on. The failed subset is derived from item status rather than
//! kept as a second list, so `failed ⊆ items` holds by construction.

use std::mem;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::ErrorKind;
use crate::format::{self, FormatPair};
use crate::logger::ScrubLogger;
use crate::report::BatchReport;
use crate::scrub::{self, CompressionLevel};
use crate::unified::UnifiedImage;

/// Processing lifecycle of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Nothing ingested yet.
    Idle,
    /// Accepting inputs.
    Ingesting,
    /// Recompression in progress.
    Processing,
    /// `items` is stable and readable; the handler mutates nothing further.
    Done,
}

/// A named slot in the batch. Slot order equals ingestion order.
#[derive(Debug)]
pub struct BatchItem {
    /// Caller-supplied identifier, used in log lines and reports.
    pub name: String,
    /// The image occupying this slot.
    pub image: UnifiedImage,
}

/// Owns a collection of unified images and drives the recompression engine
/// over all of them.
pub struct BatchHandler {
    items: Vec<BatchItem>,
    state: BatchState,
    quality: u8,
    logger: Arc<ScrubLogger>,
}

impl BatchHandler {
    /// Create an empty handler using the default compression level.
    #[must_use]
    pub fn new(logger: Arc<ScrubLogger>) -> Self {
        Self {
            items: Vec::new(),
            state: BatchState::Idle,
            quality: CompressionLevel::default().quality(),
            logger,
        }
    }

    /// Override the quality used by the `encode_all` operations.
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Build a handler from already-constructed images, taking exclusive
    /// ownership of the collection.
    #[must_use]
    pub fn from_images(images: Vec<UnifiedImage>, logger: Arc<ScrubLogger>) -> Self {
        let items = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| BatchItem {
                name: format!("image-{index}"),
                image,
            })
            .collect();
        Self {
            items,
            state: BatchState::Ingesting,
            quality: CompressionLevel::default().quality(),
            logger,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Number of ingested images, failed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing has been ingested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All ingested items in ingestion order.
    #[must_use]
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Decode one input and append it, whatever the outcome. A failed
    /// decode occupies its slot with a terminal raw payload.
    pub fn ingest(&mut self, name: impl Into<String>, data: Vec<u8>, format_hint: &str) {
        self.state = BatchState::Ingesting;
        let name = name.into();
        let pair = format::get_format_pair(format_hint);
        let image = UnifiedImage::from_bytes(data, pair);
        if let Some(err) = image.last_error() {
            self.logger.add_detail(format!("{name}: {err}"));
        }
        self.items.push(BatchItem { name, image });
    }

    /// Re-encode every image to one fixed target format.
    ///
    /// Returns the error kind of the last failing item, or
    /// [`ErrorKind::None`] when everything succeeded — a coarse summary;
    /// callers needing per-item detail inspect [`failed`](Self::failed).
    pub fn encode_all_to_format(&mut self, target: FormatPair) -> ErrorKind {
        self.state = BatchState::Processing;
        let quality = self.quality;
        let mut aggregate = ErrorKind::None;

        for item in &mut self.items {
            if scrub::encode(&mut item.image, target, quality).is_err() {
                aggregate = item.image.status();
                if let Some(err) = item.image.last_error() {
                    self.logger.add_detail(format!("{}: {}", item.name, err));
                }
            }
        }

        self.state = BatchState::Done;
        aggregate
    }

    /// Re-encode every image back to its own recorded format.
    pub fn encode_all_to_original_format(&mut self) -> ErrorKind {
        self.state = BatchState::Processing;
        let quality = self.quality;
        let mut aggregate = ErrorKind::None;

        for item in &mut self.items {
            let target = item.image.format();
            if scrub::encode(&mut item.image, target, quality).is_err() {
                aggregate = item.image.status();
                if let Some(err) = item.image.last_error() {
                    self.logger.add_detail(format!("{}: {}", item.name, err));
                }
            }
        }

        self.state = BatchState::Done;
        aggregate
    }

    /// Parallel variant of [`encode_all_to_format`](Self::encode_all_to_format).
    ///
    /// Items are independent, so they are processed one worker per image;
    /// logger appends are synchronized internally. The aggregate stays
    /// deterministic: it is the error kind of the failing item with the
    /// highest ingestion index, matching the sequential loop.
    pub fn par_encode_all_to_format(&mut self, target: FormatPair) -> ErrorKind {
        self.state = BatchState::Processing;
        let quality = self.quality;
        let logger = Arc::clone(&self.logger);

        let failures: Vec<ErrorKind> = self
            .items
            .par_iter_mut()
            .filter_map(|item| {
                if scrub::encode(&mut item.image, target, quality).is_err() {
                    if let Some(err) = item.image.last_error() {
                        logger.add_detail(format!("{}: {}", item.name, err));
                    }
                    Some(item.image.status())
                } else {
                    None
                }
            })
            .collect();

        self.state = BatchState::Done;
        failures.last().copied().unwrap_or(ErrorKind::None)
    }

    /// The failed subset, derived from item status. Every yielded item is
    /// by construction also present in [`items`](Self::items).
    pub fn failed(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|i| i.image.status().is_failure())
    }

    /// Number of items currently in a failed state.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// Number of items not in a failed state (warnings count as succeeded).
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.items.len() - self.failed_count()
    }

    /// Build a serializable outcome report for the current state.
    #[must_use]
    pub fn report(&self) -> BatchReport {
        BatchReport::from_handler(self)
    }

    /// Transfer exclusive ownership of all images back to the caller,
    /// leaving the handler empty.
    pub fn take_images(&mut self) -> Vec<UnifiedImage> {
        mem::take(&mut self.items)
            .into_iter()
            .map(|item| item.image)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::get_format_pair;
    use crate::logger::LogLevel;
    use std::io::Cursor;

    fn encoded_bytes(format: image::ImageFormat) -> Vec<u8> {
        let img = image::RgbImage::from_fn(12, 12, |x, y| {
            image::Rgb([(x * 21) as u8, (y * 19) as u8, 77])
        });
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, format)
            .unwrap();
        out.into_inner()
    }

    fn truncated_png() -> Vec<u8> {
        let mut bytes = encoded_bytes(image::ImageFormat::Png);
        bytes.truncate(bytes.len() / 3);
        bytes
    }

    fn test_logger() -> Arc<ScrubLogger> {
        Arc::new(ScrubLogger::new(LogLevel::Default))
    }

    /// One valid JPEG, one truncated PNG, one valid BMP.
    fn mixed_handler() -> BatchHandler {
        let mut handler = BatchHandler::new(test_logger());
        handler.ingest("cover.jpg", encoded_bytes(image::ImageFormat::Jpeg), "jpg");
        handler.ingest("broken.png", truncated_png(), "png");
        handler.ingest("cover.bmp", encoded_bytes(image::ImageFormat::Bmp), "bmp");
        handler
    }

    #[test]
    fn test_ingest_keeps_every_slot() {
        let handler = mixed_handler();
        assert_eq!(handler.len(), 3);
        assert_eq!(handler.state(), BatchState::Ingesting);
        // the corrupt one still occupies its slot, as terminal raw
        assert!(handler.items()[1].image.payload().is_raw());
        assert_eq!(handler.items()[1].image.status(), ErrorKind::ReadFailure);
        assert_eq!(handler.items()[0].image.status(), ErrorKind::None);
        assert_eq!(handler.items()[2].image.status(), ErrorKind::None);
    }

    #[test]
    fn test_processing_partitions_without_aborting() {
        let mut handler = mixed_handler().with_quality(75);
        let aggregate = handler.encode_all_to_format(get_format_pair("jpg"));

        assert_eq!(handler.state(), BatchState::Done);
        assert_eq!(handler.len(), 3);
        assert_eq!(handler.failed_count(), 1);
        assert_eq!(handler.succeeded_count(), 2);
        assert_eq!(aggregate, ErrorKind::Unencodable);

        let failed_names: Vec<&str> = handler.failed().map(|i| i.name.as_str()).collect();
        assert_eq!(failed_names, vec!["broken.png"]);
    }

    #[test]
    fn test_failed_subset_is_contained_in_items() {
        let mut handler = mixed_handler();
        handler.encode_all_to_format(get_format_pair("jpg"));
        for failed in handler.failed() {
            assert!(
                handler
                    .items()
                    .iter()
                    .any(|item| std::ptr::eq(item, failed))
            );
        }
    }

    #[test]
    fn test_encode_all_to_original_format() {
        let mut handler = mixed_handler();
        let aggregate = handler.encode_all_to_original_format();
        assert_eq!(aggregate, ErrorKind::Unencodable);
        // survivors keep their own formats
        assert_eq!(handler.items()[0].image.format().name, "jpg");
        assert_eq!(handler.items()[2].image.format().name, "bmp");
    }

    #[test]
    fn test_all_clean_batch_aggregates_none() {
        let mut handler = BatchHandler::new(test_logger());
        handler.ingest("a.png", encoded_bytes(image::ImageFormat::Png), "png");
        handler.ingest("b.jpg", encoded_bytes(image::ImageFormat::Jpeg), "jpg");
        let aggregate = handler.encode_all_to_format(get_format_pair("jpg"));
        assert_eq!(aggregate, ErrorKind::None);
        assert_eq!(handler.failed_count(), 0);
    }

    #[test]
    fn test_out_of_range_quality_marks_every_item_failed() {
        let logger = test_logger();
        let mut handler = BatchHandler::new(Arc::clone(&logger)).with_quality(101);
        handler.ingest("a.png", encoded_bytes(image::ImageFormat::Png), "png");

        let aggregate = handler.encode_all_to_format(get_format_pair("jpg"));

        assert_ne!(aggregate, ErrorKind::None);
        assert_eq!(handler.failed_count(), 1);
        assert_eq!(logger.pending(), 1);
        // nothing was encoded, so the claimed format must not change
        assert_eq!(handler.items()[0].image.format().name, "png");
    }

    #[test]
    fn test_parallel_matches_sequential_outcome() {
        let mut sequential = mixed_handler();
        let mut parallel = mixed_handler();
        let target = get_format_pair("jpg");

        let a = sequential.encode_all_to_format(target);
        let b = parallel.par_encode_all_to_format(target);

        assert_eq!(a, b);
        assert_eq!(sequential.failed_count(), parallel.failed_count());
        assert_eq!(parallel.state(), BatchState::Done);
    }

    #[test]
    fn test_failure_logs_one_normalized_line() {
        let logger = test_logger();
        let mut handler = BatchHandler::new(Arc::clone(&logger));
        handler.ingest("broken.png", truncated_png(), "png");
        let ingest_lines = logger.pending();
        handler.encode_all_to_format(get_format_pair("jpg"));
        assert_eq!(logger.pending(), ingest_lines + 1);
    }

    #[test]
    fn test_take_images_transfers_ownership() {
        let mut handler = mixed_handler();
        let images = handler.take_images();
        assert_eq!(images.len(), 3);
        assert!(handler.is_empty());
        assert_eq!(handler.take_images().len(), 0);
    }

    #[test]
    fn test_from_images_takes_collection() {
        let raster = crate::backend::RasterImage::from_rgb8(&[5, 6, 7, 8, 9, 10], 2, 1);
        let images = vec![UnifiedImage::from_raster(raster, get_format_pair("png"))];
        let mut handler = BatchHandler::from_images(images, test_logger());
        assert_eq!(handler.len(), 1);
        let aggregate = handler.encode_all_to_format(get_format_pair("png"));
        assert_eq!(aggregate, ErrorKind::None);
    }
}
