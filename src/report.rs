//! Serializable outcome report for a batch run.
//!
//! The report is the machine-readable counterpart of the success/failure
//! partition: one row per ingested image, written as pretty JSON or a CSV
//! summary. Timing and performance reporting is deliberately not part of it.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::BatchHandler;
use crate::error::{ErrorKind, Result};

/// Outcome for one ingested image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Ingestion index; stable across the run.
    pub index: usize,
    /// Caller-supplied identifier.
    pub name: String,
    /// The format the image claims after processing.
    pub format: String,
    /// Final status classification.
    pub status: ErrorKind,
    /// Normalized diagnostic, present when the status is not `None`.
    pub message: Option<String>,
    /// False exactly when the status is a failure class.
    pub ok: bool,
}

/// Report for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of ingested images.
    pub total: usize,
    /// Number of images in a failed state.
    pub failed: usize,
    /// One outcome per ingested image, in ingestion order.
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    /// Snapshot the outcome of a handler's current state.
    #[must_use]
    pub fn from_handler(handler: &BatchHandler) -> Self {
        let items: Vec<ItemOutcome> = handler
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| ItemOutcome {
                index,
                name: item.name.clone(),
                format: item.image.format().name.to_string(),
                status: item.image.status(),
                message: item.image.last_error().map(|e| e.to_string()),
                ok: !item.image.status().is_failure(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            total: items.len(),
            failed: items.iter().filter(|i| !i.ok).count(),
            items,
        }
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Write a CSV summary, one row per image.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;

        wtr.write_record(["index", "name", "format", "status", "ok", "message"])?;
        for item in &self.items {
            wtr.write_record([
                &item.index.to_string(),
                &item.name,
                &item.format,
                &format!("{:?}", item.status),
                &item.ok.to_string(),
                &item.message.clone().unwrap_or_default(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::get_format_pair;
    use crate::logger::{LogLevel, ScrubLogger};
    use std::io::Cursor;
    use std::sync::Arc;

    fn handler_with_one_failure() -> BatchHandler {
        let img = image::RgbImage::from_pixel(6, 6, image::Rgb([40, 80, 120]));
        let mut png = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let logger = Arc::new(ScrubLogger::new(LogLevel::Default));
        let mut handler = BatchHandler::new(logger);
        handler.ingest("ok.png", png.into_inner(), "png");
        handler.ingest("bad.png", vec![0xde, 0xad], "png");
        handler.encode_all_to_format(get_format_pair("jpg"));
        handler
    }

    #[test]
    fn test_report_counts_partition() {
        let report = handler_with_one_failure().report();
        assert_eq!(report.total, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.items.len(), 2);
        assert!(report.items[0].ok);
        assert!(!report.items[1].ok);
        assert!(report.items[1].message.is_some());
    }

    #[test]
    fn test_report_preserves_ingestion_order() {
        let report = handler_with_one_failure().report();
        assert_eq!(report.items[0].name, "ok.png");
        assert_eq!(report.items[1].name, "bad.png");
        assert_eq!(report.items[0].index, 0);
        assert_eq!(report.items[1].index, 1);
    }

    #[test]
    fn test_write_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = handler_with_one_failure().report();
        report.write_json(&path).unwrap();

        let loaded: BatchReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.total, report.total);
        assert_eq!(loaded.failed, report.failed);
    }

    #[test]
    fn test_write_csv_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        handler_with_one_failure().report().write_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("index,name,format,status,ok,message"));
        assert!(contents.contains("bad.png"));
        assert!(contents.contains("Unencodable"));
    }
}
