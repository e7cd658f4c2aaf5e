//! Output packaging: collect per-page PNGs into the deployment's format.
//!
//! Two strategies share the [`OutputPackager`] trait:
//!
//! * [`ArchivePackager`] streams each PNG into an in-memory zip as
//!   `page_NNN.png` and finalises the archive once, after the last page.
//! * [`InlineArrayPackager`] wraps each PNG as a base64 data URL and keeps
//!   them in page order.
//!
//! `finish` consumes the packager, so finalisation can happen at most once,
//! and the pipeline only reaches it when every page succeeded.

use crate::config::OutputMode;
use crate::error::ConvertError;
use crate::output::{archive_entry_name, OutputPayload};
use crate::pipeline::encode::to_data_url;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Accumulates encoded pages and produces the final payload.
pub trait OutputPackager {
    /// Append page `page_num` (1-indexed). Pages arrive in ascending order.
    fn push(&mut self, page_num: usize, png: Vec<u8>) -> Result<(), ConvertError>;

    /// Finalise and return the payload.
    fn finish(self: Box<Self>) -> Result<OutputPayload, ConvertError>;
}

/// Packager for `mode`.
pub fn packager_for(mode: OutputMode) -> Box<dyn OutputPackager> {
    match mode {
        OutputMode::Archive => Box::new(ArchivePackager::new()),
        OutputMode::InlineArray => Box::new(InlineArrayPackager::default()),
    }
}

/// Builds a deflate-compressed zip in memory.
pub struct ArchivePackager {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entries: Vec<String>,
}

impl ArchivePackager {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entries: Vec::new(),
        }
    }

    fn entry_options() -> SimpleFileOptions {
        // A fixed timestamp keeps archives byte-identical across runs.
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
    }
}

impl Default for ArchivePackager {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputPackager for ArchivePackager {
    fn push(&mut self, page_num: usize, png: Vec<u8>) -> Result<(), ConvertError> {
        let name = archive_entry_name(page_num);
        self.writer
            .start_file(name.as_str(), Self::entry_options())
            .map_err(|e| ConvertError::Packaging(format!("start entry {name}: {e}")))?;
        self.writer
            .write_all(&png)
            .map_err(|e| ConvertError::Packaging(format!("write entry {name}: {e}")))?;
        self.entries.push(name);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<OutputPayload, ConvertError> {
        let ArchivePackager { writer, entries } = *self;
        let cursor = writer
            .finish()
            .map_err(|e| ConvertError::Packaging(format!("finalise archive: {e}")))?;
        Ok(OutputPayload::Archive {
            bytes: cursor.into_inner(),
            entries,
        })
    }
}

/// Collects base64 data URLs in page order.
#[derive(Default)]
pub struct InlineArrayPackager {
    images: Vec<String>,
}

impl OutputPackager for InlineArrayPackager {
    fn push(&mut self, _page_num: usize, png: Vec<u8>) -> Result<(), ConvertError> {
        self.images.push(to_data_url(&png));
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<OutputPayload, ConvertError> {
        Ok(OutputPayload::InlineArray {
            images: self.images,
        })
    }
}
