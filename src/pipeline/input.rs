//! Input handling: hold an upload while it arrives, then hand over its bytes.
//!
//! ## Why spool to a temp file at all?
//!
//! Deployments with tight memory can keep large uploads on disk while the
//! multipart body is still streaming in. The temporary file is owned by an
//! [`UploadSink`]; it disappears when the sink is consumed by
//! [`UploadSink::into_bytes`] or dropped on an error path, so no branch of
//! the request needs its own cleanup call.

use crate::config::UploadStorage;
use crate::error::ConvertError;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A PDF header must start within this many leading bytes.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A fully received upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename sent by the client, if any.
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Destination for an upload that is still being received.
pub enum UploadSink {
    Memory(Vec<u8>),
    /// Spooled to a temp file that is removed on drop.
    Disk { file: NamedTempFile, len: usize },
}

impl UploadSink {
    /// Create a sink. Disk sinks are created in `dir`, or the system temp
    /// directory when `None`.
    pub fn new(storage: UploadStorage, dir: Option<&Path>) -> Result<Self, ConvertError> {
        match storage {
            UploadStorage::Memory => Ok(UploadSink::Memory(Vec::new())),
            UploadStorage::Disk => {
                let file = match dir {
                    Some(dir) => tempfile::Builder::new()
                        .prefix("pdf2img-upload-")
                        .tempfile_in(dir)?,
                    None => tempfile::Builder::new()
                        .prefix("pdf2img-upload-")
                        .tempfile()?,
                };
                debug!("Spooling upload to {}", file.path().display());
                Ok(UploadSink::Disk { file, len: 0 })
            }
        }
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), ConvertError> {
        match self {
            UploadSink::Memory(buf) => buf.extend_from_slice(chunk),
            UploadSink::Disk { file, len } => {
                file.write_all(chunk)?;
                *len += chunk.len();
            }
        }
        Ok(())
    }

    /// Bytes received so far.
    pub fn len(&self) -> usize {
        match self {
            UploadSink::Memory(buf) => buf.len(),
            UploadSink::Disk { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the spool file, for disk sinks.
    pub fn path(&self) -> Option<&Path> {
        match self {
            UploadSink::Memory(_) => None,
            UploadSink::Disk { file, .. } => Some(file.path()),
        }
    }

    /// Extract the upload's bytes. A disk sink's temp file is deleted before
    /// this returns, whether or not the read succeeded.
    pub fn into_bytes(self) -> Result<Vec<u8>, ConvertError> {
        match self {
            UploadSink::Memory(buf) => Ok(buf),
            UploadSink::Disk { mut file, len } => {
                let mut bytes = Vec::with_capacity(len);
                file.as_file_mut().seek(SeekFrom::Start(0))?;
                file.as_file_mut().read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }
}

/// Reject byte streams that cannot be a PDF before binding the engine.
///
/// Like most readers, this accepts junk before the `%PDF-` marker as long as
/// the marker appears within the first 1024 bytes.
pub fn check_pdf_header(bytes: &[u8]) -> Result<(), ConvertError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }

    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(ConvertError::Parse {
        detail: format!("not a PDF document (first bytes: {:?})", magic),
    })
}

/// Read a local PDF for one-shot conversion.
pub async fn read_local(path: &Path) -> Result<UploadedFile, ConvertError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConvertError::FileNotFound {
                path: PathBuf::from(path),
            }
        } else {
            ConvertError::Io(e)
        }
    })?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedFile {
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        bytes,
    })
}
