//! Multipart upload parsing for `POST /api/convert`.

use crate::config::ServerConfig;
use crate::error::ConvertError;
use crate::pipeline::input::{UploadSink, UploadedFile};
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::debug;

/// Name of the optional text field carrying the render scale.
pub const SCALE_FIELD: &str = "scale";

/// What a conversion request carried.
#[derive(Debug)]
pub struct ConversionRequest {
    pub file: UploadedFile,
    /// Raw `scale` field, unparsed.
    pub scale: Option<String>,
}

/// Walk the multipart body, keeping the file field and `scale`.
///
/// Unknown fields are skipped. A second file under the file field is
/// rejected rather than silently dropped.
pub async fn read_conversion_request(
    mut multipart: Multipart,
    config: &ServerConfig,
) -> Result<ConversionRequest, ConvertError> {
    let mut file: Option<UploadedFile> = None;
    let mut scale: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, config.max_upload_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == config.file_field {
            if file.is_some() {
                return Err(ConvertError::InvalidUpload(format!(
                    "expected exactly one file in the '{}' field",
                    config.file_field
                )));
            }
            file = receive_file(field, config).await?;
        } else if name == SCALE_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| multipart_error(e, config.max_upload_bytes))?;
            scale = Some(text);
        } else {
            debug!("Ignoring multipart field '{}'", name);
        }
    }

    let file = file.ok_or_else(|| ConvertError::MissingFile {
        field: config.file_field.clone(),
    })?;

    Ok(ConversionRequest { file, scale })
}

/// Stream one file field into a sink. An empty part without a filename is
/// what browsers send for an unselected file input, so it counts as absent.
async fn receive_file(
    mut field: Field<'_>,
    config: &ServerConfig,
) -> Result<Option<UploadedFile>, ConvertError> {
    let file_name = field
        .file_name()
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let mut sink = UploadSink::new(config.upload_storage, config.upload_dir.as_deref())?;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, config.max_upload_bytes))?
    {
        sink.write_chunk(&chunk)?;
    }

    if sink.is_empty() && file_name.is_none() {
        return Ok(None);
    }

    debug!(
        "Received upload {:?}: {} bytes",
        file_name.as_deref().unwrap_or("<unnamed>"),
        sink.len()
    );
    let bytes = sink.into_bytes()?;
    Ok(Some(UploadedFile { file_name, bytes }))
}

fn multipart_error(err: MultipartError, limit_bytes: usize) -> ConvertError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ConvertError::PayloadTooLarge { limit_bytes }
    } else {
        ConvertError::InvalidUpload(err.body_text())
    }
}
