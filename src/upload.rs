use actix_multipart::{Field, Multipart};
use actix_web::{HttpRequest, http::header};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::error::ApiError;

/// Multipart field both prediction endpoints read the upload from.
pub const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub data: Bytes,
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

async fn drain(field: &mut Field) -> Result<(), ApiError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| ApiError::MalformedUpload(e.to_string()))?;
    }
    Ok(())
}

/// Read the first `file` field of a multipart request into memory.
///
/// Requests that are not `multipart/form-data`, or carry no `file` field,
/// fail with `MissingFilePart`. A `file` field without a `filename`
/// parameter is a plain form value and is skipped like any other field; one
/// with an empty filename fails with `NoSelectedFile`.
pub async fn read_file_field(
    req: &HttpRequest,
    mut payload: Multipart,
    limit: usize,
) -> Result<Upload, ApiError> {
    if !is_multipart(req) {
        return Err(ApiError::MissingFilePart);
    }

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ApiError::MalformedUpload(e.to_string()))?;
        if field.name() != Some(FILE_FIELD) {
            drain(&mut field).await?;
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let Some(filename) = filename else {
            drain(&mut field).await?;
            continue;
        };
        if filename.is_empty() {
            return Err(ApiError::NoSelectedFile);
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::MalformedUpload(e.to_string()))?;
            if data.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }
        log::debug!("Received upload {:?} ({} bytes)", filename, data.len());
        return Ok(Upload {
            filename,
            data: data.freeze(),
        });
    }

    Err(ApiError::MissingFilePart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn detects_multipart_content_type() {
        let req = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "multipart/form-data; boundary=abc"))
            .to_http_request();
        assert!(is_multipart(&req));

        let req = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "Multipart/Form-Data; boundary=abc"))
            .to_http_request();
        assert!(is_multipart(&req));
    }

    #[test]
    fn other_content_types_are_not_multipart() {
        let req = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .to_http_request();
        assert!(!is_multipart(&req));

        let req = TestRequest::post().to_http_request();
        assert!(!is_multipart(&req));
    }
}
