use std::path::Path;

use axum::extract::Multipart;

use crate::api::errors::ApiError;

pub(crate) const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];
pub(crate) const ROSTER_EXTENSIONS: &[&str] = &["csv"];

#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub(crate) file_name: String,
    pub(crate) bytes: Vec<u8>,
}

/// Reads the `file` part of a multipart body, refusing anything above
/// `max_bytes` while streaming.
pub(crate) async fn read_file_field(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<UploadedFile, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(ApiError::BadRequest(format!(
                    "File size exceeds {}MB limit",
                    max_bytes / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }
        return Ok(UploadedFile { file_name, bytes });
    }

    Err(ApiError::BadRequest("File is required".to_string()))
}

pub(crate) fn validate_upload_extension(
    file_name: &str,
    allowed_extensions: &[&str],
) -> Result<(), ApiError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if allowed_extensions.iter().any(|allowed| *allowed == extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(validate_upload_extension("Questions.ZIP", ARCHIVE_EXTENSIONS).is_ok());
        assert!(validate_upload_extension("roster.csv", ROSTER_EXTENSIONS).is_ok());
        assert!(validate_upload_extension("roster.xlsx", ROSTER_EXTENSIONS).is_err());
        assert!(validate_upload_extension("noext", ARCHIVE_EXTENSIONS).is_err());
    }
}
