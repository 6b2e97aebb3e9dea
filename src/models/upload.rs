//! Image uploads for multipart submissions

use std::path::Path;

use crate::error::{ClientError, ClientResult};

/// An image file ready to be attached to a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Read an image from disk, guessing the MIME type from its extension
    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Validation(format!("Invalid image path: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Validation(format!("Cannot read image {}: {}", path.display(), e)))?;
        if bytes.is_empty() {
            return Err(ClientError::Validation(format!("Image {} is empty", path.display())));
        }
        Ok(Self::new(file_name, bytes))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
