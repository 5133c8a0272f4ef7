//! Image attachments for `/chat/image`.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use image::ImageFormat;
use tracing::debug;

use crate::error::{ChatError, Result};

/// Largest image accepted for upload (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

impl ImageAttachment {
    /// Read and validate an image file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path).await?.len();
        if size > MAX_IMAGE_BYTES {
            return Err(ChatError::ImageTooLarge {
                size,
                max: MAX_IMAGE_BYTES,
            });
        }

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Self::from_bytes(file_name, bytes)
    }

    /// Validate in-memory image bytes.
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        if size > MAX_IMAGE_BYTES {
            return Err(ChatError::ImageTooLarge {
                size,
                max: MAX_IMAGE_BYTES,
            });
        }

        let format = image::guess_format(&bytes).map_err(|_| ChatError::NotAnImage)?;
        let mime_type = mime_for(format).ok_or(ChatError::NotAnImage)?;
        let file_name = file_name.into();
        debug!("Loaded image attachment {file_name} ({mime_type}, {size} bytes)");

        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Inline `data:` URL for previews.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    let mime = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Avif => "image/avif",
        _ => return None,
    };
    Some(mime)
}
