use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{PixogolError, Result};

const SUPPORTED_FORMATS: &str = "PNG, JPG, JPEG, GIF, BMP, TIFF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
}

impl ImageKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/bmp" | "image/x-ms-bmp" | "image/x-bmp" => Some(Self::Bmp),
            "image/tiff" | "image/tif" => Some(Self::Tiff),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::Gif => write!(f, "gif"),
            Self::Bmp => write!(f, "bmp"),
            Self::Tiff => write!(f, "tiff"),
        }
    }
}

/// An uploaded file that has been checked to be one of the supported image formats.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub kind: ImageKind,
}

impl ImageUpload {
    /// Validate raw upload bytes.
    ///
    /// The format is taken from the file's magic bytes. The declared file
    /// name extension must also be a supported one when present, and the
    /// declared content type is only used to word the rejection message.
    pub fn validate(
        bytes: Vec<u8>,
        file_name: Option<&str>,
        content_type: Option<&str>,
        max_bytes: usize,
    ) -> Result<Self> {
        // Browsers on Windows may send the full client path.
        let file_name = file_name
            .and_then(|name| name.rsplit(['/', '\\']).next())
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .unwrap_or("upload")
            .to_string();

        if bytes.is_empty() {
            return Err(PixogolError::Validation(format!(
                "Uploaded file '{file_name}' is empty"
            )));
        }

        if bytes.len() > max_bytes {
            return Err(PixogolError::Validation(format!(
                "File too large: {} bytes (max {} bytes)",
                bytes.len(),
                max_bytes
            )));
        }

        if let Some(ext) = Path::new(&file_name).extension().and_then(|e| e.to_str()) {
            if ImageKind::from_extension(ext).is_none() {
                return Err(PixogolError::UnsupportedFile(format!(
                    "'{file_name}' has extension .{ext}; supported formats: {SUPPORTED_FORMATS}"
                )));
            }
        }

        let kind = match infer::get(&bytes) {
            Some(sniffed) => ImageKind::from_mime(sniffed.mime_type()).ok_or_else(|| {
                PixogolError::UnsupportedFile(format!(
                    "'{file_name}' is {}; supported formats: {SUPPORTED_FORMATS}",
                    sniffed.mime_type()
                ))
            })?,
            None => {
                let declared = content_type
                    .map(|ct| format!(" (declared as {ct})"))
                    .unwrap_or_default();
                return Err(PixogolError::UnsupportedFile(format!(
                    "'{file_name}'{declared} is not a recognizable image; supported formats: {SUPPORTED_FORMATS}"
                )));
            }
        };

        Ok(Self {
            bytes,
            file_name,
            kind,
        })
    }

    pub fn sha256_hex(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        format!("{digest:x}")
    }
}
