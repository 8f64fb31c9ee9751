// src/models/media.rs

use serde::Serialize;
use uuid::Uuid;

/// Upload types accepted for question images and lesson documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Jpeg,
    Webp,
    Gif,
    Pdf,
}

impl MediaType {
    const ALL: [MediaType; 5] = [
        MediaType::Png,
        MediaType::Jpeg,
        MediaType::Webp,
        MediaType::Gif,
        MediaType::Pdf,
    ];

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.content_type().eq_ignore_ascii_case(essence))
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Webp => "image/webp",
            MediaType::Gif => "image/gif",
            MediaType::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Png => "png",
            MediaType::Jpeg => "jpg",
            MediaType::Webp => "webp",
            MediaType::Gif => "gif",
            MediaType::Pdf => "pdf",
        }
    }

    /// A fresh `{uuid}.{ext}` file name.
    pub fn file_name(&self) -> String {
        format!("{}.{}", Uuid::new_v4(), self.extension())
    }
}

/// Accepts only names this service generates: a uuid plus a known extension.
pub fn is_media_name(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    Uuid::parse_str(stem).is_ok() && MediaType::ALL.iter().any(|t| t.extension() == ext)
}

/// Response for a stored upload.
#[derive(Debug, Serialize)]
pub struct MediaUpload {
    pub name: String,
    pub url: String,
    pub content_type: &'static str,
    pub size: usize,
}
