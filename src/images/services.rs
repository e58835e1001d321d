use anyhow::Context;
use axum::extract::multipart::Field;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("Upload a valid image. Expected a data:image/<ext>;base64 string.")]
    NotDataUri,
    #[error("Unsupported image type: {0}.")]
    UnsupportedType(String),
    #[error("Image payload is not valid base64.")]
    InvalidBase64,
    #[error("The submitted file is empty.")]
    Empty,
}

/// An image ready to be written to object storage.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub ext: &'static str,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Decodes `data:image/<ext>;base64,<payload>`.
pub fn decode_data_uri(raw: &str) -> Result<UploadItem, ImageError> {
    let rest = raw
        .trim()
        .strip_prefix("data:image/")
        .ok_or(ImageError::NotDataUri)?;
    let (ext, payload) = rest.split_once(";base64,").ok_or(ImageError::NotDataUri)?;

    let content_type = format!("image/{}", ext.to_ascii_lowercase());
    let ext = ext_from_mime(&content_type).ok_or_else(|| ImageError::UnsupportedType(ext.into()))?;

    let body = Base64::decode_vec(payload.trim()).map_err(|_| ImageError::InvalidBase64)?;
    if body.is_empty() {
        return Err(ImageError::Empty);
    }

    Ok(UploadItem {
        body: Bytes::from(body),
        content_type,
        ext,
    })
}

/// Reads a multipart file field into an [`UploadItem`].
///
/// The outer error is a transport failure (truncated form, body limit); the
/// inner one is a bad file the caller reports on its own field.
pub async fn read_multipart_image(field: Field<'_>) -> Result<Result<UploadItem, ImageError>, AppError> {
    let content_type = field
        .content_type()
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| "application/octet-stream".into());
    let body = field.bytes().await?;

    let Some(ext) = ext_from_mime(&content_type) else {
        return Ok(Err(ImageError::UnsupportedType(content_type)));
    };
    if body.is_empty() {
        return Ok(Err(ImageError::Empty));
    }
    Ok(Ok(UploadItem {
        body,
        content_type,
        ext,
    }))
}

/// Uploads the image under `<prefix>/<uuid>.<ext>` and returns the object key.
pub async fn store_image(st: &AppState, prefix: &str, img: UploadItem) -> anyhow::Result<String> {
    let key = format!("{}/{}.{}", prefix, Uuid::new_v4(), img.ext);
    st.storage
        .put_object(&key, img.body, &img.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best-effort removal; a dangling object is not worth failing the request over.
pub async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        tracing::warn!(error = %e, key, "failed to delete stored image");
    }
}

pub async fn image_url(st: &AppState, key: Option<&str>) -> anyhow::Result<Option<String>> {
    match key {
        None => Ok(None),
        Some(k) => st
            .storage
            .presign_get(k, st.config.image_url_ttl_secs)
            .await
            .with_context(|| format!("presign url for key {}", k))
            .map(Some),
    }
}
