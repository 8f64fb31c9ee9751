// src/handlers/media.rs

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::media::{MediaType, MediaUpload, is_media_name},
    state::AppState,
    utils::jwt::Claims,
};

/// Stores the multipart field `file` and returns its public URL.
/// Admin only. The URL can be used as a question's `image_url`.
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let media_type = field
            .content_type()
            .and_then(MediaType::from_content_type)
            .ok_or_else(|| {
                AppError::BadRequest("Only PNG, JPEG, WebP, GIF and PDF files are accepted".to_string())
            })?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        let name = media_type.file_name();
        state.media.put(&name, &data).await?;
        let url = state.config.media_url(&name)?;
        tracing::info!("{} uploaded {} ({} bytes)", claims.sub, name, data.len());

        return Ok((
            StatusCode::CREATED,
            Json(MediaUpload {
                name,
                url: url.to_string(),
                content_type: media_type.content_type(),
                size: data.len(),
            }),
        ));
    }

    Err(AppError::BadRequest("Missing multipart field 'file'".to_string()))
}

/// Removes an uploaded file. Admin only.
pub async fn delete_media(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !is_media_name(&name) {
        return Err(AppError::NotFound("Media not found".to_string()));
    }

    if !state.media.delete(&name).await? {
        return Err(AppError::NotFound("Media not found".to_string()));
    }
    tracing::info!("Media {} deleted", name);

    Ok(StatusCode::NO_CONTENT)
}
