use std::path::Path;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use crate::common::DentDetection;
use crate::server::{ApiError, AppState};
use crate::settings::Settings;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub predictions: Vec<DentDetection>,
    pub image_name: String,
}

/// An accepted upload, still in memory.
#[derive(Debug)]
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// `POST /api/analyze`
///
/// The upload is validated while it streams in, written to a scratch file, checked to be
/// a decodable image and passed to the predictor. The scratch file is a [`TempPath`], so
/// it is removed on every exit path, including when the request is abandoned.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut multipart = multipart?;
    let upload = read_upload(&mut multipart, &state.settings).await?;
    let scratch = store_upload(&state.settings.upload_dir, &upload).await?;
    let scratch_path = scratch.to_path_buf();

    let check_path = scratch_path.clone();
    let decodable = tokio::task::spawn_blocking(move || is_valid_image(&check_path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !decodable {
        return Err(ApiError::BadRequest("Invalid image file".to_string()));
    }

    let predictor = state.predictor.clone();
    let predictions = tokio::task::spawn_blocking(move || predictor.predict(&scratch_path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    if let Err(err) = scratch.close() {
        log::warn!("Failed to remove scratch file: {}", err);
    }

    log::info!("Analyzed {}: {} detections", upload.file_name, predictions.len());

    Ok(Json(AnalyzeResponse {
        success: true,
        predictions,
        image_name: upload.file_name,
    }))
}

async fn read_upload(multipart: &mut Multipart, settings: &Settings) -> Result<Upload, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let is_image = field
            .content_type()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(ApiError::BadRequest("File must be an image".to_string()));
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
        {
            if (bytes.len() + chunk.len()) as u64 > settings.max_file_size {
                // `{:?}` keeps the trailing `.0` on whole megabytes
                return Err(ApiError::BadRequest(format!(
                    "File size exceeds maximum allowed size of {:?}MB",
                    settings.max_file_size_mb()
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Upload { file_name, bytes });
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

/// Writes the upload under a generated name; the client's file name only contributes a
/// plain alphanumeric extension.
async fn store_upload(upload_dir: &Path, upload: &Upload) -> Result<TempPath, ApiError> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let suffix = Path::new(&upload.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let scratch = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(upload_dir)?
        .into_temp_path();

    tokio::fs::write(&scratch, &upload.bytes).await?;
    log::debug!("Stored {} ({} bytes) at {}", upload.file_name, upload.bytes.len(), scratch.display());

    Ok(scratch)
}

fn is_valid_image(path: &Path) -> bool {
    let decoded = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());
    match decoded {
        Ok(image) => image.width() > 0 && image.height() > 0,
        Err(err) => {
            log::debug!("Upload is not a decodable image: {}", err);
            false
        }
    }
}
