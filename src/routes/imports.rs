use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::import::{ErrorResponse, ImportJobResponse};
use crate::services::import::{ImportError, UploadedFile};

const FILE_FIELD: &str = "file";

/// Error returned by the import endpoints, rendered as `{code, message}`.
#[derive(Debug)]
pub struct ApiError(ImportError);

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            ImportError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ImportError::ConcurrencyExhausted { .. } => {
                (StatusCode::CONFLICT, "CONCURRENCY_EXHAUSTED")
            }
            ImportError::Processing(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PROCESSING_ERROR"),
            ImportError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ImportError::Store(e) => {
                tracing::error!(error = %e, "Job store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self.0 {
            ImportError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

/// POST /api/imports/persons: upload a CSV of persons for asynchronous import.
pub async fn submit_import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportJobResponse>), ApiError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ImportError::Validation(format!("Could not read uploaded file: {}", e)))?;

        upload = Some(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let upload = upload
        .ok_or_else(|| ImportError::Validation("Multipart field 'file' is required".to_string()))?;

    let job = state.imports.start_import(upload).await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

/// GET /api/imports/persons/{id}: current state of an import job.
pub async fn get_import_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ImportJobResponse>, ApiError> {
    let job = state.imports.get_status(job_id).await?;
    Ok(Json(job.into()))
}
