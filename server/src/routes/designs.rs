//! Design submission and retrieval routes.

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::response::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::design::{self, DesignError, DesignSummary, PartKind, Submission, SubmissionBuilder};
use crate::state::{AppState, CompleteDesignImages, DesignRecord, HighResImages};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub design_id: Uuid,
    pub high_res_images: HighResImages,
    pub complete_design_images: CompleteDesignImages,
}

fn api_error(err: DesignError) -> ApiError {
    ApiError::from_code(&err)
}

/// `POST /api/submit-design`: multipart submission.
pub async fn submit_design(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let multipart = multipart.map_err(|e| api_error(DesignError::Multipart(e.body_text())))?;
    let submission = collect_submission(&state, multipart).await.map_err(api_error)?;
    let record = design::submit(&state, submission).await.map_err(api_error)?;
    Ok(Json(SubmitResponse {
        success: true,
        design_id: record.id,
        high_res_images: record.high_res_images,
        complete_design_images: record.complete_design_images,
    }))
}

/// Stream every part through the builder so limits trip before a whole
/// oversized part is buffered.
async fn collect_submission(state: &AppState, mut multipart: Multipart) -> Result<Submission, DesignError> {
    let mut builder = SubmissionBuilder::new(&state.config);
    while let Some(field) = multipart.next_field().await.map_err(|e| DesignError::Multipart(e.body_text()))? {
        let name = field.name().unwrap_or_default().to_owned();
        let kind = builder.begin_part(&name, field.file_name().is_some())?;
        let bytes = read_part(&builder, kind, &name, field).await?;
        builder.finish_part(kind, bytes)?;
    }
    builder.finish()
}

async fn read_part(
    builder: &SubmissionBuilder,
    kind: PartKind,
    name: &str,
    mut field: Field<'_>,
) -> Result<Vec<u8>, DesignError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| DesignError::Multipart(e.body_text()))? {
        builder.check_size(kind, name, buf.len() + chunk.len())?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// `GET /api/designs`: summaries, newest first.
pub async fn list_designs(State(state): State<AppState>) -> Json<Vec<DesignSummary>> {
    Json(design::list_designs(&state).await)
}

/// `GET /api/designs/{id}`: full record.
pub async fn get_design(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<DesignRecord>, ApiError> {
    design::get_design(&state, id).await.map(Json).map_err(api_error)
}

#[cfg(test)]
#[path = "designs_test.rs"]
mod tests;
