//! Design service: submission intake, print artifacts, and the record store.
//!
//! DESIGN
//! ======
//! A submission arrives as multipart parts. [`SubmissionBuilder`] classifies
//! each part and enforces the configured limits while the route streams it;
//! [`submit`] then validates the payload, composes both faces at print
//! resolution on the blocking pool, writes the artifacts under
//! `{OUTPUT_DIR}/{id}/`, and registers the record. Postgres sees the record
//! later, through the persistence task.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is a [`DesignError`] with a stable code. Nothing is
//! registered unless every artifact was written.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::StatusCode;
use canvas::design::{Design, DesignData, ElementRepairs, Material, Side, Template};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ErrorCode;
use crate::render::RenderError;
use crate::state::{AppState, CompleteDesignImages, DesignRecord, HighResImages};

/// Public URL prefix of the artifact root.
pub const OUTPUT_URL_PREFIX: &str = "/output";

pub const DESIGN_DATA_FIELD: &str = "designData";
pub const FRONT_PREVIEW_FIELD: &str = "frontDesignImage";
pub const BACK_PREVIEW_FIELD: &str = "backDesignImage";

#[derive(Debug, thiserror::Error)]
pub enum DesignError {
    #[error("file {field} exceeds the {limit} byte limit")]
    FileTooLarge { field: String, limit: usize },
    #[error("field {field} exceeds the {limit} byte limit")]
    FieldTooLarge { field: String, limit: usize },
    #[error("too many files; at most {limit} allowed")]
    TooManyFiles { limit: usize },
    #[error("unexpected file field {0}")]
    UnexpectedFile(String),
    #[error("designData field is required")]
    MissingDesignData,
    #[error("invalid design: {0}")]
    InvalidDesign(String),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("render task failed: {0}")]
    RenderTask(#[from] tokio::task::JoinError),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("design not found: {0}")]
    NotFound(Uuid),
    #[error("malformed multipart body: {0}")]
    Multipart(String),
}

impl ErrorCode for DesignError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::FieldTooLarge { .. } => "FIELD_TOO_LARGE",
            Self::TooManyFiles { .. } => "TOO_MANY_FILES",
            Self::UnexpectedFile(_) => "UNEXPECTED_FILE",
            Self::MissingDesignData => "MISSING_DESIGN_DATA",
            Self::InvalidDesign(_) => "INVALID_DESIGN",
            Self::Render(_) | Self::RenderTask(_) => "RENDER_FAILED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Multipart(_) => "MULTIPART_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::FileTooLarge { .. } | Self::FieldTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::TooManyFiles { .. }
            | Self::UnexpectedFile(_)
            | Self::MissingDesignData
            | Self::InvalidDesign(_)
            | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Render(_) | Self::RenderTask(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Database(_))
    }
}

// =============================================================================
// MULTIPART INTAKE
// =============================================================================

/// What a multipart part carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    DesignData,
    Preview(Side),
    /// A text field nobody reads. Still size-limited.
    Ignored,
}

/// Classify a part by its field name. `is_file` is true when the part
/// carries a file name.
///
/// # Errors
///
/// [`DesignError::UnexpectedFile`] for a file under any name other than the
/// two preview fields.
pub fn classify_part(name: &str, is_file: bool) -> Result<PartKind, DesignError> {
    match (name, is_file) {
        (FRONT_PREVIEW_FIELD, _) => Ok(PartKind::Preview(Side::Front)),
        (BACK_PREVIEW_FIELD, _) => Ok(PartKind::Preview(Side::Back)),
        (_, true) => Err(DesignError::UnexpectedFile(name.to_owned())),
        (DESIGN_DATA_FIELD, false) => Ok(PartKind::DesignData),
        (_, false) => Ok(PartKind::Ignored),
    }
}

/// Collected, size-checked parts of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub design_json: String,
    pub front_preview: Option<Vec<u8>>,
    pub back_preview: Option<Vec<u8>>,
}

/// Accumulates multipart parts while enforcing the configured limits.
#[derive(Debug)]
pub struct SubmissionBuilder {
    max_file_bytes: usize,
    max_field_bytes: usize,
    max_files: usize,
    files: usize,
    design_json: Option<String>,
    front_preview: Option<Vec<u8>>,
    back_preview: Option<Vec<u8>>,
}

impl SubmissionBuilder {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes,
            max_field_bytes: config.max_field_bytes,
            max_files: config.max_files,
            files: 0,
            design_json: None,
            front_preview: None,
            back_preview: None,
        }
    }

    /// Start a part: classify it and count it against the file limit.
    ///
    /// # Errors
    ///
    /// See [`classify_part`]; also [`DesignError::TooManyFiles`].
    pub fn begin_part(&mut self, name: &str, is_file: bool) -> Result<PartKind, DesignError> {
        let kind = classify_part(name, is_file)?;
        if matches!(kind, PartKind::Preview(_)) {
            self.files += 1;
            if self.files > self.max_files {
                return Err(DesignError::TooManyFiles { limit: self.max_files });
            }
        }
        Ok(kind)
    }

    /// Check a part's running size. Call after every chunk.
    ///
    /// # Errors
    ///
    /// [`DesignError::FileTooLarge`] or [`DesignError::FieldTooLarge`].
    pub fn check_size(&self, kind: PartKind, name: &str, len: usize) -> Result<(), DesignError> {
        match kind {
            PartKind::Preview(_) if len > self.max_file_bytes => {
                Err(DesignError::FileTooLarge { field: name.to_owned(), limit: self.max_file_bytes })
            }
            PartKind::DesignData | PartKind::Ignored if len > self.max_field_bytes => {
                Err(DesignError::FieldTooLarge { field: name.to_owned(), limit: self.max_field_bytes })
            }
            _ => Ok(()),
        }
    }

    /// Store a completed part. A repeated field replaces the earlier value.
    ///
    /// # Errors
    ///
    /// [`DesignError::InvalidDesign`] when `designData` is not UTF-8.
    pub fn finish_part(&mut self, kind: PartKind, bytes: Vec<u8>) -> Result<(), DesignError> {
        match kind {
            PartKind::DesignData => {
                let json = String::from_utf8(bytes)
                    .map_err(|_| DesignError::InvalidDesign("designData is not valid UTF-8".into()))?;
                self.design_json = Some(json);
            }
            PartKind::Preview(Side::Front) => self.front_preview = Some(bytes),
            PartKind::Preview(Side::Back) => self.back_preview = Some(bytes),
            PartKind::Ignored => {}
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`DesignError::MissingDesignData`] when no `designData` part arrived.
    pub fn finish(self) -> Result<Submission, DesignError> {
        let design_json = self.design_json.ok_or(DesignError::MissingDesignData)?;
        Ok(Submission { design_json, front_preview: self.front_preview, back_preview: self.back_preview })
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Parse and normalize a `designData` payload.
///
/// The design is rebuilt through the shared element model, so material rules
/// (blank template on wood/metal, monochrome tones and filters) hold in what
/// gets printed and stored regardless of what the client sent. Undersized
/// elements grow to the minimum and only the first QR code on a side is kept.
///
/// # Errors
///
/// [`DesignError::InvalidDesign`] for malformed JSON, a blank required
/// customer field, or an element that does not rebuild.
pub fn parse_design(json: &str) -> Result<(Design, DesignData), DesignError> {
    let data: DesignData = serde_json::from_str(json).map_err(|e| DesignError::InvalidDesign(e.to_string()))?;
    if let Some(field) = data.customer.missing_field() {
        return Err(DesignError::InvalidDesign(format!("customer {field} is required")));
    }
    let mut design = Design::from_data(&data).map_err(|e| DesignError::InvalidDesign(e.to_string()))?;
    let repairs = design.repair_invariants();
    if repairs != ElementRepairs::default() {
        warn!(undersized = repairs.undersized, extra_qr = repairs.extra_qr, "repaired submitted design");
    }
    design.apply_material_constraints();
    let normalized = design.to_data(data.customer, data.submitted_at_ms);
    Ok((design, normalized))
}

// =============================================================================
// SUBMISSION
// =============================================================================

fn artifact_url(id: Uuid, file: &str) -> String {
    format!("{OUTPUT_URL_PREFIX}/{id}/{file}")
}

fn print_file(side: Side) -> String {
    format!("{}_300dpi.png", side.as_str())
}

fn preview_file(side: Side) -> String {
    format!("{}_preview.png", side.as_str())
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

async fn write_artifact(dir: &Path, file: &str, bytes: &[u8]) -> Result<(), DesignError> {
    tokio::fs::write(dir.join(file), bytes).await?;
    Ok(())
}

/// Write the print files and any previews under `dir`. On failure the
/// directory is removed so no half-written submission is left behind.
async fn store_artifacts(
    dir: &Path,
    id: Uuid,
    prints: [&[u8]; 2],
    previews: [(Side, Option<Vec<u8>>); 2],
) -> Result<CompleteDesignImages, DesignError> {
    let result = write_artifacts(dir, id, prints, previews).await;
    if let Err(e) = &result {
        warn!(design_id = %id, error = %e, "artifact write failed; discarding output");
        if let Err(cleanup) = tokio::fs::remove_dir_all(dir).await {
            warn!(dir = %dir.display(), error = %cleanup, "cannot remove partial output");
        }
    }
    result
}

async fn write_artifacts(
    dir: &Path,
    id: Uuid,
    [front_png, back_png]: [&[u8]; 2],
    previews: [(Side, Option<Vec<u8>>); 2],
) -> Result<CompleteDesignImages, DesignError> {
    tokio::fs::create_dir_all(dir).await?;
    write_artifact(dir, &print_file(Side::Front), front_png).await?;
    write_artifact(dir, &print_file(Side::Back), back_png).await?;

    let mut complete = CompleteDesignImages::default();
    for (side, bytes) in previews {
        let Some(bytes) = bytes else { continue };
        let file = preview_file(side);
        write_artifact(dir, &file, &bytes).await?;
        let url = Some(artifact_url(id, &file));
        match side {
            Side::Front => complete.front = url,
            Side::Back => complete.back = url,
        }
    }
    Ok(complete)
}

/// Validate, render, store, and register a submission.
///
/// # Errors
///
/// Validation failures, render failures, and artifact I/O; see
/// [`DesignError`].
pub async fn submit(state: &AppState, submission: Submission) -> Result<DesignRecord, DesignError> {
    let (design, data) = parse_design(&submission.design_json)?;
    let id = Uuid::new_v4();

    let compositor = state.compositor.clone();
    let (front_png, back_png) = tokio::task::spawn_blocking(move || {
        Ok::<_, RenderError>((compositor.render_png(&design, Side::Front)?, compositor.render_png(&design, Side::Back)?))
    })
    .await??;

    let dir = state.config.output_dir.join(id.to_string());
    let previews = [(Side::Front, submission.front_preview), (Side::Back, submission.back_preview)];
    let complete = store_artifacts(&dir, id, [&front_png, &back_png], previews).await?;

    let record = DesignRecord {
        id,
        created_at_ms: now_ms(),
        design: data,
        high_res_images: HighResImages {
            front: artifact_url(id, &print_file(Side::Front)),
            back: artifact_url(id, &print_file(Side::Back)),
        },
        complete_design_images: complete,
    };
    state.designs.write().await.insert(record.clone());
    info!(
        design_id = %id,
        material = record.design.material.as_str(),
        front_elements = record.design.elements.front.len(),
        back_elements = record.design.elements.back.len(),
        "design submitted"
    );
    Ok(record)
}

// =============================================================================
// QUERIES
// =============================================================================

/// List entry for `GET /api/designs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSummary {
    pub id: Uuid,
    pub created_at_ms: i64,
    pub material: Material,
    pub template: Template,
    pub customer_name: String,
    pub customer_email: String,
    pub high_res_images: HighResImages,
}

impl From<&DesignRecord> for DesignSummary {
    fn from(r: &DesignRecord) -> Self {
        Self {
            id: r.id,
            created_at_ms: r.created_at_ms,
            material: r.design.material,
            template: r.design.template,
            customer_name: r.design.customer.name.clone(),
            customer_email: r.design.customer.email.clone(),
            high_res_images: r.high_res_images.clone(),
        }
    }
}

/// All designs, newest first.
pub async fn list_designs(state: &AppState) -> Vec<DesignSummary> {
    let designs = state.designs.read().await;
    let mut out: Vec<DesignSummary> = designs.records.values().map(DesignSummary::from).collect();
    out.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms).then(a.id.cmp(&b.id)));
    out
}

/// # Errors
///
/// [`DesignError::NotFound`] for an unknown id.
pub async fn get_design(state: &AppState, id: Uuid) -> Result<DesignRecord, DesignError> {
    state.designs.read().await.records.get(&id).cloned().ok_or(DesignError::NotFound(id))
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Upsert records in one transaction.
///
/// # Errors
///
/// Returns a database error if any write fails; nothing is committed then.
pub async fn upsert_records(pool: &PgPool, records: &[DesignRecord]) -> Result<(), DesignError> {
    let mut tx = pool.begin().await?;
    for r in records {
        sqlx::query(
            "INSERT INTO designs
                (id, created_at_ms, material, template, customer_email, design, high_res_images, complete_design_images)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO UPDATE SET
                design = EXCLUDED.design,
                high_res_images = EXCLUDED.high_res_images,
                complete_design_images = EXCLUDED.complete_design_images",
        )
        .bind(r.id)
        .bind(r.created_at_ms)
        .bind(r.design.material.as_str())
        .bind(template_str(r.design.template))
        .bind(&r.design.customer.email)
        .bind(Json(&r.design))
        .bind(Json(&r.high_res_images))
        .bind(Json(&r.complete_design_images))
        .execute(tx.as_mut())
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

fn template_str(template: Template) -> &'static str {
    match template {
        Template::Blank => "blank",
        Template::Blue => "blue",
        Template::Pink => "pink",
    }
}

type DesignRow = (Uuid, i64, serde_json::Value, serde_json::Value, serde_json::Value);

/// Load every stored record. Rows whose JSON no longer decodes are skipped
/// with a warning.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn load_records(pool: &PgPool) -> Result<Vec<DesignRecord>, DesignError> {
    let rows = sqlx::query_as::<_, DesignRow>(
        "SELECT id, created_at_ms, design, high_res_images, complete_design_images
         FROM designs
         ORDER BY created_at_ms DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(decode_row).collect())
}

fn decode_row(row: DesignRow) -> Option<DesignRecord> {
    let id = row.0;
    match try_decode_row(row) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(design_id = %id, error = %e, "stored design does not decode; skipped");
            None
        }
    }
}

fn try_decode_row((id, created_at_ms, design, high_res, complete): DesignRow) -> Result<DesignRecord, serde_json::Error> {
    Ok(DesignRecord {
        id,
        created_at_ms,
        design: serde_json::from_value(design)?,
        high_res_images: serde_json::from_value(high_res)?,
        complete_design_images: serde_json::from_value(complete)?,
    })
}

#[cfg(test)]
#[path = "design_test.rs"]
mod tests;
