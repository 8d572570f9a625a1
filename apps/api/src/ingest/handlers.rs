use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::extract::FileKind;
use crate::ingest::pipeline::IngestOutcome;
use crate::models::candidate::CandidateRow;
use crate::models::resume::{ParsingStatus, ResumeRow};
use crate::state::AppState;
use crate::storage::ObjectStore;

/// Upload size cap enforced at acceptance.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub file_path: String,
    pub parsing_status: ParsingStatus,
}

/// POST /api/v1/uploads
///
/// Accepts a multipart form with a `user_id` text field and a `file` part,
/// stores the file under a user-scoped key and creates the upload record in
/// `pending`. Parsing is triggered separately.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut file: Option<(String, String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable user_id field: {e}")))?;
                let parsed = raw
                    .parse::<Uuid>()
                    .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?;
                user_id = Some(parsed);
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .ok_or_else(|| AppError::Validation("file part needs a filename".to_string()))?
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable file part: {e}")))?;
                file = Some((file_name, content_type, bytes));
            }
            _ => {}
        }
    }

    let user_id =
        user_id.ok_or_else(|| AppError::Validation("Missing user_id field".to_string()))?;
    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing file field".to_string()))?;

    if FileKind::from_path(&file_name).is_none() {
        return Err(AppError::UnsupportedFormat(file_name));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "File exceeds the {} MB limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }

    let extension = file_name.rsplit('.').next().unwrap_or("bin").to_lowercase();
    let file_path = format!("{user_id}/{}.{extension}", Uuid::new_v4());
    let file_size = bytes.len() as i64;

    state
        .store
        .upload(&file_path, bytes, &content_type)
        .await
        .map_err(|e| AppError::Storage(format!("Could not store '{file_name}': {e}")))?;

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO resumes (id, user_id, file_name, file_path, file_size, mime_type, parsing_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&file_name)
    .bind(&file_path)
    .bind(file_size)
    .bind(&content_type)
    .bind(ParsingStatus::Pending.as_str())
    .execute(&state.db)
    .await?;

    info!("Accepted upload {id} ('{file_name}', {file_size} bytes) for user {user_id}");

    Ok(Json(UploadResponse {
        id,
        file_path,
        parsing_status: ParsingStatus::Pending,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub upload_id: Uuid,
    pub file_path: String,
}

/// POST /api/v1/parse
/// The pipeline trigger: one invocation per accepted upload.
pub async fn handle_parse(
    State(state): State<AppState>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<IngestOutcome>, AppError> {
    let outcome = state.pipeline.run(req.upload_id, &req.file_path).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/uploads?user_id=
pub async fn handle_list_uploads(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    let rows: Vec<ResumeRow> =
        sqlx::query_as("SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(params.user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}

/// GET /api/v1/uploads/:id/candidate?user_id=
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<CandidateRow>, AppError> {
    let row: Option<CandidateRow> =
        sqlx::query_as("SELECT * FROM candidates WHERE resume_id = $1 AND user_id = $2")
            .bind(id)
            .bind(params.user_id)
            .fetch_optional(&state.db)
            .await?;

    let row = row.ok_or_else(|| AppError::NotFound(format!("No candidate for upload {id}")))?;
    Ok(Json(row))
}
