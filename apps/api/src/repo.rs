use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::candidate::NewCandidate;
use crate::models::resume::ParsingStatus;

/// Persistence seam for the ingestion pipeline: exactly the operations a run
/// needs, all scoped to the owning record. Read paths for the API live in
/// the handlers.
#[async_trait]
pub trait IntakeRepo: Send + Sync {
    /// Owning user of an upload, or `None` if the record does not exist.
    async fn upload_owner(&self, upload_id: Uuid) -> Result<Option<Uuid>>;

    async fn set_parsing_status(&self, upload_id: Uuid, status: ParsingStatus) -> Result<()>;

    /// Whether a candidate record already exists for this upload.
    async fn has_candidate(&self, upload_id: Uuid) -> Result<bool>;

    async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<()>;
}

/// Postgres-backed repository used in production.
pub struct PgIntakeRepo {
    pool: PgPool,
}

impl PgIntakeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntakeRepo for PgIntakeRepo {
    async fn upload_owner(&self, upload_id: Uuid) -> Result<Option<Uuid>> {
        Ok(
            sqlx::query_scalar("SELECT user_id FROM resumes WHERE id = $1")
                .bind(upload_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn set_parsing_status(&self, upload_id: Uuid, status: ParsingStatus) -> Result<()> {
        sqlx::query("UPDATE resumes SET parsing_status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(upload_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn has_candidate(&self, upload_id: Uuid) -> Result<bool> {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM candidates WHERE resume_id = $1 LIMIT 1")
                .bind(upload_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(existing.is_some())
    }

    async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO candidates
                (id, resume_id, user_id, full_name, email, phone, location, summary,
                 skills, experience, education, raw_text, extraction_note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(candidate.resume_id)
        .bind(candidate.user_id)
        .bind(&candidate.fields.full_name)
        .bind(&candidate.fields.email)
        .bind(&candidate.fields.phone)
        .bind(&candidate.fields.location)
        .bind(&candidate.fields.summary)
        .bind(serde_json::to_value(&candidate.fields.skills)?)
        .bind(serde_json::to_value(&candidate.fields.experience)?)
        .bind(serde_json::to_value(&candidate.fields.education)?)
        .bind(&candidate.raw_text)
        .bind(&candidate.extraction_note)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
