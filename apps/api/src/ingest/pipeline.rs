//! Ingestion orchestrator. Runs one upload through extraction,
//! normalization, the structured-extraction call and persistence, and owns
//! the `parsing_status` state machine.
//!
//! Status lifecycle: `pending → processing → completed | failed |
//! failed_no_text | failed_exception`. Terminal states are final; there are
//! no automatic retries. Every failure path records a terminal status before
//! the error surfaces to the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::extract::{extract_text, FileKind};
use crate::ingest::fallback::fallback_extract;
use crate::ingest::normalize::normalize;
use crate::llm_client::StructuredExtractor;
use crate::models::candidate::{CandidateFields, NewCandidate};
use crate::models::resume::ParsingStatus;
use crate::repo::IntakeRepo;
use crate::storage::ObjectStore;

/// Tunables injected at construction; nothing in the pipeline reads ambient
/// configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Ceiling on normalized text submitted for extraction.
    pub max_text_chars: usize,
    /// Below this, the run ends in `failed_no_text` without spending a
    /// service call.
    pub min_text_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_text_chars: 12_000,
            min_text_chars: 20,
        }
    }
}

/// Result of one completed run, returned at the trigger boundary.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub upload_id: Uuid,
    pub status: ParsingStatus,
    pub candidate: CandidateFields,
    /// True when the heuristic fallback produced the fields.
    pub used_fallback: bool,
}

pub struct IngestPipeline {
    store: Arc<dyn ObjectStore>,
    repo: Arc<dyn IntakeRepo>,
    extractor: Arc<dyn StructuredExtractor>,
    config: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        repo: Arc<dyn IntakeRepo>,
        extractor: Arc<dyn StructuredExtractor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            repo,
            extractor,
            config,
        }
    }

    /// Runs the full pipeline for one upload. The only entry point; invoked
    /// once per accepted file with the upload id and its storage path.
    pub async fn run(&self, upload_id: Uuid, file_path: &str) -> Result<IngestOutcome, AppError> {
        let user_id = self
            .repo
            .upload_owner(upload_id)
            .await
            .map_err(AppError::Internal)?
            .ok_or_else(|| AppError::NotFound(format!("Upload {upload_id} not found")))?;

        // One candidate record per upload; a re-trigger needs a fresh upload.
        if self
            .repo
            .has_candidate(upload_id)
            .await
            .map_err(AppError::Internal)?
        {
            return Err(AppError::Validation(format!(
                "Upload {upload_id} has already been parsed"
            )));
        }

        self.repo
            .set_parsing_status(upload_id, ParsingStatus::Processing)
            .await
            .map_err(AppError::Internal)?;
        info!("Parsing upload {upload_id} ({file_path})");

        let Some(kind) = FileKind::from_path(file_path) else {
            self.record_failure(upload_id, ParsingStatus::FailedException)
                .await;
            return Err(AppError::UnsupportedFormat(file_path.to_string()));
        };

        let bytes = match self.store.download(file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.record_failure(upload_id, ParsingStatus::FailedException)
                    .await;
                return Err(AppError::Storage(format!(
                    "Download failed for '{file_path}': {e}"
                )));
            }
        };

        let raw_text = extract_text(&bytes, kind);
        let text = normalize(&raw_text, self.config.max_text_chars);

        if text.chars().count() < self.config.min_text_chars {
            info!(
                "Upload {upload_id}: only {} usable chars recovered, not attempting extraction",
                text.chars().count()
            );
            self.repo
                .set_parsing_status(upload_id, ParsingStatus::FailedNoText)
                .await
                .map_err(AppError::Internal)?;
            return Err(AppError::InsufficientText);
        }

        let (fields, extraction_note) = match self.extractor.extract(&text).await {
            Ok(fields) => (fields, None),
            Err(e) => {
                warn!("Upload {upload_id}: structured extraction failed, using fallback: {e}");
                (
                    fallback_extract(&text),
                    Some(format!("fallback extraction used: {e}")),
                )
            }
        };
        let used_fallback = extraction_note.is_some();

        let candidate = NewCandidate {
            resume_id: upload_id,
            user_id,
            fields: fields.clone(),
            raw_text: text,
            extraction_note,
        };

        if let Err(e) = self.repo.insert_candidate(&candidate).await {
            self.record_failure(upload_id, ParsingStatus::Failed).await;
            return Err(AppError::Internal(e));
        }

        // A crash between the insert above and this update leaves a candidate
        // row with a `processing` upload; accepted inconsistency window.
        self.repo
            .set_parsing_status(upload_id, ParsingStatus::Completed)
            .await
            .map_err(AppError::Internal)?;

        info!(
            "Upload {upload_id} completed (fallback: {used_fallback})"
        );

        Ok(IngestOutcome {
            upload_id,
            status: ParsingStatus::Completed,
            candidate: fields,
            used_fallback,
        })
    }

    /// Best-effort terminal status write on a failure path. The original
    /// error is about to surface; a second failure here is only logged.
    async fn record_failure(&self, upload_id: Uuid, status: ParsingStatus) {
        debug_assert!(status.is_terminal());
        if let Err(e) = self.repo.set_parsing_status(upload_id, status).await {
            error!("Upload {upload_id}: could not record status '{status}': {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStore {
        files: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn download(&self, path: &str) -> Result<Bytes> {
            self.files
                .get(path)
                .map(|bytes| Bytes::from(bytes.clone()))
                .ok_or_else(|| anyhow!("no such object: {path}"))
        }

        async fn upload(&self, _path: &str, _bytes: Bytes, _content_type: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRepo {
        owner: Option<Uuid>,
        statuses: Mutex<Vec<ParsingStatus>>,
        candidates: Mutex<Vec<NewCandidate>>,
        fail_insert: bool,
        existing_candidate: bool,
    }

    impl FakeRepo {
        fn owned_by(user_id: Uuid) -> Self {
            Self {
                owner: Some(user_id),
                ..Default::default()
            }
        }

        fn recorded_statuses(&self) -> Vec<ParsingStatus> {
            self.statuses.lock().unwrap().clone()
        }

        fn inserted(&self) -> Vec<NewCandidate> {
            self.candidates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IntakeRepo for FakeRepo {
        async fn upload_owner(&self, _upload_id: Uuid) -> Result<Option<Uuid>> {
            Ok(self.owner)
        }

        async fn set_parsing_status(&self, _upload_id: Uuid, status: ParsingStatus) -> Result<()> {
            self.statuses.lock().unwrap().push(status);
            Ok(())
        }

        async fn has_candidate(&self, _upload_id: Uuid) -> Result<bool> {
            Ok(self.existing_candidate)
        }

        async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<()> {
            if self.fail_insert {
                return Err(anyhow!("insert refused"));
            }
            self.candidates.lock().unwrap().push(candidate.clone());
            Ok(())
        }
    }

    enum FakeExtractorMode {
        Succeed(Box<CandidateFields>),
        ServiceError,
        SchemaError,
    }

    struct FakeExtractor {
        mode: FakeExtractorMode,
    }

    #[async_trait]
    impl StructuredExtractor for FakeExtractor {
        async fn extract(&self, _resume_text: &str) -> Result<CandidateFields, LlmError> {
            match &self.mode {
                FakeExtractorMode::Succeed(fields) => Ok((**fields).clone()),
                FakeExtractorMode::ServiceError => Err(LlmError::Api {
                    status: 503,
                    message: "service unavailable".to_string(),
                }),
                FakeExtractorMode::SchemaError => Err(LlmError::SchemaParse(
                    "no JSON object found in response content".to_string(),
                )),
            }
        }
    }

    const RESUME_TEXT: &str =
        "John Smith\njohn@example.com\n555-123-4567\nNew York, NY\nSkills: Python, SQL";

    fn pipeline_with(
        files: Vec<(&str, &[u8])>,
        repo: Arc<FakeRepo>,
        mode: FakeExtractorMode,
    ) -> IngestPipeline {
        let store = FakeStore {
            files: files
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
        };
        IngestPipeline::new(
            Arc::new(store),
            repo,
            Arc::new(FakeExtractor { mode }),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_success_path_completes_without_fallback() {
        let repo = Arc::new(FakeRepo::owned_by(Uuid::new_v4()));
        let fields = CandidateFields {
            full_name: Some("John Smith".to_string()),
            ..Default::default()
        };
        let pipeline = pipeline_with(
            vec![("u/r.txt", RESUME_TEXT.as_bytes())],
            repo.clone(),
            FakeExtractorMode::Succeed(Box::new(fields)),
        );

        let outcome = pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap();

        assert_eq!(outcome.status, ParsingStatus::Completed);
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.candidate.full_name.as_deref(), Some("John Smith"));
        assert_eq!(
            repo.recorded_statuses(),
            vec![ParsingStatus::Processing, ParsingStatus::Completed]
        );
        let inserted = repo.inserted();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].extraction_note, None);
        assert!(inserted[0].raw_text.contains("John Smith"));
    }

    #[tokio::test]
    async fn test_service_error_falls_back_and_completes_with_note() {
        let repo = Arc::new(FakeRepo::owned_by(Uuid::new_v4()));
        let pipeline = pipeline_with(
            vec![("u/r.txt", RESUME_TEXT.as_bytes())],
            repo.clone(),
            FakeExtractorMode::ServiceError,
        );

        let outcome = pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap();

        assert_eq!(outcome.status, ParsingStatus::Completed);
        assert!(outcome.used_fallback);
        assert_eq!(
            repo.recorded_statuses(),
            vec![ParsingStatus::Processing, ParsingStatus::Completed]
        );
        let inserted = repo.inserted();
        assert_eq!(inserted.len(), 1);
        let note = inserted[0].extraction_note.as_deref().unwrap();
        assert!(note.contains("503"), "note: {note}");
    }

    #[tokio::test]
    async fn test_fallback_extracts_contact_fields_end_to_end() {
        let repo = Arc::new(FakeRepo::owned_by(Uuid::new_v4()));
        let pipeline = pipeline_with(
            vec![("u/r.txt", RESUME_TEXT.as_bytes())],
            repo.clone(),
            FakeExtractorMode::SchemaError,
        );

        let outcome = pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap();

        let candidate = &outcome.candidate;
        assert_eq!(candidate.full_name.as_deref(), Some("John Smith"));
        assert_eq!(candidate.email.as_deref(), Some("john@example.com"));
        assert_eq!(candidate.phone.as_deref(), Some("555-123-4567"));
        assert_eq!(candidate.location.as_deref(), Some("New York, NY"));
        assert!(candidate.skills.contains(&"Python".to_string()));
        assert!(candidate.skills.contains(&"Sql".to_string()));
        assert!(outcome.used_fallback);
    }

    #[tokio::test]
    async fn test_too_little_text_fails_without_service_call() {
        let repo = Arc::new(FakeRepo::owned_by(Uuid::new_v4()));
        let pipeline = pipeline_with(
            vec![("u/r.txt", b"hello")],
            repo.clone(),
            FakeExtractorMode::ServiceError,
        );

        let err = pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap_err();

        assert!(matches!(err, AppError::InsufficientText));
        assert_eq!(
            repo.recorded_statuses(),
            vec![ParsingStatus::Processing, ParsingStatus::FailedNoText]
        );
        assert!(repo.inserted().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_extension_fails_exception() {
        let repo = Arc::new(FakeRepo::owned_by(Uuid::new_v4()));
        let pipeline = pipeline_with(vec![], repo.clone(), FakeExtractorMode::ServiceError);

        let err = pipeline.run(Uuid::new_v4(), "u/photo.png").await.unwrap_err();

        assert!(matches!(err, AppError::UnsupportedFormat(_)));
        assert_eq!(
            repo.recorded_statuses(),
            vec![ParsingStatus::Processing, ParsingStatus::FailedException]
        );
        assert!(repo.inserted().is_empty());
    }

    #[tokio::test]
    async fn test_download_failure_fails_exception() {
        let repo = Arc::new(FakeRepo::owned_by(Uuid::new_v4()));
        let pipeline = pipeline_with(vec![], repo.clone(), FakeExtractorMode::ServiceError);

        let err = pipeline.run(Uuid::new_v4(), "u/missing.txt").await.unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(
            repo.recorded_statuses(),
            vec![ParsingStatus::Processing, ParsingStatus::FailedException]
        );
    }

    #[tokio::test]
    async fn test_insert_failure_ends_failed_with_no_candidate() {
        let repo = Arc::new(FakeRepo {
            owner: Some(Uuid::new_v4()),
            fail_insert: true,
            ..Default::default()
        });
        let pipeline = pipeline_with(
            vec![("u/r.txt", RESUME_TEXT.as_bytes())],
            repo.clone(),
            FakeExtractorMode::ServiceError,
        );

        let err = pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(
            repo.recorded_statuses(),
            vec![ParsingStatus::Processing, ParsingStatus::Failed]
        );
        assert!(repo.inserted().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_upload_is_not_found_and_touches_nothing() {
        let repo = Arc::new(FakeRepo::default());
        let pipeline = pipeline_with(vec![], repo.clone(), FakeExtractorMode::ServiceError);

        let err = pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(repo.recorded_statuses().is_empty());
    }

    #[tokio::test]
    async fn test_reparse_of_parsed_upload_rejected_before_status_change() {
        let repo = Arc::new(FakeRepo {
            owner: Some(Uuid::new_v4()),
            existing_candidate: true,
            ..Default::default()
        });
        let pipeline = pipeline_with(
            vec![("u/r.txt", RESUME_TEXT.as_bytes())],
            repo.clone(),
            FakeExtractorMode::ServiceError,
        );

        let err = pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(repo.recorded_statuses().is_empty());
        assert!(repo.inserted().is_empty());
    }

    #[tokio::test]
    async fn test_owner_copied_onto_candidate() {
        let user_id = Uuid::new_v4();
        let repo = Arc::new(FakeRepo::owned_by(user_id));
        let pipeline = pipeline_with(
            vec![("u/r.txt", RESUME_TEXT.as_bytes())],
            repo.clone(),
            FakeExtractorMode::SchemaError,
        );

        pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap();

        assert_eq!(repo.inserted()[0].user_id, user_id);
    }

    #[tokio::test]
    async fn test_normalized_text_is_bounded_by_config() {
        let repo = Arc::new(FakeRepo::owned_by(Uuid::new_v4()));
        let store = FakeStore {
            files: [("u/r.txt".to_string(), "word ".repeat(2000).into_bytes())]
                .into_iter()
                .collect(),
        };
        let pipeline = IngestPipeline::new(
            Arc::new(store),
            repo.clone(),
            Arc::new(FakeExtractor {
                mode: FakeExtractorMode::SchemaError,
            }),
            PipelineConfig {
                max_text_chars: 100,
                min_text_chars: 20,
            },
        );

        pipeline.run(Uuid::new_v4(), "u/r.txt").await.unwrap();

        assert!(repo.inserted()[0].raw_text.chars().count() <= 100);
    }
}
