use std::collections::HashSet;
use std::path::PathBuf;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::config::ImportSettings;
use crate::core::metrics::QUESTION_IMPORT_ROWS_TOTAL;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::archive::{self, ArchiveError};
use crate::services::manifest::{self, ManifestError, ManifestRow};
use crate::services::storage::{ImageStore, StorageError, QUESTION_IMAGE_FOLDER};

const FALLBACK_MARK_WEIGHT: f64 = 1.0;

#[derive(Debug, Error)]
pub(crate) enum ImportError {
    #[error("exam not found")]
    ExamNotFound,
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("archive does not contain {0}")]
    ManifestMissing(String),
    #[error("manifest is not valid UTF-8 text")]
    ManifestEncoding,
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("row {line}: image {name} is declared but not present in the archive")]
    ImageMissing { line: usize, name: String },
    #[error("row {line}: question text already exists in this exam")]
    DuplicateQuestion { line: usize },
    #[error("row {line}: choice {text:?} appears more than once")]
    DuplicateChoice { line: usize, text: String },
    #[error("row {line}: {source}")]
    Upload {
        line: usize,
        #[source]
        source: StorageError,
    },
    #[error("failed to prepare import workspace: {0}")]
    Workspace(#[from] std::io::Error),
    #[error("archive extraction task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ImportError {
    /// True for problems with the uploaded archive rather than the service.
    pub(crate) fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Archive(_)
                | Self::ManifestMissing(_)
                | Self::ManifestEncoding
                | Self::Manifest(_)
                | Self::ImageMissing { .. }
                | Self::DuplicateQuestion { .. }
                | Self::DuplicateChoice { .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) questions_created: usize,
    pub(crate) choices_created: usize,
    pub(crate) images_uploaded: usize,
}

/// Creates one question plus its choices per manifest row inside a single
/// transaction. Any failing row rolls back the whole batch; images uploaded
/// before the failure stay in the store.
pub(crate) async fn import_questions(
    pool: &PgPool,
    images: &dyn ImageStore,
    settings: &ImportSettings,
    exam_id: &str,
    archive_bytes: Vec<u8>,
) -> Result<ImportSummary, ImportError> {
    let prefix = format!("question-import-{}-", Uuid::new_v4().simple());
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix);
    let workdir = match &settings.work_dir {
        Some(dir) => builder.tempdir_in(dir)?,
        None => builder.tempdir()?,
    };
    let root = workdir.path().to_path_buf();

    let mut rows_seen = 0usize;
    let outcome =
        run_import(pool, images, settings, exam_id, archive_bytes, root, &mut rows_seen).await;

    if let Err(err) = workdir.close() {
        tracing::warn!(error = %err, exam_id = %exam_id, "Failed to remove import workspace");
    }

    match &outcome {
        Ok(summary) => {
            metrics::counter!(QUESTION_IMPORT_ROWS_TOTAL, "outcome" => "imported")
                .increment(summary.questions_created as u64);
            tracing::info!(
                exam_id = %exam_id,
                questions = summary.questions_created,
                choices = summary.choices_created,
                images = summary.images_uploaded,
                action = "questions_imported",
                "Question import committed"
            );
        }
        Err(err) => {
            metrics::counter!(QUESTION_IMPORT_ROWS_TOTAL, "outcome" => "rolled_back")
                .increment(rows_seen as u64);
            tracing::warn!(
                exam_id = %exam_id,
                rows_seen,
                error = %err,
                action = "questions_import_failed",
                "Question import rolled back"
            );
        }
    }

    outcome
}

async fn run_import(
    pool: &PgPool,
    images: &dyn ImageStore,
    settings: &ImportSettings,
    exam_id: &str,
    archive_bytes: Vec<u8>,
    root: PathBuf,
    rows_seen: &mut usize,
) -> Result<ImportSummary, ImportError> {
    let exam = repositories::exams::find_by_id(pool, exam_id)
        .await?
        .ok_or(ImportError::ExamNotFound)?;

    let limit = settings.max_uncompressed_bytes();
    let manifest_name = settings.manifest_name.clone();
    let extract_root = root.clone();
    let manifest_path = tokio::task::spawn_blocking(move || {
        archive::extract_zip(&archive_bytes, limit, &extract_root)?;
        Ok::<_, ArchiveError>(archive::find_file(&extract_root, &manifest_name))
    })
    .await??
    .ok_or_else(|| ImportError::ManifestMissing(settings.manifest_name.clone()))?;

    let raw = tokio::fs::read(&manifest_path).await?;
    let text = String::from_utf8(raw).map_err(|_| ImportError::ManifestEncoding)?;
    let parsed = manifest::parse_manifest(&text)?;
    tracing::debug!(
        exam_id = %exam_id,
        layout = ?parsed.layout,
        rows = parsed.rows.len(),
        "Manifest parsed"
    );

    let mark_weight =
        if exam.default_mark > 0.0 { exam.default_mark } else { FALLBACK_MARK_WEIGHT };

    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for row in &parsed.rows {
        *rows_seen += 1;
        ensure_distinct_choices(row)?;

        if repositories::questions::text_exists(&mut *tx, exam_id, &row.question_text, None).await?
        {
            return Err(ImportError::DuplicateQuestion { line: row.line });
        }

        let image_path = match &row.image_name {
            Some(name) => {
                let local = archive::find_file(&root, name)
                    .ok_or_else(|| ImportError::ImageMissing { line: row.line, name: name.clone() })?;
                let public_id = format!("q_{}", Uuid::new_v4().simple());
                let reference = images
                    .upload(&local, QUESTION_IMAGE_FOLDER, &public_id)
                    .await
                    .map_err(|source| ImportError::Upload { line: row.line, source })?;
                summary.images_uploaded += 1;
                Some(reference)
            }
            None => None,
        };

        let question = repositories::questions::create(
            &mut *tx,
            repositories::questions::CreateQuestion {
                id: &Uuid::new_v4().to_string(),
                exam_id,
                question_text: &row.question_text,
                mark_weight,
                image_path: image_path.as_deref(),
                created_at: primitive_now_utc(),
            },
        )
        .await?;
        summary.questions_created += 1;

        for (index, text) in row.choices.iter().enumerate() {
            repositories::choices::create(
                &mut *tx,
                &Uuid::new_v4().to_string(),
                &question.id,
                text,
                index == row.correct_index,
            )
            .await?;
            summary.choices_created += 1;
        }
    }

    tx.commit().await?;
    Ok(summary)
}

fn ensure_distinct_choices(row: &ManifestRow) -> Result<(), ImportError> {
    let mut seen = HashSet::with_capacity(row.choices.len());
    for text in &row.choices {
        if !seen.insert(text.trim().to_lowercase()) {
            return Err(ImportError::DuplicateChoice { line: row.line, text: text.clone() });
        }
    }
    Ok(())
}
