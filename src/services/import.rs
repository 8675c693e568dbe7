use std::future::Future;

use serde::Serialize;

use crate::db::Db;
use crate::error::{Error, Result};
use crate::import::{parse_questions, UploadDir, UploadFormat};
use crate::models::{NewQuestion, SubmoduleDraft, SubmoduleMeta, SubmoduleWithQuestions};

// ---------------------------------------------------------------------------
// ImportRepository trait
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait ImportRepository: Send + Sync {
    fn module_exists(&self, module_id: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Must be atomic: either the submodule and every question exist
    /// afterwards, or none of them do.
    fn create_submodule_with_questions(
        &self,
        draft: SubmoduleDraft,
        questions: Vec<NewQuestion>,
    ) -> impl Future<Output = Result<SubmoduleWithQuestions>> + Send;
}

impl ImportRepository for Db {
    fn module_exists(&self, module_id: i64) -> impl Future<Output = Result<bool>> + Send {
        Db::module_exists(self, module_id)
    }

    fn create_submodule_with_questions(
        &self,
        draft: SubmoduleDraft,
        questions: Vec<NewQuestion>,
    ) -> impl Future<Output = Result<SubmoduleWithQuestions>> + Send {
        Db::create_submodule_with_questions(self, draft, questions)
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An uploaded file as handed over by the request layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub submodule: SubmoduleWithQuestions,
    pub question_count: usize,
}

// ---------------------------------------------------------------------------
// ImportService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ImportService<R: ImportRepository = Db> {
    repo: R,
    uploads: UploadDir,
}

impl<R: ImportRepository> ImportService<R> {
    pub fn new(repo: R, uploads: UploadDir) -> Self {
        Self { repo, uploads }
    }

    /// Creates a submodule holding every question in the uploaded file.
    ///
    /// Metadata, the parent module and every record are checked before
    /// anything is written; the write itself is a single transaction. The
    /// staged copy of the upload is removed on every path.
    pub async fn import_questions(&self, meta: SubmoduleMeta, upload: Upload) -> Result<ImportOutcome> {
        let draft = meta.validate().inspect_err(|e| {
            tracing::warn!("rejected submodule metadata: {e}");
        })?;

        if !self.repo.module_exists(draft.module_id).await? {
            return Err(Error::not_found("module", draft.module_id));
        }

        let format = UploadFormat::from_content_type(&upload.content_type)?;
        let uploads = self.uploads.clone();

        let questions = tokio::task::spawn_blocking(move || {
            let staged = uploads.stage(&upload.file_name, &upload.bytes)?;
            let parsed = staged.open().and_then(|file| parse_questions(format, file));
            staged.release();
            parsed
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
        .inspect_err(|e| tracing::warn!("rejected question file: {e}"))?;

        let submodule = self
            .repo
            .create_submodule_with_questions(draft, questions)
            .await?;
        let question_count = submodule.questions.len();

        tracing::info!(
            "imported {question_count} questions into submodule {}",
            submodule.submodule.id
        );
        Ok(ImportOutcome {
            submodule,
            question_count,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
