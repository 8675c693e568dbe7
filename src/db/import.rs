use super::{finish, Db};
use crate::error::{Error, Result};
use crate::models::{NewQuestion, SubmoduleDraft, SubmoduleWithQuestions};

impl Db {
    /// Inserts the submodule, then every question in order, then the
    /// submodule's question list, as one unit of work. On any failure
    /// nothing is left behind.
    pub async fn create_submodule_with_questions(
        &self,
        draft: SubmoduleDraft,
        questions: Vec<NewQuestion>,
    ) -> Result<SubmoduleWithQuestions> {
        let mut tx = self.begin_write().await?;
        let result = async {
            if !Self::exists(&mut tx, "modules", draft.module_id).await? {
                return Err(Error::not_found("module", draft.module_id));
            }

            let submodule_id: i64 = sqlx::query_scalar(
                "INSERT INTO submodules (name, module_id, difficulty, is_pro, active) \
                 VALUES (?, ?, ?, ?, 1) RETURNING id",
            )
            .bind(&draft.name)
            .bind(draft.module_id)
            .bind(draft.difficulty)
            .bind(draft.is_pro)
            .fetch_one(&mut *tx)
            .await?;

            let mut question_ids = Vec::with_capacity(questions.len());
            for question in &questions {
                question_ids.push(Self::insert_question(&mut tx, submodule_id, question).await?);
            }

            Self::append_to_list(&mut tx, submodule_id, &question_ids).await?;

            Self::fetch_submodule_with_questions(&mut tx, submodule_id).await
        }
        .await;
        let created = finish(tx, result).await?;

        tracing::info!(
            "new submodule created with id: {} under module {} with {} questions",
            created.submodule.id,
            draft.module_id,
            created.questions.len()
        );
        Ok(created)
    }
}
