use chrono::Utc;
use sqlx::types::Json;

use super::models::AttemptRow;
use super::{finish, Db};
use crate::error::{Error, Result};
use crate::models::{AnswerTag, Attempt, NewAttempt};

const ATTEMPT_COLUMNS: &str = "id, user_id, subject_id, submodule_id, answers, \
     correct_answers, incorrect_answers, total_time_spent, recorded_at";

impl Db {
    pub async fn insert_attempt(&self, attempt: &NewAttempt) -> Result<Attempt> {
        let user_id = attempt.user_id.trim();
        if user_id.is_empty() {
            return Err(Error::validation("user id is required"));
        }

        let mut conn = self.pool.acquire().await?;
        if !Self::exists(&mut conn, "subjects", attempt.subject_id).await? {
            return Err(Error::not_found("subject", attempt.subject_id));
        }
        if !Self::exists(&mut conn, "submodules", attempt.submodule_id).await? {
            return Err(Error::not_found("submodule", attempt.submodule_id));
        }

        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "INSERT INTO analytics (user_id, subject_id, submodule_id, answers, \
             correct_answers, incorrect_answers, total_time_spent, recorded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(attempt.subject_id)
        .bind(attempt.submodule_id)
        .bind(Json(&attempt.answers))
        .bind(attempt.correct_answers)
        .bind(attempt.incorrect_answers)
        .bind(attempt.total_time_spent)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(
            "attempt recorded for user_id: {user_id} on submodule {}",
            attempt.submodule_id
        );
        Ok(row.into())
    }

    /// Oldest first. `submodule_id` narrows to one submodule.
    pub async fn attempts(&self, user_id: &str, submodule_id: Option<i64>) -> Result<Vec<Attempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM analytics \
             WHERE user_id = ? AND (? IS NULL OR submodule_id = ?) \
             ORDER BY recorded_at, id"
        ))
        .bind(user_id)
        .bind(submodule_id)
        .bind(submodule_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Attempt::from).collect())
    }

    pub async fn attempted_submodules(&self, user_id: &str, subject_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT submodule_id FROM analytics \
             WHERE user_id = ? AND subject_id = ? ORDER BY submodule_id",
        )
        .bind(user_id)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Returns the number of attempts removed.
    pub async fn delete_attempts(&self, user_id: &str, submodule_id: i64) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM analytics WHERE user_id = ? AND submodule_id = ?")
            .bind(user_id)
            .bind(submodule_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected())
    }

    /// Sets tag and/or notes on the answer to `question_id` in the user's
    /// latest attempt on the submodule.
    pub async fn annotate_answer(
        &self,
        user_id: &str,
        submodule_id: i64,
        question_id: i64,
        tag: Option<AnswerTag>,
        notes: Option<String>,
    ) -> Result<Attempt> {
        let mut tx = self.begin_write().await?;
        let result = async {
            let row = sqlx::query_as::<_, AttemptRow>(&format!(
                "SELECT {ATTEMPT_COLUMNS} FROM analytics \
                 WHERE user_id = ? AND submodule_id = ? \
                 ORDER BY recorded_at DESC, id DESC LIMIT 1"
            ))
            .bind(user_id)
            .bind(submodule_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::not_found("analytics record", user_id))?;

            let mut attempt = Attempt::from(row);
            let answer = attempt
                .answers
                .iter_mut()
                .find(|a| a.question_id == question_id)
                .ok_or_else(|| Error::not_found("answered question", question_id))?;
            if tag.is_some() {
                answer.tag = tag;
            }
            if notes.is_some() {
                answer.notes = notes;
            }

            sqlx::query("UPDATE analytics SET answers = ? WHERE id = ?")
                .bind(Json(&attempt.answers))
                .bind(attempt.id)
                .execute(&mut *tx)
                .await?;

            Ok(attempt)
        }
        .await;
        let attempt = finish(tx, result).await?;

        tracing::info!("answer to question {question_id} annotated in attempt {}", attempt.id);
        Ok(attempt)
    }
}
