use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};

use super::models::QuestionRow;
use super::{finish, visible, Db};
use crate::error::{Error, Result};
use crate::models::{NewQuestion, Question, QuestionPage};

const QUESTION_COLUMNS: &str = "q.id, q.submodule_id, q.question_text, q.body";

impl Db {
    pub async fn question(&self, id: i64) -> Result<Question> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_question(&mut conn, id).await
    }

    async fn fetch_question(conn: &mut SqliteConnection, id: i64) -> Result<Question> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| Error::not_found("question", id))?;

        Ok(row.into())
    }

    /// Questions of a submodule in list order. Without `include_disabled`
    /// a disabled submodule yields nothing.
    pub async fn questions(&self, submodule_id: i64, include_disabled: bool) -> Result<Vec<Question>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_questions(&mut conn, submodule_id, include_disabled).await
    }

    pub(crate) async fn fetch_questions(
        conn: &mut SqliteConnection,
        submodule_id: i64,
        include_disabled: bool,
    ) -> Result<Vec<Question>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {QUESTION_COLUMNS} FROM submodule_questions sq \
             JOIN questions q ON q.id = sq.question_id \
             JOIN submodules sm ON sm.id = sq.submodule_id \
             WHERE sq.submodule_id = "
        ));
        query.push_bind(submodule_id);

        if !include_disabled {
            query.push(" AND ").push(visible("sm"));
        }

        query.push(" ORDER BY sq.position");

        let rows = query
            .build_query_as::<QuestionRow>()
            .fetch_all(conn)
            .await?;

        Ok(rows.into_iter().map(Question::from).collect())
    }

    /// One page of a submodule's questions in list order. `after` is the id
    /// of the last question already seen. A disabled submodule yields an
    /// empty page unless `include_disabled` is set.
    pub async fn questions_page(
        &self,
        submodule_id: i64,
        after: Option<i64>,
        limit: i64,
        include_disabled: bool,
    ) -> Result<QuestionPage> {
        if limit < 1 {
            return Err(Error::validation(format!(
                "invalid limit {limit}, must be at least 1"
            )));
        }

        let mut conn = self.pool.acquire().await?;
        let submodule = Self::fetch_submodule(&mut conn, submodule_id).await?;
        if !include_disabled && !submodule.is_active() {
            return Ok(QuestionPage {
                questions: Vec::new(),
                has_more: false,
                next_cursor: None,
                total_questions: 0,
            });
        }

        let start = match after {
            None => None,
            Some(question_id) => {
                let position: Option<i64> = sqlx::query_scalar(
                    "SELECT position FROM submodule_questions \
                     WHERE submodule_id = ? AND question_id = ?",
                )
                .bind(submodule_id)
                .bind(question_id)
                .fetch_optional(&mut *conn)
                .await?;
                Some(position.ok_or_else(|| {
                    Error::validation(format!(
                        "cursor question {question_id} is not in submodule {submodule_id}"
                    ))
                })?)
            }
        };

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {QUESTION_COLUMNS} FROM submodule_questions sq \
             JOIN questions q ON q.id = sq.question_id \
             WHERE sq.submodule_id = "
        ));
        query.push_bind(submodule_id);
        if let Some(position) = start {
            query.push(" AND sq.position > ").push_bind(position);
        }
        query
            .push(" ORDER BY sq.position LIMIT ")
            .push_bind(limit.saturating_add(1));

        let mut questions: Vec<Question> = query
            .build_query_as::<QuestionRow>()
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(Question::from)
            .collect();

        let has_more = questions.len() as i64 > limit;
        questions.truncate(limit as usize);
        let next_cursor = if has_more {
            questions.last().map(|q| q.id)
        } else {
            None
        };

        let total_questions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM submodule_questions WHERE submodule_id = ?")
                .bind(submodule_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(QuestionPage {
            questions,
            has_more,
            next_cursor,
            total_questions,
        })
    }

    /// Number of question rows that reference the submodule.
    pub async fn questions_count(&self, submodule_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE submodule_id = ?")
            .bind(submodule_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Appends one question to the end of a submodule's list.
    pub async fn add_question(&self, submodule_id: i64, question: &NewQuestion) -> Result<Question> {
        question.validate()?;

        let mut tx = self.begin_write().await?;
        let result = async {
            if !Self::exists(&mut tx, "submodules", submodule_id).await? {
                return Err(Error::not_found("submodule", submodule_id));
            }
            let id = Self::insert_question(&mut tx, submodule_id, question).await?;
            Self::append_to_list(&mut tx, submodule_id, &[id]).await?;
            Self::fetch_question(&mut tx, id).await
        }
        .await;
        let created = finish(tx, result).await?;

        tracing::info!("question {} added to submodule {submodule_id}", created.id);
        Ok(created)
    }

    pub async fn update_question(&self, id: i64, question: &NewQuestion) -> Result<Question> {
        question.validate()?;

        let mut conn = self.pool.acquire().await?;
        let updated = sqlx::query(
            "UPDATE questions SET question_type = ?, question_text = ?, body = ? WHERE id = ?",
        )
        .bind(question.body.question_type().as_str())
        .bind(question.question_text.trim())
        .bind(Json(&question.body))
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::not_found("question", id));
        }

        tracing::info!("question updated with id: {id}");
        Self::fetch_question(&mut conn, id).await
    }

    /// Permanent removal. The submodule list entry goes with it.
    pub async fn delete_question(&self, id: i64) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(Error::not_found("question", id));
        }

        tracing::info!("question deleted with id: {id}");
        Ok(())
    }

    pub(crate) async fn insert_question(
        conn: &mut SqliteConnection,
        submodule_id: i64,
        question: &NewQuestion,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO questions (submodule_id, question_type, question_text, body) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(submodule_id)
        .bind(question.body.question_type().as_str())
        .bind(question.question_text.trim())
        .bind(Json(&question.body))
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// Appends `question_ids` to the list in the given order.
    pub(crate) async fn append_to_list(
        conn: &mut SqliteConnection,
        submodule_id: i64,
        question_ids: &[i64],
    ) -> Result<()> {
        if question_ids.is_empty() {
            return Ok(());
        }

        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM submodule_questions WHERE submodule_id = ?",
        )
        .bind(submodule_id)
        .fetch_one(&mut *conn)
        .await?;

        let mut query = QueryBuilder::<Sqlite>::new(
            "INSERT INTO submodule_questions (submodule_id, question_id, position) ",
        );
        query.push_values(question_ids.iter().enumerate(), |mut row, (offset, id)| {
            row.push_bind(submodule_id)
                .push_bind(*id)
                .push_bind(next + offset as i64);
        });
        query.build().execute(conn).await?;

        Ok(())
    }
}
