use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::models::SubmoduleRow;
use super::{visible, Db};
use crate::error::{Error, Result};
use crate::models::{Submodule, SubmoduleMeta, SubmoduleWithQuestions};

const SUBMODULE_SELECT: &str = r#"
    SELECT
        sm.id, sm.name, sm.module_id, sm.difficulty, sm.is_pro, sm.active,
        (SELECT json_group_array(sq.question_id ORDER BY sq.position)
           FROM submodule_questions sq WHERE sq.submodule_id = sm.id)
            AS question_ids
    FROM submodules sm
"#;

impl Db {
    /// Creates a submodule with an empty question list.
    pub async fn create_submodule(&self, meta: &SubmoduleMeta) -> Result<Submodule> {
        let draft = meta.validate()?;
        let created = self.create_submodule_with_questions(draft, Vec::new()).await?;
        Ok(created.submodule)
    }

    pub async fn module_exists(&self, module_id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::exists(&mut conn, "modules", module_id).await
    }

    pub async fn submodule(&self, id: i64) -> Result<Submodule> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_submodule(&mut conn, id).await
    }

    pub(crate) async fn fetch_submodule(conn: &mut SqliteConnection, id: i64) -> Result<Submodule> {
        let row =
            sqlx::query_as::<_, SubmoduleRow>(&format!("{SUBMODULE_SELECT} WHERE sm.id = ?"))
                .bind(id)
                .fetch_optional(conn)
                .await?
                .ok_or_else(|| Error::not_found("submodule", id))?;

        Ok(row.into())
    }

    /// Submodule plus its questions in list order.
    pub async fn submodule_with_questions(&self, id: i64) -> Result<SubmoduleWithQuestions> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_submodule_with_questions(&mut conn, id).await
    }

    pub(crate) async fn fetch_submodule_with_questions(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<SubmoduleWithQuestions> {
        let submodule = Self::fetch_submodule(&mut *conn, id).await?;
        let questions = Self::fetch_questions(conn, id, true).await?;
        Ok(SubmoduleWithQuestions {
            submodule,
            questions,
        })
    }

    pub async fn submodules(
        &self,
        module_id: i64,
        include_disabled: bool,
    ) -> Result<Vec<Submodule>> {
        let mut query = QueryBuilder::<Sqlite>::new(SUBMODULE_SELECT);
        query.push(" WHERE sm.module_id = ").push_bind(module_id);

        if !include_disabled {
            query.push(" AND ").push(visible("sm"));
        }

        query.push(" ORDER BY sm.id");

        let rows = query
            .build_query_as::<SubmoduleRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Submodule::from).collect())
    }
}
