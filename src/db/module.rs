use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::models::ModuleRow;
use super::{visible, Db};
use crate::error::{Error, Result};
use crate::models::{required_name, Module};

const MODULE_SELECT: &str = r#"
    SELECT
        m.id, m.name, m.subject_id, m.active,
        (SELECT json_group_array(sm.id ORDER BY sm.id) FROM submodules sm WHERE sm.module_id = m.id)
            AS submodule_ids
    FROM modules m
"#;

impl Db {
    pub async fn create_module(&self, subject_id: i64, name: &str) -> Result<Module> {
        let name = required_name(name, "module")?;

        let mut conn = self.pool.acquire().await?;
        if !Self::exists(&mut conn, "subjects", subject_id).await? {
            return Err(Error::not_found("subject", subject_id));
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO modules (name, subject_id, active) VALUES (?, ?, 1) RETURNING id",
        )
        .bind(&name)
        .bind(subject_id)
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!("new module created with id: {id} under subject {subject_id}");
        Self::fetch_module(&mut conn, id).await
    }

    pub async fn module(&self, id: i64) -> Result<Module> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_module(&mut conn, id).await
    }

    pub(crate) async fn fetch_module(conn: &mut SqliteConnection, id: i64) -> Result<Module> {
        let row = sqlx::query_as::<_, ModuleRow>(&format!("{MODULE_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| Error::not_found("module", id))?;

        Ok(row.into())
    }

    pub async fn modules(&self, subject_id: i64, include_disabled: bool) -> Result<Vec<Module>> {
        let mut query = QueryBuilder::<Sqlite>::new(MODULE_SELECT);
        query.push(" WHERE m.subject_id = ").push_bind(subject_id);

        if !include_disabled {
            query.push(" AND ").push(visible("m"));
        }

        query.push(" ORDER BY m.id");

        let rows = query
            .build_query_as::<ModuleRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Module::from).collect())
    }

    /// Whether a row with `id` exists in `table`. Only called with the
    /// crate's own table names.
    pub(crate) async fn exists(conn: &mut SqliteConnection, table: &str, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)"
        ))
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }
}
