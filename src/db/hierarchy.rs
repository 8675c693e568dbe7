use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::{finish, Db};
use crate::error::{Error, Result};
use crate::hierarchy::{Level, Node};

/// Result of one cascading write.
#[derive(Debug)]
pub struct Cascade {
    pub node: Node,
    /// Descendant rows whose flag was written.
    pub descendants: usize,
}

impl Db {
    /// Sets `active` on the target and, unconditionally, on every descendant
    /// below it, in one transaction.
    pub async fn cascade_active(&self, level: Level, id: i64, active: bool) -> Result<Cascade> {
        let mut tx = self.begin_write().await?;
        let result = async {
            let descendants = Self::cascade_tx(&mut tx, level, id, active).await?;
            let node = Self::fetch_node(&mut tx, level, id).await?;
            Ok(Cascade { node, descendants })
        }
        .await;
        let cascade = finish(tx, result).await?;

        tracing::info!(
            level = %level,
            id,
            active,
            descendants = cascade.descendants,
            "active flag cascaded"
        );
        Ok(cascade)
    }

    pub async fn node(&self, level: Level, id: i64) -> Result<Node> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_node(&mut conn, level, id).await
    }

    async fn fetch_node(conn: &mut SqliteConnection, level: Level, id: i64) -> Result<Node> {
        Ok(match level {
            Level::Subject => Node::Subject(Self::fetch_subject(conn, id).await?),
            Level::Module => Node::Module(Self::fetch_module(conn, id).await?),
            Level::Submodule => Node::Submodule(Self::fetch_submodule(conn, id).await?),
        })
    }

    /// Walks the tree one level at a time: the ids written at one level are
    /// the parents matched at the next. Returns the number of descendants
    /// written.
    async fn cascade_tx(
        conn: &mut SqliteConnection,
        level: Level,
        id: i64,
        active: bool,
    ) -> Result<usize> {
        let updated = sqlx::query(&format!("UPDATE {} SET active = ? WHERE id = ?", level.table()))
            .bind(active)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::not_found(level.as_str(), id));
        }

        let mut parents = vec![id];
        let mut descendants = 0;

        for child in level.descendants() {
            let Some(parent_column) = child.parent_column() else {
                break;
            };
            if parents.is_empty() {
                break;
            }

            let mut query = QueryBuilder::<Sqlite>::new("UPDATE ");
            query
                .push(child.table())
                .push(" SET active = ")
                .push_bind(active)
                .push(" WHERE ")
                .push(parent_column)
                .push(" IN (");
            let mut ids = query.separated(", ");
            for parent in &parents {
                ids.push_bind(*parent);
            }
            ids.push_unseparated(") RETURNING id");

            parents = query
                .build_query_scalar::<i64>()
                .fetch_all(&mut *conn)
                .await?;
            descendants += parents.len();
        }

        Ok(descendants)
    }
}
