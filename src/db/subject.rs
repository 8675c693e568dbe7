use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::models::{SubjectRow, SubmoduleLeafRow};
use super::{visible, Db};
use crate::error::{Error, Result};
use crate::models::{required_name, ModuleBranch, Subject, SubjectTree};

const SUBJECT_SELECT: &str = r#"
    SELECT
        s.id, s.name, s.description, s.active,
        (SELECT json_group_array(m.id ORDER BY m.id) FROM modules m WHERE m.subject_id = s.id)
            AS module_ids
    FROM subjects s
"#;

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

impl Db {
    pub async fn create_subject(&self, name: &str, description: Option<&str>) -> Result<Subject> {
        let name = required_name(name, "subject")?;
        let description = clean_description(description);

        let mut conn = self.pool.acquire().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO subjects (name, description, active) VALUES (?, ?, 1) RETURNING id",
        )
        .bind(&name)
        .bind(&description)
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!("new subject created with id: {id}");
        Self::fetch_subject(&mut conn, id).await
    }

    pub async fn update_subject(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Subject> {
        let name = required_name(name, "subject")?;
        let description = clean_description(description);

        let mut conn = self.pool.acquire().await?;
        let updated = sqlx::query("UPDATE subjects SET name = ?, description = ? WHERE id = ?")
            .bind(&name)
            .bind(&description)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::not_found("subject", id));
        }

        tracing::info!("subject updated with id: {id}");
        Self::fetch_subject(&mut conn, id).await
    }

    pub async fn subject(&self, id: i64) -> Result<Subject> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_subject(&mut conn, id).await
    }

    pub(crate) async fn fetch_subject(conn: &mut SqliteConnection, id: i64) -> Result<Subject> {
        let row = sqlx::query_as::<_, SubjectRow>(&format!("{SUBJECT_SELECT} WHERE s.id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| Error::not_found("subject", id))?;

        Ok(row.into())
    }

    /// Subjects sorted by name. `search` matches name or description,
    /// case-insensitively.
    pub async fn subjects(
        &self,
        search: Option<&str>,
        include_disabled: bool,
    ) -> Result<Vec<Subject>> {
        let mut query = QueryBuilder::<Sqlite>::new(SUBJECT_SELECT);
        query.push(" WHERE 1 = 1");

        if !include_disabled {
            query.push(" AND ").push(visible("s"));
        }

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            query
                .push(" AND (instr(lower(s.name), ")
                .push_bind(term.clone())
                .push(") > 0 OR instr(lower(COALESCE(s.description, '')), ")
                .push_bind(term)
                .push(") > 0)");
        }

        query.push(" ORDER BY s.name COLLATE NOCASE, s.id");

        let rows = query
            .build_query_as::<SubjectRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Subject::from).collect())
    }

    /// Finds a subject by exact name, ignoring case, with its modules and
    /// their submodules. Without `include_disabled` disabled rows are left
    /// out at every level.
    pub async fn subject_tree(&self, name: &str, include_disabled: bool) -> Result<SubjectTree> {
        let name = required_name(name, "subject")?;
        let mut conn = self.pool.acquire().await?;

        let mut query = QueryBuilder::<Sqlite>::new(SUBJECT_SELECT);
        query
            .push(" WHERE lower(s.name) = lower(")
            .push_bind(name.clone())
            .push(")");
        if !include_disabled {
            query.push(" AND ").push(visible("s"));
        }
        query.push(" ORDER BY s.id LIMIT 1");

        let subject: Subject = query
            .build_query_as::<SubjectRow>()
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::not_found("subject", &name))?
            .into();

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT m.id, m.name, m.active FROM modules m WHERE m.subject_id = ",
        );
        query.push_bind(subject.id);
        if !include_disabled {
            query.push(" AND ").push(visible("m"));
        }
        query.push(" ORDER BY m.id");

        let mut modules: Vec<ModuleBranch> = query
            .build_query_as::<(i64, String, Option<bool>)>()
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(|(id, name, active)| ModuleBranch {
                id,
                name,
                active,
                submodules: Vec::new(),
            })
            .collect();

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT sm.id, sm.name, sm.module_id, sm.difficulty, sm.is_pro, sm.active, \
             (SELECT COUNT(*) FROM submodule_questions sq WHERE sq.submodule_id = sm.id) \
                 AS question_count \
             FROM submodules sm JOIN modules m ON m.id = sm.module_id \
             WHERE m.subject_id = ",
        );
        query.push_bind(subject.id);
        if !include_disabled {
            query.push(" AND ").push(visible("sm"));
        }
        query.push(" ORDER BY sm.id");

        let leaves = query
            .build_query_as::<SubmoduleLeafRow>()
            .fetch_all(&mut *conn)
            .await?;

        // Submodules of hidden modules have no branch and drop out here.
        for leaf in leaves {
            if let Some(branch) = modules.iter_mut().find(|m| m.id == leaf.module_id) {
                branch.submodules.push(leaf.into());
            }
        }

        Ok(SubjectTree {
            total_modules: subject.module_ids.len(),
            subject,
            modules,
        })
    }
}
