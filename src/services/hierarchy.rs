use std::future::Future;

use crate::db::{Cascade, Db};
use crate::error::Result;
use crate::hierarchy::{Deleted, Level, Node};

// ---------------------------------------------------------------------------
// HierarchyRepository trait
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait HierarchyRepository: Send + Sync {
    /// Writes `active` on the target and all its descendants atomically.
    fn cascade_active(
        &self,
        level: Level,
        id: i64,
        active: bool,
    ) -> impl Future<Output = Result<Cascade>> + Send;

    fn delete_question(&self, id: i64) -> impl Future<Output = Result<()>> + Send;
}

impl HierarchyRepository for Db {
    fn cascade_active(
        &self,
        level: Level,
        id: i64,
        active: bool,
    ) -> impl Future<Output = Result<Cascade>> + Send {
        Db::cascade_active(self, level, id, active)
    }

    fn delete_question(&self, id: i64) -> impl Future<Output = Result<()>> + Send {
        Db::delete_question(self, id)
    }
}

// ---------------------------------------------------------------------------
// HierarchyService
// ---------------------------------------------------------------------------

/// Active-state changes and deletion across the subject → module →
/// submodule tree.
#[derive(Clone)]
pub struct HierarchyService<R: HierarchyRepository = Db> {
    repo: R,
}

impl<R: HierarchyRepository> HierarchyService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Sets the flag on the entity and every descendant. Ancestors are not
    /// consulted: enabling a module under a disabled subject is allowed.
    pub async fn toggle_active(&self, level: Level, id: i64, active: bool) -> Result<Node> {
        let cascade = self.repo.cascade_active(level, id, active).await?;
        tracing::info!(
            "{level} {id} {}",
            if active { "enabled" } else { "disabled" }
        );
        Ok(cascade.node)
    }

    /// Soft delete: disables the entity and everything below it.
    pub async fn soft_delete(&self, level: Level, id: i64) -> Result<Deleted> {
        let cascade = self.repo.cascade_active(level, id, false).await?;
        tracing::info!("{level} {id} disabled successfully (soft delete)");
        Ok(Deleted {
            level,
            id,
            cascaded: cascade.descendants,
        })
    }

    /// Questions have no dependents and are removed permanently.
    pub async fn hard_delete_question(&self, id: i64) -> Result<()> {
        self.repo.delete_question(id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
