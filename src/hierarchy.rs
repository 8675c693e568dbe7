use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::{
    error::{Error, Result},
    models::{Module, Subject, Submodule},
};

/// One level of the content tree. Cascades walk from a level down through
/// `child()` until the leaf container is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Subject,
    Module,
    Submodule,
}

impl Level {
    pub fn child(self) -> Option<Level> {
        match self {
            Self::Subject => Some(Self::Module),
            Self::Module => Some(Self::Submodule),
            Self::Submodule => None,
        }
    }

    /// Levels strictly below this one, nearest first.
    pub fn descendants(self) -> impl Iterator<Item = Level> {
        std::iter::successors(self.child(), |l| l.child())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Module => "module",
            Self::Submodule => "submodule",
        }
    }

    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Subject => "subjects",
            Self::Module => "modules",
            Self::Submodule => "submodules",
        }
    }

    /// Column on this level's table that references the parent row.
    pub(crate) fn parent_column(self) -> Option<&'static str> {
        match self {
            Self::Subject => None,
            Self::Module => Some("subject_id"),
            Self::Submodule => Some("module_id"),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subject" => Ok(Self::Subject),
            "module" => Ok(Self::Module),
            "submodule" | "sub-module" => Ok(Self::Submodule),
            other => Err(Error::validation(format!(
                "unknown level '{other}', must be subject, module, or submodule"
            ))),
        }
    }
}

/// An entity at any level of the tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum Node {
    Subject(Subject),
    Module(Module),
    Submodule(Submodule),
}

impl Node {
    pub fn level(&self) -> Level {
        match self {
            Self::Subject(_) => Level::Subject,
            Self::Module(_) => Level::Module,
            Self::Submodule(_) => Level::Submodule,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Subject(s) => s.id,
            Self::Module(m) => m.id,
            Self::Submodule(s) => s.id,
        }
    }

    pub fn active(&self) -> Option<bool> {
        match self {
            Self::Subject(s) => s.active,
            Self::Module(m) => m.active,
            Self::Submodule(s) => s.active,
        }
    }
}

/// Acknowledgement of a soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub level: Level,
    pub id: i64,
    /// Descendant rows disabled along with the target.
    pub cascaded: usize,
}
