use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("upload i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Prefixes validation and parse messages with the 1-based record number.
    pub(crate) fn at_record(self, record: usize) -> Self {
        match self {
            Self::Validation(msg) => Self::Validation(format!("record {record}: {msg}")),
            Self::Parse(msg) => Self::Parse(format!("record {record}: {msg}")),
            other => other,
        }
    }

    /// Stable tag for the calling layer to map onto its own response codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage",
            Self::Parse(_) => "parse",
            Self::Io(_) => "io",
        }
    }
}
