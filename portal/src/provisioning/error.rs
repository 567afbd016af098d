use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Every way a provisioning or apartment mutation can fail.
///
/// All variants abort the whole unit of work; nothing is downgraded to a
/// partial success.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("owner #{ordinal} ({name}) collides with an existing {field}")]
    OwnerConflict {
        ordinal: usize,
        name: String,
        field: &'static str,
    },

    #[error("apartment code {code} is already taken")]
    CodeConflict { code: String },

    #[error("apartment belongs to another agent")]
    Forbidden,

    #[error("store unavailable: {0}")]
    Dependency(#[from] DbErr),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl ProvisionError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::OwnerConflict { .. } | Self::CodeConflict { .. })
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
