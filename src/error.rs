//! Error types for key-path translation.
//!
//! Every variant is raised before the query object is touched, except
//! `DialectTranslation` coming out of a `QueryTarget` that lacks the
//! primitive a fragment needs.

use thiserror::Error;

use crate::dialect::DialectKind;

pub type JsonResult<T> = Result<T, JsonFilterError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JsonFilterError {
    #[error("malformed key path {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("invalid alias {0:?}: aliases must be plain identifiers")]
    InvalidAlias(String),

    #[error("invalid sort direction {0:?}: expected asc or desc")]
    InvalidDirection(String),

    #[error("empty value list for where-in on {0:?}")]
    EmptyValueList(String),

    #[error("{dialect} dialect cannot express this operation: {reason}")]
    DialectTranslation { dialect: DialectKind, reason: String },
}

impl JsonFilterError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        JsonFilterError::MalformedPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn untranslatable(dialect: DialectKind, reason: impl Into<String>) -> Self {
        JsonFilterError::DialectTranslation {
            dialect,
            reason: reason.into(),
        }
    }
}
