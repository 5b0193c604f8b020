use std::fmt::Display;

use backoffice_domain::ObjectIdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Integrity violation: {0}")]
    Integrity(String),
    #[error("Code allocation for `{key}` exhausted after {attempts} attempts")]
    ExhaustedRetries { key: String, attempts: u32 },
    #[error("Store unavailable: {0}")]
    TransientStore(String),
    #[error("Serialization error: {0}")]
    Serde(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn not_found(entity: impl Display, id: impl Display) -> Self {
        CoreError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// HTTP status the route layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Validation(_) | CoreError::Conflict(_) | CoreError::Integrity(_) => 400,
            CoreError::NotFound { .. } => 404,
            CoreError::ExhaustedRetries { .. }
            | CoreError::TransientStore(_)
            | CoreError::Serde(_) => 500,
        }
    }

    /// Only store hiccups are worth retrying by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::TransientStore(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serde(err.to_string())
    }
}

impl From<ObjectIdError> for CoreError {
    fn from(err: ObjectIdError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::TransientStore(err.to_string())
    }
}

impl From<regex::Error> for CoreError {
    fn from(err: regex::Error) -> Self {
        CoreError::Validation(format!("invalid filter pattern: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(CoreError::Validation("x".into()).status_code(), 400);
        assert_eq!(CoreError::not_found("account", "1").status_code(), 404);
        assert_eq!(CoreError::Integrity("x".into()).status_code(), 400);
        assert_eq!(CoreError::Conflict("x".into()).status_code(), 400);
        assert_eq!(CoreError::TransientStore("x".into()).status_code(), 500);
        assert!(CoreError::TransientStore("x".into()).is_transient());
        assert!(!CoreError::Conflict("x".into()).is_transient());
    }

    #[test]
    fn malformed_object_id_is_a_validation_error() {
        let err: CoreError = backoffice_domain::ObjectId::parse_str("nope")
            .unwrap_err()
            .into();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
