#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external collaborator (HTTP service, query engine) failed.
    #[error("Service error: {0}")]
    Service(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used across the core crate.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Message suitable for showing to the user in a notice or inline hint.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Validation(msg) | CoreError::Conflict(msg) | CoreError::Service(msg) => {
                msg.clone()
            }
            CoreError::NotFound { entity, id } => format!("{entity} '{id}' was not found"),
            CoreError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}
