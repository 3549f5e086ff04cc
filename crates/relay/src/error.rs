use thiserror::Error;

/// Errors that can occur during blob relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The locator or source no longer resolves to any content.
    #[error("content not found: {0}")]
    NotFound(String),

    /// The relay could not be reached or failed transiently.
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    /// The relay refused the request (permissions, unsupported content).
    #[error("relay rejected request: {0}")]
    Rejected(String),
}

impl RelayError {
    /// Whether the error means the content is already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
