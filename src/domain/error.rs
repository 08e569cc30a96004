//! Domain-level errors
//! These represent the error kinds surfaced to callers, not transport failures

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DomainError {
    /// A passed-in child reference is nil, unknown, or failed basic health checks
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// The domain manager rejected a registration
    #[error("Registration rejected: {0}")]
    RegisterError(String),

    /// An I/O, parsing, or naming-directory error that should not abort the manager
    #[error("Internal failure: {0}")]
    InternalFailure(String),

    /// Raised only during startup; leads to immediate exit
    #[error("Fatal initialization error: {0}")]
    FatalInit(String),

    /// A wait loop observed the shutdown flag
    #[error("Interrupted by shutdown")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, DomainError>;

impl DomainError {
    /// True for errors that terminate startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, DomainError::FatalInit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = DomainError::InvalidReference("nil reference".to_string());
        assert_eq!(err.to_string(), "Invalid reference: nil reference");

        let err = DomainError::Cancelled;
        assert_eq!(err.to_string(), "Interrupted by shutdown");
    }

    #[test]
    fn test_is_fatal() {
        assert!(DomainError::FatalInit("no matching implementation".into()).is_fatal());
        assert!(!DomainError::InternalFailure("bind failed".into()).is_fatal());
    }
}
