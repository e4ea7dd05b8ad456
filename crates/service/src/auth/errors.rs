use std::time::Duration;

use models::FailureReason;
use thiserror::Error;

/// Failures reported by an authentication collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("credentials rejected: {0}")]
    Rejected(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CollaboratorError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            CollaboratorError::Rejected(_) => 2001,
            CollaboratorError::Unavailable(_) => 2101,
            CollaboratorError::Timeout(_) => 2102,
            CollaboratorError::Malformed(_) => 2103,
        }
    }

    /// Everything except a rejection may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, CollaboratorError::Rejected(_))
    }

    pub fn failure_reason(&self) -> FailureReason {
        if self.is_transient() {
            FailureReason::ServiceUnavailable
        } else {
            FailureReason::InvalidCredentials
        }
    }
}

impl crate::retry::Transient for CollaboratorError {
    fn is_transient(&self) -> bool {
        CollaboratorError::is_transient(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_failure_reasons() {
        assert_eq!(CollaboratorError::Rejected("bad".into()).failure_reason(), FailureReason::InvalidCredentials);
        assert_eq!(CollaboratorError::Unavailable("502".into()).failure_reason(), FailureReason::ServiceUnavailable);
        assert_eq!(CollaboratorError::Timeout(Duration::from_secs(10)).failure_reason(), FailureReason::ServiceUnavailable);
        assert_eq!(CollaboratorError::Malformed("eof".into()).failure_reason(), FailureReason::ServiceUnavailable);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            CollaboratorError::Rejected(String::new()).code(),
            CollaboratorError::Unavailable(String::new()).code(),
            CollaboratorError::Timeout(Duration::ZERO).code(),
            CollaboratorError::Malformed(String::new()).code(),
        ];
        let mut sorted = codes.to_vec();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
