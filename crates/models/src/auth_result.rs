use std::fmt;

use serde::Serialize;

use crate::session::Session;

/// Why a login attempt did not produce a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Blank identifier or secret; never reaches the network.
    InvalidInput,
    /// The authentication service rejected the secret.
    InvalidCredentials,
    /// Valid identity, but for a different portal than the form used.
    RoleMismatch,
    /// Network, timeout or server failure.
    ServiceUnavailable,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidInput => "invalid_input",
            FailureReason::InvalidCredentials => "invalid_credentials",
            FailureReason::RoleMismatch => "role_mismatch",
            FailureReason::ServiceUnavailable => "service_unavailable",
        }
    }

    /// Message shown next to the login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::InvalidInput => "Please fill in both fields.",
            FailureReason::InvalidCredentials => "Incorrect login details. Please try again.",
            FailureReason::RoleMismatch => "This account cannot sign in through this portal.",
            FailureReason::ServiceUnavailable => "The sign-in service is unavailable. Please try again shortly.",
        }
    }

    /// Only service failures may go away without the user changing input.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureReason::ServiceUnavailable)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one settled login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Success { session: Session, landing_route: String },
    Failure { reason: FailureReason },
}

impl AuthResult {
    pub fn failure(reason: FailureReason) -> Self {
        AuthResult::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success { .. })
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthResult::Success { session, .. } => Some(session),
            AuthResult::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            AuthResult::Success { .. } => None,
            AuthResult::Failure { reason } => Some(*reason),
        }
    }
}
