use std::fmt;

use serde::{Deserialize, Serialize};

/// Body of `POST /auth/login`. The role claim is deliberately absent.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest").field("identifier", &self.identifier).finish_non_exhaustive()
    }
}

/// Identity as reported by the authentication service.
///
/// `role` stays a string on the wire; the resolver decides what an unknown
/// role means for the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    pub role: String,
    pub display_name: String,
}

/// Successful `POST /auth/login` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: RemoteUser,
}

/// Error body returned by the authentication service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
