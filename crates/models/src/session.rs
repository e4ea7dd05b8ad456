use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// A verified login. `role` always equals the role claim that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    pub display_name: String,
    /// Opaque token issued by the authentication service.
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Role, display_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            display_name: display_name.into(),
            token: token.into(),
            issued_at: Utc::now(),
        }
    }
}
