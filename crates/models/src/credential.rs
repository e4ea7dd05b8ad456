use std::fmt;

use crate::role::Role;

/// Login form input. Lives only for the duration of one submit.
#[derive(Clone)]
pub struct Credential {
    /// Which login form was used; never sent to the collaborator.
    pub role_claim: Role,
    /// Email, or staff ID for staff.
    pub identifier: String,
    pub secret: String,
    pub remember_me: bool,
}

impl Credential {
    pub fn new(role_claim: Role, identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { role_claim, identifier: identifier.into(), secret: secret.into(), remember_me: false }
    }

    pub fn remember(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    /// Both fields must contain something other than whitespace.
    pub fn is_complete(&self) -> bool {
        !self.identifier.trim().is_empty() && !self.secret.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("role_claim", &self.role_claim)
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}
